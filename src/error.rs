//! Error types for the mail-extract crate.
//!
//! Every failure of a run maps to one [`Error`] variant. Variants are grouped
//! into an [`ErrorCategory`], which the binary turns into its exit status via
//! [`ErrorCategory::exit_code`]. Nothing is retried.

use crate::window::SequenceWindow;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting content from a mailbox.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / startup errors (raised before any network activity)
    // ─────────────────────────────────────────────────────────────────────────
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{}'", path.display())]
    ReadConfig {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not a valid configuration record.
    #[error("malformed configuration file")]
    ParseConfig {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A `$VAR` indirection names an environment variable that is not set.
    #[error("env variable \"{variable}\" is not set but required for config field \"{field}\"")]
    MissingEnvVar {
        /// Name of the missing environment variable.
        variable: String,
        /// Configuration field holding the indirection.
        field: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// The content pattern is not a valid regular expression.
    #[error("invalid content pattern '{pattern}'")]
    InvalidPattern {
        /// The pattern as configured.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Network errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Timeout errors (the bulk fetch itself is never bounded)
    // ─────────────────────────────────────────────────────────────────────────
    /// Connection timeout.
    #[error("connection timeout to {target} after {timeout:?}")]
    ConnectTimeout {
        /// The target address.
        target: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Authentication timeout.
    #[error("authentication timeout for {username} after {timeout:?}")]
    AuthTimeout {
        /// The username used for authentication.
        username: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Mailbox selection timeout.
    #[error("mailbox selection timeout for '{mailbox}' after {timeout:?}")]
    SelectTimeout {
        /// The mailbox name.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Logout timeout.
    #[error("logout timeout after {timeout:?}")]
    LogoutTimeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IMAP protocol errors
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP login failed.
    #[error("IMAP login failed for {username}")]
    ImapLogin {
        /// The username used for login.
        username: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to select mailbox.
    #[error("failed to select mailbox '{mailbox}'")]
    SelectMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP fetch failed.
    #[error("IMAP fetch failed for sequence set {sequence_set}")]
    ImapFetch {
        /// The sequence set that failed.
        sequence_set: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to fetch message from stream.
    #[error("failed to fetch message from stream")]
    FetchMessage {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// IMAP logout failed.
    #[error("IMAP logout failed")]
    ImapLogout {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Mailbox state
    // ─────────────────────────────────────────────────────────────────────────
    /// The selected mailbox holds no messages.
    #[error("no message in mailbox")]
    EmptyMailbox,

    // ─────────────────────────────────────────────────────────────────────────
    // Message integrity errors (abort the whole scan)
    // ─────────────────────────────────────────────────────────────────────────
    /// A fetched message is not a valid mail message.
    #[error("failed to parse message {seq}")]
    ParseMessage {
        /// Sequence number of the message.
        seq: u32,
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    /// A message body could not be decoded per its transfer encoding.
    #[error("failed to decode body of message {seq}: {message}")]
    DecodeBody {
        /// Sequence number of the message.
        seq: u32,
        /// Description of the decoding fault.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Search result
    // ─────────────────────────────────────────────────────────────────────────
    /// No message in the scanned window matched the filter and pattern.
    #[error("no matching message in window {window}")]
    NoMatchInWindow {
        /// The window that was scanned.
        window: SequenceWindow,
    },
}

impl Error {
    /// Returns the error category for logging and exit status purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ReadConfig { .. }
            | Error::ParseConfig { .. }
            | Error::MissingEnvVar { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidPattern { .. }
            | Error::InvalidDnsName { .. } => ErrorCategory::Configuration,

            Error::TcpConnect { .. } | Error::TlsConnect { .. } => ErrorCategory::Network,

            Error::ConnectTimeout { .. }
            | Error::AuthTimeout { .. }
            | Error::SelectTimeout { .. }
            | Error::LogoutTimeout { .. } => ErrorCategory::Timeout,

            Error::ImapLogin { .. }
            | Error::SelectMailbox { .. }
            | Error::ImapFetch { .. }
            | Error::FetchMessage { .. }
            | Error::ImapLogout { .. } => ErrorCategory::Protocol,

            Error::EmptyMailbox => ErrorCategory::MailboxState,

            Error::ParseMessage { .. } | Error::DecodeBody { .. } => ErrorCategory::Integrity,

            Error::NoMatchInWindow { .. } => ErrorCategory::NotFound,
        }
    }
}

/// Error categories for logging and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or startup errors.
    Configuration,
    /// Network connectivity errors.
    Network,
    /// Timeout errors.
    Timeout,
    /// IMAP protocol errors.
    Protocol,
    /// The mailbox cannot be scanned in its current state.
    MailboxState,
    /// A fetched message is malformed or undecodable.
    Integrity,
    /// No matching content found.
    NotFound,
}

impl ErrorCategory {
    /// Returns the process exit status for this category.
    ///
    /// `0` is reserved for success and `2` is shared with command-line usage
    /// errors.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCategory::NotFound => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::Protocol => 3,
            ErrorCategory::MailboxState => 4,
            ErrorCategory::Integrity => 5,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::MailboxState => write!(f, "mailbox_state"),
            ErrorCategory::Integrity => write!(f, "integrity"),
            ErrorCategory::NotFound => write!(f, "not_found"),
        }
    }
}
