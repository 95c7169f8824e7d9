//! IMAP implementation of [`MailboxSession`].
//!
//! # Example
//!
//! ```no_run
//! use mail_extract::{ExtractorConfig, ImapMailbox, Scanner};
//!
//! # async fn example() -> mail_extract::Result<()> {
//! let config = ExtractorConfig::load("extract.json")?;
//!
//! let mut mailbox = ImapMailbox::connect(&config).await?;
//! let code = Scanner::from_config(&config).scan(&mut mailbox).await;
//! mailbox.logout().await?;
//!
//! println!("{}", code?);
//! # Ok(())
//! # }
//! ```

use crate::config::{ExtractorConfig, TimeoutConfig};
use crate::connection;
use crate::error::{Error, Result};
use crate::parser::RawMessage;
use crate::scanner::MailboxSession;
use crate::session::{self, ImapSession};
use crate::window::SequenceWindow;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// The only folder ever scanned.
pub const INBOX: &str = "INBOX";

/// An authenticated IMAP session with `INBOX` selected.
///
/// # Lifecycle
///
/// 1. Open with [`connect`](Self::connect)
/// 2. Hand it to [`Scanner::scan`](crate::Scanner::scan)
/// 3. Call [`logout`](Self::logout)
pub struct ImapMailbox {
    session: Box<ImapSession>,
    imap_host: String,
    timeouts: TimeoutConfig,
    message_count: u32,
}

impl ImapMailbox {
    /// Connects to the IMAP server, authenticates and selects `INBOX`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Connection cannot be established
    /// - Authentication fails
    /// - Mailbox selection fails
    /// - Any of these steps exceeds its timeout
    #[instrument(
        name = "ImapMailbox::connect",
        skip_all,
        fields(
            username = %config.username(),
            imap_host = %config.imap_host,
            imap_port = config.imap_port
        )
    )]
    pub async fn connect(config: &ExtractorConfig) -> Result<Self> {
        let timeouts = &config.timeouts;

        let tls_stream = tokio::time::timeout(
            timeouts.connect,
            connection::open(&config.imap_host, config.imap_port),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: config.server_address(),
            timeout: timeouts.connect,
        })??;

        debug!("TLS connection established");

        let mut session = tokio::time::timeout(
            timeouts.auth,
            session::authenticate(tls_stream, config.username(), config.password()),
        )
        .await
        .map_err(|_| Error::AuthTimeout {
            username: config.username().to_string(),
            timeout: timeouts.auth,
        })??;

        debug!("Authenticated");

        let message_count =
            tokio::time::timeout(timeouts.select, session::select_mailbox(&mut session, INBOX))
                .await
                .map_err(|_| Error::SelectTimeout {
                    mailbox: INBOX.to_string(),
                    timeout: timeouts.select,
                })??;

        debug!(message_count, "Selected INBOX");

        Ok(Self {
            session: Box::new(session),
            imap_host: config.imap_host.clone(),
            timeouts: timeouts.clone(),
            message_count,
        })
    }

    /// Logs out from the IMAP server.
    ///
    /// # Errors
    ///
    /// Returns an error if the logout command fails or times out.
    #[instrument(name = "ImapMailbox::logout", skip(self))]
    pub async fn logout(&mut self) -> Result<()> {
        let timeout = self.timeouts.logout;

        tokio::time::timeout(timeout, session::logout(&mut self.session))
            .await
            .map_err(|_| Error::LogoutTimeout { timeout })?
    }
}

#[async_trait(?Send)]
impl MailboxSession for ImapMailbox {
    async fn message_count(&mut self) -> Result<u32> {
        Ok(self.message_count)
    }

    async fn fetch_window(&mut self, window: SequenceWindow) -> Result<Vec<RawMessage>> {
        session::fetch_window(&mut self.session, window).await
    }
}

impl std::fmt::Debug for ImapMailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapMailbox")
            .field("imap_host", &self.imap_host)
            .field("message_count", &self.message_count)
            .finish_non_exhaustive()
    }
}
