//! Configuration for a mail-extract run.
//!
//! The configuration is usually read from a JSON file:
//!
//! ```json
//! {
//!   "imap-host": "imap.example.com",
//!   "imap-port": 993,
//!   "username": "me@example.com",
//!   "password": "$MAIL_PW",
//!   "from-filter": "Example Bank",
//!   "regexp": "code: (\\d{6})"
//! }
//! ```
//!
//! Any string value starting with [`ENV_MARKER`] names an environment
//! variable holding the actual value. Programmatic construction goes through
//! [`ExtractorConfig::builder`]:
//!
//! ```
//! use mail_extract::ExtractorConfig;
//!
//! let config = ExtractorConfig::builder()
//!     .imap_host("imap.example.com")
//!     .username("me@example.com")
//!     .password("app-password")
//!     .from_filter("Example Bank")
//!     .pattern(r"code: (\d{6})")
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.server_address(), "imap.example.com:993");
//! ```

use crate::error::{Error, Result};
use crate::matcher::RegexMatcher;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Prefix marking a string value as an environment variable reference.
pub const ENV_MARKER: char = '$';

/// Default IMAPS port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// What to do with a message from a matching sender whose body cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeFaultPolicy {
    /// Abort the whole scan.
    #[default]
    Abort,
    /// Log the fault and continue with the next older message.
    Skip,
}

/// Resolved configuration for one extraction run.
///
/// Note: The `password` field is stored as a [`SecretString`] to prevent
/// accidental logging of credentials. The content pattern is compiled once,
/// when the configuration is built.
#[derive(Clone)]
pub struct ExtractorConfig {
    /// IMAP server hostname.
    pub imap_host: String,
    /// IMAP server port (default: 993 for IMAPS).
    pub imap_port: u16,
    username: String,
    password: SecretString,
    /// Substring the `From` header must contain.
    pub from_filter: String,
    matcher: RegexMatcher,
    /// Handling of undecodable bodies.
    pub decode_fault: DecodeFaultPolicy,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

impl std::fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_filter", &self.from_filter)
            .field("pattern", &self.matcher.pattern())
            .field("decode_fault", &self.decode_fault)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl ExtractorConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::default()
    }

    /// Loads a configuration file, resolving `$VAR` values from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// - [`Error::ReadConfig`] if the file cannot be read
    /// - [`Error::ParseConfig`] if it is not a valid configuration record
    /// - [`Error::MissingEnvVar`] if a referenced variable is not set
    /// - [`Error::InvalidPattern`] if `regexp` does not compile
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_with(&data, |name| std::env::var(name).ok())
    }

    /// Parses a JSON configuration, resolving `$VAR` values through `lookup`.
    ///
    /// ```
    /// use mail_extract::ExtractorConfig;
    ///
    /// let json = r#"{
    ///     "imap-host": "imap.example.com", "imap-port": 993,
    ///     "username": "me", "password": "$MAIL_PW",
    ///     "from-filter": "Bank", "regexp": "code: (\\d+)"
    /// }"#;
    /// let config = ExtractorConfig::from_json_with(json, |name| {
    ///     (name == "MAIL_PW").then(|| "hunter2".to_string())
    /// })
    /// .unwrap();
    /// assert_eq!(config.password(), "hunter2");
    /// ```
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the I/O error.
    pub fn from_json_with<F>(json: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: ConfigFile =
            serde_json::from_str(json).map_err(|source| Error::ParseConfig { source })?;

        Self::builder()
            .imap_host(resolve_field("imap-host", file.imap_host, &lookup)?)
            .imap_port(file.imap_port)
            .username(resolve_field("username", file.username, &lookup)?)
            .password(resolve_field("password", file.password, &lookup)?)
            .from_filter(resolve_field("from-filter", file.from_filter, &lookup)?)
            .pattern(resolve_field("regexp", file.regexp, &lookup)?)
            .decode_fault(file.decode_fault)
            .build()
    }

    /// Returns the login username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password as a string slice.
    ///
    /// The password is intentionally not directly accessible to prevent accidental logging.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns the compiled content pattern.
    #[must_use]
    pub fn matcher(&self) -> &RegexMatcher {
        &self.matcher
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.imap_host, self.imap_port)
    }
}

/// On-disk configuration record, before `$VAR` resolution.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFile {
    imap_host: String,
    imap_port: u16,
    username: String,
    password: String,
    from_filter: String,
    regexp: String,
    #[serde(default)]
    decode_fault: DecodeFaultPolicy,
}

/// Replaces a `$VAR` value with the variable's value.
fn resolve_field<F>(field: &str, value: String, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match value.strip_prefix(ENV_MARKER) {
        Some(variable) => lookup(variable).ok_or_else(|| Error::MissingEnvVar {
            variable: variable.to_string(),
            field: field.to_string(),
        }),
        None => Ok(value),
    }
}

/// Timeout configuration for session setup and teardown.
///
/// The bulk fetch is not bounded: a hanging transport blocks the run.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for selecting the mailbox.
    pub select: Duration,
    /// Timeout for logout operation.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            logout: Duration::from_secs(5),
        }
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug, Default)]
pub struct ExtractorConfigBuilder {
    imap_host: Option<String>,
    imap_port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    from_filter: Option<String>,
    pattern: Option<String>,
    decode_fault: Option<DecodeFaultPolicy>,
    timeouts: Option<TimeoutConfig>,
}

impl ExtractorConfigBuilder {
    /// Sets the IMAP server hostname (required).
    #[must_use]
    pub fn imap_host(mut self, host: impl Into<String>) -> Self {
        self.imap_host = Some(host.into());
        self
    }

    /// Sets the IMAP server port.
    ///
    /// Default is 993 (IMAPS with TLS).
    #[must_use]
    pub fn imap_port(mut self, port: u16) -> Self {
        self.imap_port = Some(port);
        self
    }

    /// Sets the login username (required).
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password (required).
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the substring the `From` header must contain.
    ///
    /// Defaults to the empty string, which every sender matches.
    #[must_use]
    pub fn from_filter(mut self, filter: impl Into<String>) -> Self {
        self.from_filter = Some(filter.into());
        self
    }

    /// Sets the content pattern (required). Its first capture group is the
    /// extraction target.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the handling of undecodable bodies.
    #[must_use]
    pub fn decode_fault(mut self, policy: DecodeFaultPolicy) -> Self {
        self.decode_fault = Some(policy);
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Builds the configuration, compiling the content pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or the pattern is invalid.
    pub fn build(self) -> Result<ExtractorConfig> {
        let imap_host = required(self.imap_host, "imap-host")?;
        let username = required(self.username, "username")?;
        let password = required(self.password, "password")?;
        let pattern = required(self.pattern, "regexp")?;

        let matcher = RegexMatcher::new(&pattern)
            .map_err(|source| Error::InvalidPattern { pattern, source })?;

        if !matcher.has_capture_group() {
            warn!(
                pattern = %matcher.pattern(),
                "Content pattern has no capture group and can never extract anything"
            );
        }

        Ok(ExtractorConfig {
            imap_host,
            imap_port: self.imap_port.unwrap_or(DEFAULT_IMAP_PORT),
            username,
            password: SecretString::from(password),
            from_filter: self.from_filter.unwrap_or_default(),
            matcher,
            decode_fault: self.decode_fault.unwrap_or_default(),
            timeouts: self.timeouts.unwrap_or_default(),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| Error::InvalidConfig {
        message: format!("{field} is required"),
    })
}
