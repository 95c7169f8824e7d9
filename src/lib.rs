//! # mail-extract
//!
//! Extracts a piece of text (a one-time code, a confirmation link, ...) from
//! the newest matching message in an IMAP inbox.
//!
//! A run connects over TLS, selects `INBOX`, fetches the ten most recent
//! messages in one request and walks them from newest to oldest. Messages
//! whose `From` header does not contain the configured filter are skipped;
//! the others have their body decoded and searched with the configured
//! regular expression. The first capture group of the first match wins.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mail_extract::{ExtractorConfig, ImapMailbox, Scanner};
//!
//! # async fn example() -> mail_extract::Result<()> {
//! let config = ExtractorConfig::builder()
//!     .imap_host("imap.example.com")
//!     .username("me@example.com")
//!     .password("app-password")
//!     .from_filter("Example Bank")
//!     .pattern(r"Your code is (\d{6})")
//!     .build()?;
//!
//! let mut mailbox = ImapMailbox::connect(&config).await?;
//! let code = Scanner::from_config(&config).scan(&mut mailbox).await;
//! mailbox.logout().await?;
//!
//! println!("Got code: {}", code?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Scanning Without a Server
//!
//! [`Scanner`] only talks to the mailbox through [`MailboxSession`], and
//! [`Scanner::scan_messages`] works on an already fetched batch:
//!
//! ```
//! use mail_extract::matcher::RegexMatcher;
//! use mail_extract::parser::RawMessage;
//! use mail_extract::window::select_window;
//! use mail_extract::Scanner;
//!
//! let matcher = RegexMatcher::new(r"code (\d+)").unwrap();
//! let scanner = Scanner::new(&matcher, "Bank");
//!
//! let messages = vec![
//!     RawMessage::new(1, "From: Bank <a@bank.example>\r\n\r\ncode 111\r\n"),
//!     RawMessage::new(2, "From: Bank <a@bank.example>\r\n\r\ncode 222\r\n"),
//! ];
//! let code = scanner.scan_messages(select_window(2).unwrap(), messages).unwrap();
//! assert_eq!(code, "222");
//! ```
//!
//! ## Error Handling
//!
//! All errors are variants of [`Error`]. [`Error::category`] groups them and
//! [`ErrorCategory::exit_code`] maps each group to a process exit status:
//!
//! ```
//! use mail_extract::Error;
//!
//! let error = Error::EmptyMailbox;
//! assert_eq!(error.category().exit_code(), 4);
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Network operations and the
//! scan emit spans with structured fields.
//!
//! ### Span Naming Convention
//!
//! - `ImapMailbox::connect` - Connection, login and `INBOX` selection
//! - `ImapMailbox::logout` - Logout
//! - `Scanner::scan` - Window selection, fetch and matching
//! - `session::authenticate` - IMAP authentication
//! - `session::fetch_window` - Bulk fetch
//! - `connection::open` - TCP connect and TLS handshake
//!
//! ### Standard Fields
//!
//! - `username` - Login name
//! - `imap_host` - IMAP server hostname
//! - `window` - Sequence set being fetched
//! - `seq` - Message sequence number
//! - `matcher` - Matcher description

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod scanner;
pub mod window;

// Internal modules
mod client;
mod connection;
mod session;

// Re-exports for ergonomic API
pub use client::{ImapMailbox, INBOX};
pub use config::{DecodeFaultPolicy, ExtractorConfig, ExtractorConfigBuilder, TimeoutConfig};
pub use error::{Error, ErrorCategory, Result};
pub use scanner::{MailboxSession, Scanner};
pub use window::{SequenceWindow, MAX_WINDOW_SIZE};
