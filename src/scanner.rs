//! The scan loop: window selection, one bulk fetch, newest-first matching.
//!
//! A scan goes through four steps:
//!
//! 1. read the message count and select the window of recent messages
//! 2. fetch the whole window in a single request
//! 3. walk the fetched messages from the highest sequence number down,
//!    decoding and filtering each one and running the matcher on it
//! 4. stop at the first extraction, or fail once the window is exhausted
//!
//! The first extraction wins, so the newest matching message always
//! determines the result and older messages are never decoded.

use crate::config::{DecodeFaultPolicy, ExtractorConfig};
use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::parser::{self, RawMessage};
use crate::window::{self, SequenceWindow};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

/// A mailbox the scanner can read from.
///
/// Implemented by [`ImapMailbox`](crate::ImapMailbox); tests implement it
/// over in-memory messages.
#[async_trait(?Send)]
pub trait MailboxSession {
    /// Number of messages in the selected mailbox.
    async fn message_count(&mut self) -> Result<u32>;

    /// Fetches all messages of `window` in one request.
    async fn fetch_window(&mut self, window: SequenceWindow) -> Result<Vec<RawMessage>>;
}

/// Finds the newest message from a matching sender whose body matches.
#[derive(Clone, Copy)]
pub struct Scanner<'a> {
    matcher: &'a dyn Matcher,
    sender_filter: &'a str,
    decode_fault: DecodeFaultPolicy,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner that aborts on undecodable bodies.
    #[must_use]
    pub fn new(matcher: &'a dyn Matcher, sender_filter: &'a str) -> Self {
        Self {
            matcher,
            sender_filter,
            decode_fault: DecodeFaultPolicy::Abort,
        }
    }

    /// Creates a scanner from the configured pattern, filter and policy.
    #[must_use]
    pub fn from_config(config: &'a ExtractorConfig) -> Self {
        Self::new(config.matcher(), &config.from_filter).with_decode_fault(config.decode_fault)
    }

    /// Sets the handling of undecodable bodies.
    #[must_use]
    pub fn with_decode_fault(mut self, policy: DecodeFaultPolicy) -> Self {
        self.decode_fault = policy;
        self
    }

    /// Runs a full scan against `session`.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyMailbox`] if the mailbox holds no messages
    /// - [`Error::NoMatchInWindow`] if no message in the window matches
    /// - any session, parse or decode error, which aborts the scan
    #[instrument(
        name = "Scanner::scan",
        skip_all,
        fields(matcher = %self.matcher.description(), sender_filter = %self.sender_filter)
    )]
    pub async fn scan<S>(&self, session: &mut S) -> Result<String>
    where
        S: MailboxSession + ?Sized,
    {
        let total = session.message_count().await?;
        let window = window::select_window(total)?;

        debug!(total, window = %window, "Window selected");

        let messages = session.fetch_window(window).await?;

        self.scan_messages(window, messages)
    }

    /// Scans an already fetched batch, newest first.
    ///
    /// Messages outside `window` are ignored. The batch may be in any order.
    ///
    /// # Errors
    ///
    /// Same as [`scan`](Self::scan), minus the session errors.
    pub fn scan_messages(
        &self,
        window: SequenceWindow,
        mut messages: Vec<RawMessage>,
    ) -> Result<String> {
        messages.retain(|message| window.contains(message.seq));
        messages.sort_unstable_by_key(|message| message.seq);

        for raw in messages.iter().rev() {
            let seq = raw.seq;

            let decoded = match parser::decode_message(raw, self.sender_filter) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => continue,
                Err(error @ Error::DecodeBody { .. })
                    if self.decode_fault == DecodeFaultPolicy::Skip =>
                {
                    warn!(seq, error = %error, "Skipping undecodable message");
                    continue;
                }
                Err(error) => return Err(error),
            };

            if let Some(found) = self.matcher.find_match(&decoded.body) {
                info!(seq, sender = %decoded.sender, "Found match");
                return Ok(found.into_owned());
            }

            debug!(seq, "No match in message body");
        }

        Err(Error::NoMatchInWindow { window })
    }
}

impl std::fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("matcher", &self.matcher.description())
            .field("sender_filter", &self.sender_filter)
            .field("decode_fault", &self.decode_fault)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::RegexMatcher;

    fn message(seq: u32, from: &str, body: &str) -> RawMessage {
        RawMessage::new(seq, format!("From: {from}\r\nSubject: test\r\n\r\n{body}\r\n"))
    }

    #[test]
    fn test_newest_match_wins_regardless_of_input_order() {
        let matcher = RegexMatcher::new(r"code (\d+)").unwrap();
        let scanner = Scanner::new(&matcher, "Bank");
        let messages = vec![
            message(3, "Bank <a@bank.example>", "code 333"),
            message(5, "Bank <a@bank.example>", "code 555"),
            message(4, "Bank <a@bank.example>", "code 444"),
        ];

        let found = scanner
            .scan_messages(SequenceWindow::new(1, 5).unwrap(), messages)
            .unwrap();
        assert_eq!(found, "555");
    }

    #[test]
    fn test_filtered_sender_is_skipped() {
        let matcher = RegexMatcher::new(r"code (\d+)").unwrap();
        let scanner = Scanner::new(&matcher, "Bank");
        let messages = vec![
            message(1, "Bank <a@bank.example>", "code 111"),
            message(2, "Spam <s@spam.example>", "code 222"),
        ];

        let found = scanner
            .scan_messages(SequenceWindow::new(1, 2).unwrap(), messages)
            .unwrap();
        assert_eq!(found, "111");
    }

    #[test]
    fn test_messages_outside_window_are_ignored() {
        let matcher = RegexMatcher::new(r"code (\d+)").unwrap();
        let scanner = Scanner::new(&matcher, "");
        let messages = vec![message(3, "Bank <a@bank.example>", "code 333")];

        let err = scanner
            .scan_messages(SequenceWindow::new(6, 15).unwrap(), messages)
            .unwrap_err();
        assert!(matches!(err, Error::NoMatchInWindow { .. }));
    }

    #[test]
    fn test_decode_fault_aborts_by_default() {
        let matcher = RegexMatcher::new(r"code (\d+)").unwrap();
        let scanner = Scanner::new(&matcher, "Bank");
        let broken = RawMessage::new(
            2,
            "From: Bank <a@bank.example>\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\ncode =ZZ\r\n",
        );
        let messages = vec![message(1, "Bank <a@bank.example>", "code 111"), broken];

        let err = scanner
            .scan_messages(SequenceWindow::new(1, 2).unwrap(), messages)
            .unwrap_err();
        assert!(matches!(err, Error::DecodeBody { seq: 2, .. }));
    }

    #[test]
    fn test_decode_fault_skip_policy_continues() {
        let matcher = RegexMatcher::new(r"code (\d+)").unwrap();
        let scanner = Scanner::new(&matcher, "Bank").with_decode_fault(DecodeFaultPolicy::Skip);
        let broken = RawMessage::new(
            2,
            "From: Bank <a@bank.example>\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\ncode =ZZ\r\n",
        );
        let messages = vec![message(1, "Bank <a@bank.example>", "code 111"), broken];

        let found = scanner
            .scan_messages(SequenceWindow::new(1, 2).unwrap(), messages)
            .unwrap();
        assert_eq!(found, "111");
    }

    #[test]
    fn test_match_short_circuits_before_older_faults() {
        let matcher = RegexMatcher::new(r"code (\d+)").unwrap();
        let scanner = Scanner::new(&matcher, "Bank");
        let broken = RawMessage::new(
            1,
            "From: Bank <a@bank.example>\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\ncode =ZZ\r\n",
        );
        let messages = vec![broken, message(2, "Bank <a@bank.example>", "code 222")];

        let found = scanner
            .scan_messages(SequenceWindow::new(1, 2).unwrap(), messages)
            .unwrap();
        assert_eq!(found, "222");
    }
}
