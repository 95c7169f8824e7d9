//! Selection of the sequence range to fetch from the mailbox.
//!
//! Only the most recent [`MAX_WINDOW_SIZE`] messages are ever fetched. IMAP
//! sequence numbers are 1-based and contiguous, so the newest message is the
//! one numbered with the mailbox's message count.
//!
//! ```
//! use mail_extract::window::select_window;
//!
//! let window = select_window(15).unwrap();
//! assert_eq!((window.start(), window.end()), (6, 15));
//! assert_eq!(window.to_string(), "6:15");
//! ```

use crate::error::{Error, Result};

/// Maximum number of messages fetched per run.
pub const MAX_WINDOW_SIZE: u32 = 10;

/// An inclusive range of message sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceWindow {
    start: u32,
    end: u32,
}

impl SequenceWindow {
    /// Creates a window covering `start..=end`.
    ///
    /// Returns `None` if `start` is 0 or greater than `end`.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (1..=end).contains(&start).then_some(Self { start, end })
    }

    /// First (oldest) sequence number in the window.
    #[must_use]
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last (newest) sequence number in the window.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of messages covered by the window.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always `false`; a window covers at least one message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if `seq` falls inside the window.
    #[must_use]
    pub fn contains(&self, seq: u32) -> bool {
        (self.start..=self.end).contains(&seq)
    }
}

/// Renders the window as an IMAP sequence set, e.g. `6:15`.
impl std::fmt::Display for SequenceWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Computes the window of the most recent messages for a mailbox holding
/// `total_message_count` messages.
///
/// # Errors
///
/// Returns [`Error::EmptyMailbox`] if the mailbox holds no messages.
pub fn select_window(total_message_count: u32) -> Result<SequenceWindow> {
    if total_message_count == 0 {
        return Err(Error::EmptyMailbox);
    }

    let start = total_message_count
        .saturating_sub(MAX_WINDOW_SIZE - 1)
        .max(1);

    Ok(SequenceWindow {
        start,
        end: total_message_count,
    })
}
