//! Content matching for extracting data from decoded message bodies.
//!
//! The [`Matcher`] trait is the seam between the scan loop and the extraction
//! logic. [`RegexMatcher`] is the implementation driven by the configured
//! `regexp`: it returns the first capture group of the first match.
//!
//! # Example
//!
//! ```
//! use mail_extract::matcher::{RegexMatcher, Matcher};
//!
//! let matcher = RegexMatcher::new(r"token=([a-f0-9]+)").unwrap();
//! let text = "Click here: https://example.com?token=abc123";
//! assert_eq!(matcher.find_match(text).as_deref(), Some("abc123"));
//! ```

use regex::Regex;
use std::borrow::Cow;

/// Trait for matching and extracting content from message bodies.
///
/// # Example
///
/// ```
/// use mail_extract::matcher::Matcher;
/// use std::borrow::Cow;
///
/// struct FirstLine;
///
/// impl Matcher for FirstLine {
///     fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
///         text.lines().next().map(Cow::Borrowed)
///     }
///
///     fn description(&self) -> &str {
///         "first line"
///     }
/// }
/// ```
pub trait Matcher: Send + Sync {
    /// Attempts to find and extract matching content from the text.
    ///
    /// Returns `Some(matched_value)` if found, `None` otherwise.
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>>;

    /// Returns a human-readable description of what this matcher looks for.
    ///
    /// Used in logging.
    fn description(&self) -> &str;
}

/// Regex-based matcher that extracts the first capture group.
///
/// Only the leftmost match is inspected. If that match leaves group 1 unset
/// (for instance `(a)?b` against `"b"`), there is no result, even if a later
/// match would set it.
///
/// ```
/// use mail_extract::matcher::{RegexMatcher, Matcher};
///
/// let matcher = RegexMatcher::new(r"code:\s*(\d+)").unwrap();
/// assert_eq!(matcher.find_match("Your code: 42"), Some("42".into()));
/// ```
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    description: String,
}

impl RegexMatcher {
    /// Compiles a new regex matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            description: format!("regex pattern: {pattern}"),
            regex,
        })
    }

    /// Returns the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns `true` if the pattern has at least one capture group.
    ///
    /// A pattern without one compiles fine but can never extract anything.
    #[must_use]
    pub fn has_capture_group(&self) -> bool {
        // captures_len counts the implicit whole-match group 0
        self.regex.captures_len() > 1
    }
}

impl Matcher for RegexMatcher {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| Cow::Borrowed(m.as_str()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
