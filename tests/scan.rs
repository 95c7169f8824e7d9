//! End-to-end scan tests against an in-memory mailbox.

use async_trait::async_trait;
use mail_extract::matcher::RegexMatcher;
use mail_extract::parser::RawMessage;
use mail_extract::{
    DecodeFaultPolicy, Error, ExtractorConfig, MailboxSession, Result, Scanner, SequenceWindow,
};

// ─────────────────────────────────────────────────────────────────────────────
// Fake Mailbox
// ─────────────────────────────────────────────────────────────────────────────

/// Mailbox whose message `n` (1-based) is `messages[n - 1]`.
struct FakeMailbox {
    messages: Vec<String>,
    fetches: Vec<SequenceWindow>,
    reverse_delivery: bool,
}

impl FakeMailbox {
    fn new(messages: Vec<String>) -> Self {
        Self {
            messages,
            fetches: Vec::new(),
            reverse_delivery: false,
        }
    }

    /// Delivers fetched messages newest first, like a server streaming out of order.
    fn reversed(mut self) -> Self {
        self.reverse_delivery = true;
        self
    }
}

#[async_trait(?Send)]
impl MailboxSession for FakeMailbox {
    async fn message_count(&mut self) -> Result<u32> {
        Ok(u32::try_from(self.messages.len()).expect("small test mailbox"))
    }

    async fn fetch_window(&mut self, window: SequenceWindow) -> Result<Vec<RawMessage>> {
        self.fetches.push(window);

        let mut fetched: Vec<RawMessage> = (window.start()..=window.end())
            .map(|seq| RawMessage::new(seq, self.messages[seq as usize - 1].as_str()))
            .collect();
        if self.reverse_delivery {
            fetched.reverse();
        }
        Ok(fetched)
    }
}

fn mail(from: &str, body: &str) -> String {
    format!("From: {from}\r\nTo: me@example.com\r\nSubject: Notification\r\n\r\n{body}\r\n")
}

fn bank(body: &str) -> String {
    mail("Example Bank <noreply@bank.example>", body)
}

fn newsletter(body: &str) -> String {
    mail("Weekly News <news@news.example>", body)
}

fn code_matcher() -> RegexMatcher {
    RegexMatcher::new(r"Your code is (\d{6})").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Window Boundaries
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_mailbox_fails_without_fetching() {
    let matcher = code_matcher();
    let mut mailbox = FakeMailbox::new(Vec::new());

    let err = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::EmptyMailbox));
    assert_ne!(err.category().exit_code(), 0);
    assert!(mailbox.fetches.is_empty());
}

#[tokio::test]
async fn test_single_matching_message() {
    let matcher = code_matcher();
    let mut mailbox = FakeMailbox::new(vec![bank("Your code is 123456.")]);

    let code = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap();

    assert_eq!(code, "123456");
    assert_eq!(mailbox.fetches, vec![SequenceWindow::new(1, 1).unwrap()]);
}

#[tokio::test]
async fn test_match_outside_window_is_not_found() {
    // 15 messages, only #3 matches; the window is 6..=15.
    let messages: Vec<String> = (1..=15)
        .map(|n| {
            if n == 3 {
                bank("Your code is 333333.")
            } else {
                newsletter(&format!("Issue number {n}"))
            }
        })
        .collect();
    let matcher = code_matcher();
    let mut mailbox = FakeMailbox::new(messages);

    let err = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap_err();

    match err {
        Error::NoMatchInWindow { window } => {
            assert_eq!(window, SequenceWindow::new(6, 15).unwrap());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mailbox.fetches, vec![SequenceWindow::new(6, 15).unwrap()]);
}

#[tokio::test]
async fn test_exactly_one_fetch_per_scan() {
    let messages: Vec<String> = (1..=25)
        .map(|n| bank(&format!("Your code is {n:06}.")))
        .collect();
    let matcher = code_matcher();
    let mut mailbox = FakeMailbox::new(messages);

    let code = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap();

    assert_eq!(code, "000025");
    assert_eq!(mailbox.fetches, vec![SequenceWindow::new(16, 25).unwrap()]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Ordering
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_newest_matching_message_wins() {
    let messages = vec![
        bank("Your code is 111111."),
        bank("Your code is 222222."),
        newsletter("Your code is 999999."),
        bank("No code in this one."),
    ];
    let matcher = code_matcher();

    let mut mailbox = FakeMailbox::new(messages.clone());
    let code = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap();
    assert_eq!(code, "222222");

    // Delivery order does not change the result.
    let mut mailbox = FakeMailbox::new(messages).reversed();
    let code = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap();
    assert_eq!(code, "222222");
}

#[tokio::test]
async fn test_rescanning_is_idempotent() {
    let messages = vec![bank("Your code is 424242."), newsletter("hello")];
    let matcher = code_matcher();
    let scanner = Scanner::new(&matcher, "Example Bank");
    let mut mailbox = FakeMailbox::new(messages);

    let first = scanner.scan(&mut mailbox).await.unwrap();
    let second = scanner.scan(&mut mailbox).await.unwrap();

    assert_eq!(first, second);
}

// ─────────────────────────────────────────────────────────────────────────────
// Filtering and Extraction
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_filter_matches_anywhere_in_from_header() {
    let messages = vec![mail(
        "\"Security Team at Example Bank\" <security@bank.example>",
        "Your code is 777777.",
    )];
    let matcher = code_matcher();

    for filter in ["Example Bank", "security@bank", "bank.example>", "Team at"] {
        let mut mailbox = FakeMailbox::new(messages.clone());
        let code = Scanner::new(&matcher, filter)
            .scan(&mut mailbox)
            .await
            .unwrap();
        assert_eq!(code, "777777", "filter {filter:?}");
    }
}

#[tokio::test]
async fn test_capture_is_returned_verbatim() {
    let messages = vec![bank("Reset link: <https://bank.example/reset?t=a%20b > ok")];
    let matcher = RegexMatcher::new(r"Reset link: <([^>]*)>").unwrap();
    let mut mailbox = FakeMailbox::new(messages);

    let link = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap();

    assert_eq!(link, "https://bank.example/reset?t=a%20b ");
}

#[tokio::test]
async fn test_quoted_printable_body_is_decoded_before_matching() {
    let qp = "From: Example Bank <noreply@bank.example>\r\n\
              Content-Type: text/plain; charset=utf-8\r\n\
              Content-Transfer-Encoding: quoted-printable\r\n\
              \r\n\
              Your code is 86=\r\n\
              7530.\r\n"
        .to_string();
    let matcher = code_matcher();
    let mut mailbox = FakeMailbox::new(vec![qp]);

    let code = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap();

    assert_eq!(code, "867530");
}

// ─────────────────────────────────────────────────────────────────────────────
// Integrity Faults
// ─────────────────────────────────────────────────────────────────────────────

fn broken_qp() -> String {
    "From: Example Bank <noreply@bank.example>\r\n\
     Content-Transfer-Encoding: quoted-printable\r\n\
     \r\n\
     Your code is =G1=G2\r\n"
        .to_string()
}

#[tokio::test]
async fn test_decode_fault_aborts_scan() {
    let messages = vec![bank("Your code is 111111."), broken_qp()];
    let matcher = code_matcher();
    let mut mailbox = FakeMailbox::new(messages);

    let err = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DecodeBody { seq: 2, .. }));
    assert_eq!(err.category().exit_code(), 5);
}

#[tokio::test]
async fn test_decode_fault_skipped_when_configured() {
    let config = ExtractorConfig::builder()
        .imap_host("imap.example.com")
        .username("me")
        .password("secret")
        .from_filter("Example Bank")
        .pattern(r"Your code is (\d{6})")
        .decode_fault(DecodeFaultPolicy::Skip)
        .build()
        .unwrap();
    let mut mailbox = FakeMailbox::new(vec![bank("Your code is 111111."), broken_qp()]);

    let code = Scanner::from_config(&config)
        .scan(&mut mailbox)
        .await
        .unwrap();

    assert_eq!(code, "111111");
}

#[tokio::test]
async fn test_fault_in_filtered_message_is_ignored() {
    let foreign_broken = broken_qp().replace("Example Bank", "Somebody Else");
    let messages = vec![bank("Your code is 111111."), foreign_broken];
    let matcher = code_matcher();
    let mut mailbox = FakeMailbox::new(messages);

    let code = Scanner::new(&matcher, "Example Bank")
        .scan(&mut mailbox)
        .await
        .unwrap();

    assert_eq!(code, "111111");
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unset_password_variable_is_reported() {
    let json = r#"{
        "imap-host": "imap.example.com",
        "imap-port": 993,
        "username": "me@example.com",
        "password": "$MAIL_PW",
        "from-filter": "Example Bank",
        "regexp": "Your code is (\\d{6})"
    }"#;

    let err = ExtractorConfig::from_json_with(json, |_| None).unwrap_err();

    let message = err.to_string();
    assert!(message.contains("MAIL_PW"), "{message}");
    assert!(message.contains("password"), "{message}");
    assert_eq!(err.category().exit_code(), 2);
}
