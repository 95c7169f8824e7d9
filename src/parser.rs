//! Decoding and sender filtering of fetched messages.
//!
//! A [`RawMessage`] is parsed, checked against the sender filter and its body
//! decoded from the declared `Content-Transfer-Encoding` into plain text.
//! Filtering a message out is a normal outcome (`Ok(None)`), while framing or
//! decoding faults are errors.

use crate::error::{Error, Result};
use mailparse::body::Body;
use mailparse::{parse_mail, MailHeaderMap, MailParseError, ParsedMail};
use quoted_printable::ParseMode;
use tracing::debug;

/// A fetched message: its sequence number and the raw RFC 5322 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// IMAP sequence number of the message.
    pub seq: u32,
    /// Full message source, headers included.
    pub body: Vec<u8>,
}

impl RawMessage {
    /// Creates a raw message.
    #[must_use]
    pub fn new(seq: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            seq,
            body: body.into(),
        }
    }
}

/// A message that passed the sender filter, with its body decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Value of the `From` header.
    pub sender: String,
    /// Body text after transfer decoding.
    pub body: String,
}

/// Parses `raw`, applies the sender filter and decodes the body.
///
/// Returns `Ok(None)` when the `From` header does not contain
/// `sender_filter` (case-sensitive substring match).
///
/// # Errors
///
/// - [`Error::ParseMessage`] if the message framing is malformed
/// - [`Error::DecodeBody`] if a body cannot be decoded per its transfer encoding
pub fn decode_message(raw: &RawMessage, sender_filter: &str) -> Result<Option<DecodedMessage>> {
    let seq = raw.seq;

    let parsed = parse_mail(&raw.body)
        .and_then(|parsed| check_header_block(&raw.body).map(|()| parsed))
        .map_err(|source| Error::ParseMessage { seq, source })?;

    let sender = parsed.headers.get_first_value("From").unwrap_or_default();
    if !sender.contains(sender_filter) {
        debug!(seq, sender = %sender, "Sender does not match filter");
        return Ok(None);
    }

    let body = extract_body_text(&parsed).map_err(|message| Error::DecodeBody { seq, message })?;

    Ok(Some(DecodedMessage { sender, body }))
}

/// Rejects header lines that are neither `name: value` nor a continuation
/// of the previous header. `parse_mail` accepts such lines silently.
fn check_header_block(raw: &[u8]) -> std::result::Result<(), MailParseError> {
    for (index, line) in raw.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            break;
        }

        let is_continuation = matches!(line[0], b' ' | b'\t');
        let has_name = matches!(line.iter().position(|&b| b == b':'), Some(colon) if colon > 0);

        if (is_continuation && index == 0) || (!is_continuation && !has_name) {
            return Err(MailParseError::Generic("malformed header line"));
        }
    }
    Ok(())
}

/// Extracts the decoded text of a parsed message.
///
/// Single-part messages are decoded whatever their content type. For
/// multipart messages every `text/*` leaf is decoded and the texts are joined
/// with newlines in document order.
fn extract_body_text(parsed: &ParsedMail<'_>) -> std::result::Result<String, String> {
    if parsed.subparts.is_empty() {
        return decode_part(parsed);
    }

    let mut texts = Vec::new();
    collect_text_parts(parsed, &mut texts)?;
    Ok(texts.join("\n"))
}

fn collect_text_parts(
    part: &ParsedMail<'_>,
    texts: &mut Vec<String>,
) -> std::result::Result<(), String> {
    if part.subparts.is_empty() {
        if part.ctype.mimetype.starts_with("text/") {
            texts.push(decode_part(part)?);
        }
        return Ok(());
    }

    for subpart in &part.subparts {
        collect_text_parts(subpart, texts)?;
    }
    Ok(())
}

/// Decodes a single leaf part per its transfer encoding.
fn decode_part(part: &ParsedMail<'_>) -> std::result::Result<String, String> {
    let bytes = match part.get_body_encoded() {
        Body::QuotedPrintable(body) => {
            let checked = check_qp_escapes(body.get_raw())?;
            quoted_printable::decode(checked, ParseMode::Robust)
                .map_err(|e| format!("malformed quoted-printable data: {e}"))?
        }
        Body::Base64(body) => body
            .get_decoded()
            .map_err(|e| format!("malformed base64 data: {e}"))?,
        Body::SevenBit(body) | Body::EightBit(body) => body.get_raw().to_vec(),
        Body::Binary(body) => body.get_raw().to_vec(),
    };

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Verifies that every `=` in a quoted-printable body starts either a hex
/// escape or a soft line break, and upper-cases the hex digits.
///
/// Long lines and bare LF line endings are accepted.
fn check_qp_escapes(raw: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut out = raw.to_vec();
    let mut ix = 0;

    while ix < out.len() {
        if out[ix] != b'=' {
            ix += 1;
            continue;
        }

        match (out.get(ix + 1).copied(), out.get(ix + 2).copied()) {
            (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out[ix + 1].make_ascii_uppercase();
                out[ix + 2].make_ascii_uppercase();
                ix += 3;
            }
            _ => {
                // Soft break: optional trailing blanks, then end of line or input.
                let rest = &out[ix + 1..];
                let blanks = rest.iter().take_while(|&&b| b == b' ' || b == b'\t').count();
                let after = &rest[blanks..];
                let soft_break =
                    after.is_empty() || after.starts_with(b"\n") || after.starts_with(b"\r\n");
                if !soft_break {
                    return Err(format!(
                        "malformed quoted-printable data: invalid escape at byte {ix}"
                    ));
                }
                ix += 1;
            }
        }
    }

    Ok(out)
}
