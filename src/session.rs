//! Internal IMAP session management.
//!
//! This module wraps async-imap operations with proper error handling.

use crate::connection::TlsStream;
use crate::error::{Error, Result};
use crate::parser::RawMessage;
use crate::window::SequenceWindow;
use async_imap::Session;
use futures::StreamExt;
use tracing::{debug, instrument};

/// Type alias for IMAP session over TLS.
pub(crate) type ImapSession = Session<TlsStream>;

/// Whole message source, without setting `\Seen`.
const FETCH_QUERY: &str = "BODY.PEEK[]";

/// Authenticates to IMAP server and returns a session.
#[instrument(name = "session::authenticate", skip_all, fields(username = %username))]
pub(crate) async fn authenticate(
    tls_stream: TlsStream,
    username: &str,
    password: &str,
) -> Result<ImapSession> {
    let client = async_imap::Client::new(tls_stream);

    debug!("Authenticating to IMAP server");

    client
        .login(username, password)
        .await
        .map_err(|e| Error::ImapLogin {
            username: username.to_string(),
            source: e.0,
        })
}

/// Selects a mailbox and returns the number of messages it holds.
#[instrument(name = "session::select", skip(session), fields(mailbox = %mailbox))]
pub(crate) async fn select_mailbox(session: &mut ImapSession, mailbox: &str) -> Result<u32> {
    debug!("Selecting mailbox");

    let selected = session
        .select(mailbox)
        .await
        .map_err(|source| Error::SelectMailbox {
            mailbox: mailbox.to_string(),
            source,
        })?;

    debug!(exists = selected.exists, "Mailbox selected");

    Ok(selected.exists)
}

/// Fetches every message of `window` in one FETCH command.
///
/// The response stream is drained completely before returning; messages come
/// back sorted by ascending sequence number regardless of delivery order.
/// Responses without a body section are dropped.
#[instrument(name = "session::fetch_window", skip(session), fields(window = %window))]
pub(crate) async fn fetch_window(
    session: &mut ImapSession,
    window: SequenceWindow,
) -> Result<Vec<RawMessage>> {
    let sequence_set = window.to_string();

    debug!("Fetching messages");

    let responses: Vec<_> = session
        .fetch(&sequence_set, FETCH_QUERY)
        .await
        .map_err(|source| Error::ImapFetch {
            sequence_set: sequence_set.clone(),
            source,
        })?
        .collect()
        .await;

    let mut messages = Vec::with_capacity(responses.len());
    for response in responses {
        let fetch = response.map_err(|source| Error::FetchMessage { source })?;

        match fetch.body() {
            Some(body) => messages.push(RawMessage::new(fetch.message, body)),
            None => debug!(seq = fetch.message, "Message has no body"),
        }
    }

    messages.sort_unstable_by_key(|message| message.seq);

    debug!(fetched = messages.len(), "Fetch complete");

    Ok(messages)
}

/// Logs out from IMAP session.
#[instrument(name = "session::logout", skip(session))]
pub(crate) async fn logout(session: &mut ImapSession) -> Result<()> {
    debug!("Logging out");

    session
        .logout()
        .await
        .map_err(|source| Error::ImapLogout { source })?;

    Ok(())
}
