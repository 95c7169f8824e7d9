//! Implicit-TLS (IMAPS) transport.

use crate::error::{Error, Result};
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};

/// TLS-wrapped TCP stream carrying the IMAP session.
pub(crate) type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Connects to `host:port` and completes the TLS handshake, verifying the
/// certificate against `host`.
///
/// The host name is validated before any socket is opened.
#[instrument(name = "connection::open", skip_all, fields(imap_host = %host, imap_port = port))]
pub(crate) async fn open(host: &str, port: u16) -> Result<TlsStream> {
    let server_name = ServerName::try_from(host).map_err(|source| Error::InvalidDnsName {
        host: host.to_string(),
        source,
    })?;
    let target = format!("{host}:{port}");

    let tcp = TcpStream::connect(&target)
        .await
        .map_err(|source| Error::TcpConnect {
            target: target.clone(),
            source,
        })?;

    debug!("TCP connected, starting TLS handshake");

    tls_connector()
        .connect(server_name, tcp)
        .await
        .map_err(|source| Error::TlsConnect { target, source })
}

fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
