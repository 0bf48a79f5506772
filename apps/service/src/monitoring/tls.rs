use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use x509_parser::prelude::{FromDer, X509Certificate};

use super::types::{CertificateExpiry, CertificateStatus};
use crate::Error;

pub const DEFAULT_TLS_PORT: u16 = 443;

const SECONDS_PER_DAY: i64 = 86_400;

/// Reads the validity of the certificate a host presents
#[async_trait::async_trait]
pub trait CertificateInspector: Send + Sync {
    async fn inspect(&self, host: &str, port: u16) -> CertificateStatus;
}

/// Opens a verified TLS session and reads the leaf certificate's "not after"
pub struct TlsInspector {
    connector: TlsConnector,
    connect_timeout: Duration,
}

impl TlsInspector {
    /// Verify against the bundled Mozilla roots
    pub fn new(connect_timeout: Duration) -> Result<Self, Error> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_roots(root_store, connect_timeout)
    }

    pub fn with_roots(root_store: RootCertStore, connect_timeout: Duration) -> Result<Self, Error> {
        // Pin ring, the process-wide default provider may be ambiguous
        let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Configuration(format!("unsupported TLS configuration: {e}")))?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self { connector: TlsConnector::from(Arc::new(config)), connect_timeout })
    }

    async fn peer_not_after(&self, host: &str, port: u16) -> Result<DateTime<Utc>, Error> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| Error::TlsFault(format!("invalid DNS name: {host}")))?;

        let stream = timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| Error::TlsFault(format!("connect to {host}:{port} timed out")))?
            .map_err(|e| Error::TlsFault(format!("connect to {host}:{port} failed: {e}")))?;

        let tls_stream = timeout(self.connect_timeout, self.connector.connect(server_name, stream))
            .await
            .map_err(|_| Error::TlsFault(format!("TLS handshake with {host} timed out")))?
            .map_err(|e| Error::TlsFault(format!("TLS handshake with {host} failed: {e}")))?;

        let (_io, connection) = tls_stream.get_ref();
        let leaf = connection
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or_else(|| Error::TlsFault(format!("{host} presented no certificate")))?;

        not_after_from_der(leaf.as_ref())
    }
}

#[async_trait::async_trait]
impl CertificateInspector for TlsInspector {
    async fn inspect(&self, host: &str, port: u16) -> CertificateStatus {
        let expires_at = self.peer_not_after(host, port).await?;
        Ok(CertificateExpiry { days_left: days_left(expires_at, Utc::now()), expires_at })
    }
}

/// Parse the "not valid after" instant out of a DER certificate
pub fn not_after_from_der(der: &[u8]) -> Result<DateTime<Utc>, Error> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::TlsFault(format!("failed to parse certificate: {e}")))?;

    let timestamp = cert.validity().not_after.timestamp();
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| Error::TlsFault(format!("certificate expiry out of range: {timestamp}")))
}

/// Whole days between `now` and `expires_at`, rounded towards the past
pub fn days_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Host and port to inspect for an HTTPS url; `None` for any other scheme
pub fn tls_endpoint(raw_url: &str) -> Option<(String, u16)> {
    let url = url::Url::parse(raw_url).ok()?;
    if url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.trim_start_matches('[').trim_end_matches(']').to_string();
    Some((host, url.port().unwrap_or(DEFAULT_TLS_PORT)))
}
