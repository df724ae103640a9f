use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

pub const HTTPS_PORT: u16 = 443;

/// What a TLS handshake tells us about the served leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFacts {
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl CertificateFacts {
    /// Builds facts from the textual form peers report dates in, e.g.
    /// `"May 30 00:00:00 2023 GMT"`. Returns `None` if either date is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use certainty_server::monitor::inspector::CertificateFacts;
    ///
    /// let facts = CertificateFacts::from_peer_text(
    ///     "1234567890",
    ///     "May 30 00:00:00 2023 GMT",
    ///     "May 30 23:59:59 2024 GMT",
    /// )
    /// .unwrap();
    /// assert_eq!(facts.not_after.to_rfc3339(), "2024-05-30T23:59:59+00:00");
    /// assert!(CertificateFacts::from_peer_text("1", "garbage", "May 30 23:59:59 2024 GMT").is_none());
    /// ```
    pub fn from_peer_text(serial: &str, not_before: &str, not_after: &str) -> Option<Self> {
        let serial = serial.trim();
        if serial.is_empty() {
            return None;
        }
        Some(Self {
            serial: serial.to_string(),
            not_before: parse_peer_time(not_before)?,
            not_after: parse_peer_time(not_after)?,
        })
    }
}

/// Parses `"<Mon> <Day> <HH:MM:SS> <Year> GMT"` into a UTC instant. The day
/// may be space padded (`"Jun  1 ..."`).
pub fn parse_peer_time(text: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let [month, day, time, year, zone] = parts.as_slice() else {
        return None;
    };
    if !matches!(*zone, "GMT" | "UTC") {
        return None;
    }
    let normalized = format!("{month} {day} {time} {year}");
    NaiveDateTime::parse_from_str(&normalized, "%b %d %H:%M:%S %Y")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Reads the certificate a domain serves.
///
/// Implementations never fail loudly: any problem reaching or parsing the
/// peer comes back as `None`.
#[async_trait]
pub trait CertificateInspector: Send + Sync {
    async fn inspect(&self, domain: &str) -> Option<CertificateFacts>;
}

/// Inspects certificates with a real TLS handshake on port 443.
///
/// Trust is not verified: the point is to read whatever certificate the
/// server presents, including expired or self-signed ones.
pub struct TlsInspector {
    connector: TlsConnector,
    port: u16,
    timeout: Duration,
}

impl TlsInspector {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_port(HTTPS_PORT, timeout)
    }

    pub fn with_port(port: u16, timeout: Duration) -> Result<Self> {
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| anyhow!("Failed to build TLS config: {e}"))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
        .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            port,
            timeout,
        })
    }

    async fn fetch(&self, domain: &str) -> Result<CertificateFacts> {
        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|e| anyhow!("Invalid domain name: {e}"))?;

        let tcp = tokio::time::timeout(self.timeout, TcpStream::connect((domain, self.port)))
            .await
            .map_err(|_| anyhow!("Connection timed out after {:?}", self.timeout))?
            .map_err(|e| anyhow!("TCP connection failed: {e}"))?;

        let tls = tokio::time::timeout(self.timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| anyhow!("TLS handshake timed out"))?
            .map_err(|e| anyhow!("TLS handshake failed: {e}"))?;

        let (_io, conn) = tls.get_ref();
        let leaf = conn
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or_else(|| anyhow!("No peer certificates"))?;

        facts_from_der(leaf.as_ref())
    }
}

#[async_trait]
impl CertificateInspector for TlsInspector {
    async fn inspect(&self, domain: &str) -> Option<CertificateFacts> {
        match self.fetch(domain).await {
            Ok(facts) => Some(facts),
            Err(e) => {
                tracing::warn!(domain, error = %e, "Certificate inspection failed");
                None
            }
        }
    }
}

fn facts_from_der(der: &[u8]) -> Result<CertificateFacts> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| anyhow!("Failed to parse X.509 certificate: {e}"))?;

    let validity = cert.validity();
    let not_before = DateTime::from_timestamp(validity.not_before.timestamp(), 0)
        .ok_or_else(|| anyhow!("notBefore out of range"))?;
    let not_after = DateTime::from_timestamp(validity.not_after.timestamp(), 0)
        .ok_or_else(|| anyhow!("notAfter out of range"))?;

    Ok(CertificateFacts {
        serial: serial_hex(cert.raw_serial()),
        not_before,
        not_after,
    })
}

/// Uppercase hex without separators, the way OpenSSL prints serials.
fn serial_hex(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len() * 2);
    for b in raw {
        let _ = write!(out, "{b:02X}");
    }
    out
}

#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
