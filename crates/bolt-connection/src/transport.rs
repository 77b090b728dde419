//! Socket ownership: resolves a [`TlsMode`] into a concrete, possibly
//! TLS-wrapped, byte stream. Everything above this module talks to a
//! `Pin<Box<dyn AsyncStream>>` and never needs to know whether TLS is
//! in play.

use std::pin::Pin;
use std::sync::Arc;

use bolt_core::config::TlsMode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, ClientConfig};
use tokio_rustls::TlsConnector;

/// Unifies a plain `TcpStream` and a TLS-wrapped one behind a single
/// object-safe trait so the connection layer can hold either without a
/// generic parameter threading through every type above it.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

pub type BoxedStream = Pin<Box<dyn AsyncStream>>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("tcp connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("tls setup failed: {0}")]
    Tls(String),
}

/// Opens a TCP connection to `(host, port)` and, per `tls_mode`, wraps
/// it in TLS before returning.
pub async fn connect(host: &str, port: u16, tls_mode: TlsMode) -> Result<BoxedStream, TransportError> {
    let tcp = TcpStream::connect((host, port))
        .await
        .map_err(TransportError::Connect)?;
    tcp.set_nodelay(true).map_err(TransportError::Connect)?;

    match tls_mode {
        TlsMode::Disabled => Ok(Box::pin(tcp)),
        TlsMode::Verified => {
            let config = verified_client_config()?;
            let connector = TlsConnector::from(Arc::new(config));
            let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            let stream = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            Ok(Box::pin(stream))
        }
        TlsMode::AcceptSelfSigned => {
            let config = accept_any_client_config();
            let connector = TlsConnector::from(Arc::new(config));
            let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            let stream = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            Ok(Box::pin(stream))
        }
    }
}

fn verified_client_config() -> Result<ClientConfig, TransportError> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs()
        .map_err(|e| TransportError::Tls(e.to_string()))?
    {
        // A handful of platform roots are malformed in the wild; skip
        // rather than fail the whole trust store.
        let _ = roots.add(cert);
    }
    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

fn accept_any_client_config() -> ClientConfig {
    ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
        .with_no_client_auth()
}

/// Certificate verifier for `bolt+ssc://`, which explicitly opts out of
/// chain validation to support self-signed deployments. Never used for
/// `bolt+s://`.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
