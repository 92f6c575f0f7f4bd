//! Transport types for SMTP connections.

#![allow(clippy::missing_errors_doc)]

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::{CertificateDer, ServerName};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::config::Config;
use crate::{Error, Result};

/// A byte stream the [`Client`](super::Client) can drive.
///
/// Implemented by [`SmtpStream`]; tests and embedders can supply their own.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + Sized {
    /// Performs the TLS handshake on an established plaintext stream
    /// (STARTTLS), verifying the certificate for `config.host`.
    fn upgrade_to_secure(self, config: &Config) -> impl Future<Output = Result<Self>> + Send;
}

/// A stream that can be either plaintext or TLS.
pub enum SmtpStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl SmtpStream {
    /// Opens the connection described by `config`, with TLS from the first
    /// byte when `use_secure_transport` is set.
    pub async fn connect(config: &Config) -> Result<Self> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
        if config.use_secure_transport {
            let tls = handshake(tcp, config).await?;
            Ok(Self::Tls(Box::new(tls)))
        } else {
            Ok(Self::Plain(tcp))
        }
    }

    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl std::fmt::Debug for SmtpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("SmtpStream::Plain"),
            Self::Tls(_) => f.write_str("SmtpStream::Tls"),
        }
    }
}

impl Transport for SmtpStream {
    async fn upgrade_to_secure(self, config: &Config) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let tls = handshake(tcp, config).await?;
                Ok(Self::Tls(Box::new(tls)))
            }
            Self::Tls(_) => Err(Error::InvalidState("Stream is already TLS".to_string())),
        }
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

async fn handshake(tcp: TcpStream, config: &Config) -> Result<TlsStream<TcpStream>> {
    let connector = create_tls_connector(&config.ca_certs)?;
    let server_name = ServerName::try_from(config.host.clone())?;
    Ok(connector.connect(server_name, tcp).await?)
}

/// Creates a TLS connector trusting the webpki roots plus `extra_roots`.
pub fn create_tls_connector(extra_roots: &[CertificateDer<'static>]) -> Result<TlsConnector> {
    let mut root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    for cert in extra_roots {
        root_store.add(cert.clone())?;
    }

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tls_connector() {
        let connector = create_tls_connector(&[]);
        assert!(connector.is_ok());
    }

    #[test]
    fn test_invalid_extra_root_rejected() {
        let bogus = CertificateDer::from(vec![0u8, 1, 2, 3]);
        assert!(matches!(create_tls_connector(&[bogus]), Err(Error::Tls(_))));
    }
}
