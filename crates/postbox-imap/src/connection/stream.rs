//! TCP and TLS streams for IMAP connections.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use super::config::{Config, Security};
use super::transport::SecureStream;
use crate::{Error, Result};

enum Inner {
    Plain(TcpStream),
    /// Boxed to reduce enum size.
    Tls(Box<TlsStream<TcpStream>>),
    /// Transient state while a STARTTLS handshake owns the socket.
    Upgrading,
}

/// A TCP stream that is either plaintext or TLS, upgradable in place.
pub struct ImapStream {
    host: String,
    inner: Inner,
}

impl ImapStream {
    /// Wraps a plaintext connection to `host`.
    pub fn plain(host: impl Into<String>, stream: TcpStream) -> Self {
        Self {
            host: host.into(),
            inner: Inner::Plain(stream),
        }
    }

    /// Wraps an established TLS connection to `host`.
    pub fn tls(host: impl Into<String>, stream: TlsStream<TcpStream>) -> Self {
        Self {
            host: host.into(),
            inner: Inner::Tls(Box::new(stream)),
        }
    }

    /// Returns the server host name used for certificate validation.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl SecureStream for ImapStream {
    fn is_secure(&self) -> bool {
        matches!(self.inner, Inner::Tls(_))
    }

    async fn start_tls(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.inner, Inner::Upgrading) {
            Inner::Plain(tcp) => {
                let connector = create_tls_connector();
                let server_name = ServerName::try_from(self.host.clone())?;
                let tls = connector.connect(server_name, tcp).await?;
                self.inner = Inner::Tls(Box::new(tls));
                Ok(())
            }
            tls @ Inner::Tls(_) => {
                self.inner = tls;
                Ok(())
            }
            Inner::Upgrading => Err(Error::TransportClosed),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream lost during TLS upgrade")
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            Inner::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Inner::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
            Inner::Upgrading => Poll::Ready(Err(closed())),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            Inner::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Inner::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
            Inner::Upgrading => Poll::Ready(Err(closed())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            Inner::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Inner::Tls(stream) => Pin::new(stream).poll_flush(cx),
            Inner::Upgrading => Poll::Ready(Err(closed())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            Inner::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Inner::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
            Inner::Upgrading => Poll::Ready(Ok(())),
        }
    }
}

/// Creates a TLS connector with the webpki root certificates.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Opens a connection to the configured server.
///
/// Implicit TLS handshakes immediately; the other modes return a plaintext
/// stream. The whole attempt is bounded by `connect_timeout`.
pub async fn connect(config: &Config) -> Result<ImapStream> {
    tokio::time::timeout(config.connect_timeout, open(config))
        .await
        .map_err(|_| Error::ConnectionTimeout(config.connect_timeout))?
}

async fn open(config: &Config) -> Result<ImapStream> {
    let addr = format!("{}:{}", config.host, config.port);
    debug!(%addr, security = ?config.security, "connecting");
    let tcp = TcpStream::connect(&addr).await?;

    match config.security {
        Security::Implicit => {
            let server_name = ServerName::try_from(config.host.clone())?;
            let tls = create_tls_connector().connect(server_name, tcp).await?;
            Ok(ImapStream::tls(config.host.clone(), tls))
        }
        Security::StartTls | Security::None => Ok(ImapStream::plain(config.host.clone(), tcp)),
    }
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
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn test_create_tls_connector() {
        let _connector = create_tls_connector();
    }

    #[tokio::test]
    async fn test_plain_connect_is_not_secure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(Security::StartTls)
            .build();

        let (stream, accepted) = tokio::join!(connect(&config), listener.accept());
        accepted.unwrap();
        let stream = stream.unwrap();
        assert!(!stream.is_secure());
        assert_eq!(stream.host(), "127.0.0.1");
    }
}
