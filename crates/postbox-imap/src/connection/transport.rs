//! Byte transport seam between the driver and the network.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::Result;

/// A bidirectional byte stream the session runs over.
///
/// `receive` yields one complete server response at a time, literals
/// included. It must be cancel-safe: the driver races it against client
/// requests and timers, and a partially received response has to survive a
/// lost race.
pub trait Transport: Send {
    /// Writes and flushes `data`.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Returns the next complete response, or `None` once the peer closed.
    fn receive(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Switches to TLS in place after a successful STARTTLS.
    fn upgrade_to_secure(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Switches both directions to raw DEFLATE (RFC 4978).
    fn enable_compression(&mut self) -> Result<()>;

    /// Returns `true` once the stream runs over TLS.
    fn is_secure(&self) -> bool;

    /// Shuts the write side down.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Raw stream that [`FramedStream`](super::FramedStream) can frame.
pub trait SecureStream: AsyncRead + AsyncWrite + Unpin + Send {
    /// Whether traffic is currently encrypted.
    fn is_secure(&self) -> bool;

    /// Performs the TLS handshake over the existing connection.
    fn start_tls(&mut self) -> impl Future<Output = Result<()>> + Send;
}

impl SecureStream for tokio::io::DuplexStream {
    fn is_secure(&self) -> bool {
        false
    }

    async fn start_tls(&mut self) -> Result<()> {
        Err(crate::Error::Unsupported(
            "STARTTLS over an in-memory stream".to_string(),
        ))
    }
}
