//! Framed I/O for the IMAP protocol.
//!
//! IMAP responses are CRLF-terminated lines that may embed literals
//! (`{n}\r\n` followed by `n` raw bytes). [`FramedStream`] buffers inbound
//! bytes and hands out one complete response at a time. After
//! `COMPRESS DEFLATE` both directions run through raw DEFLATE.

#![allow(clippy::missing_errors_doc)]

use bytes::BytesMut;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::trace;

use super::transport::{SecureStream, Transport};
use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum literal size to prevent memory exhaustion.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024; // 100 MB

struct Deflate {
    compress: Compress,
    decompress: Decompress,
}

/// Buffered, literal-aware framing over a [`SecureStream`].
pub struct FramedStream<S> {
    stream: S,
    /// Decoded inbound bytes not yet returned as a frame.
    buffer: BytesMut,
    deflate: Option<Deflate>,
}

impl<S: SecureStream> FramedStream<S> {
    /// Creates a new framed stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            deflate: None,
        }
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Returns `true` once compression is active.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.deflate.is_some()
    }

    /// Splits one complete response off the buffer, if there is one.
    fn take_frame(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(frame_length(&self.buffer)?.map(|len| self.buffer.split_to(len).to_vec()))
    }

    fn ingest(&mut self, data: &[u8]) -> Result<()> {
        let Some(deflate) = self.deflate.as_mut() else {
            self.buffer.extend_from_slice(data);
            return Ok(());
        };

        let mut input = data;
        let mut out = [0u8; DEFAULT_BUFFER_SIZE];
        loop {
            let before_in = deflate.decompress.total_in();
            let before_out = deflate.decompress.total_out();
            deflate
                .decompress
                .decompress(input, &mut out, FlushDecompress::Sync)
                .map_err(|e| Error::Protocol(format!("inflate failed: {e}")))?;
            let consumed = usize::try_from(deflate.decompress.total_in() - before_in).unwrap_or(input.len());
            let produced = usize::try_from(deflate.decompress.total_out() - before_out).unwrap_or(0);

            self.buffer.extend_from_slice(&out[..produced]);
            input = &input[consumed.min(input.len())..];
            if produced < out.len() && (input.is_empty() || consumed == 0) {
                return Ok(());
            }
        }
    }

    fn deflate_output(deflate: &mut Deflate, mut data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() / 2 + 64);
        let mut chunk = [0u8; DEFAULT_BUFFER_SIZE];

        while !data.is_empty() {
            let before_in = deflate.compress.total_in();
            let before_out = deflate.compress.total_out();
            deflate
                .compress
                .compress(data, &mut chunk, FlushCompress::None)
                .map_err(|e| Error::Protocol(format!("deflate failed: {e}")))?;
            let consumed = usize::try_from(deflate.compress.total_in() - before_in).unwrap_or(data.len());
            let produced = usize::try_from(deflate.compress.total_out() - before_out).unwrap_or(0);
            output.extend_from_slice(&chunk[..produced]);
            data = &data[consumed.min(data.len())..];
        }

        loop {
            let before_out = deflate.compress.total_out();
            deflate
                .compress
                .compress(&[], &mut chunk, FlushCompress::Sync)
                .map_err(|e| Error::Protocol(format!("deflate failed: {e}")))?;
            let produced = usize::try_from(deflate.compress.total_out() - before_out).unwrap_or(0);
            output.extend_from_slice(&chunk[..produced]);
            // Every sync flush emits a marker block, so only a full chunk
            // means more is pending
            if produced < chunk.len() {
                break;
            }
        }

        Ok(output)
    }
}

impl<S: SecureStream> Transport for FramedStream<S> {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        match self.deflate.as_mut() {
            Some(deflate) => {
                let compressed = Self::deflate_output(deflate, data)?;
                self.stream.write_all(&compressed).await?;
            }
            None => self.stream.write_all(data).await?,
        }
        self.stream.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; DEFAULT_BUFFER_SIZE];
        loop {
            if let Some(frame) = self.take_frame()? {
                return Ok(Some(frame));
            }
            // The only await point; bytes read before a cancellation are
            // already in `buffer`
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                if !self.buffer.is_empty() {
                    trace!(bytes = self.buffer.len(), "discarding partial response at EOF");
                }
                return Ok(None);
            }
            self.ingest(&chunk[..n])?;
        }
    }

    async fn upgrade_to_secure(&mut self) -> Result<()> {
        // Plaintext sent after the STARTTLS completion must not be trusted
        self.buffer.clear();
        self.stream.start_tls().await
    }

    fn enable_compression(&mut self) -> Result<()> {
        if self.deflate.is_some() {
            return Err(Error::Protocol("compression already active".to_string()));
        }
        // Anything still buffered was read after the tagged OK and is
        // already deflated
        let pending = self.buffer.split().to_vec();
        self.deflate = Some(Deflate {
            compress: Compress::new(Compression::default(), false),
            decompress: Decompress::new(false),
        });
        if !pending.is_empty() {
            trace!(bytes = pending.len(), "inflating bytes read before compression");
            self.ingest(&pending)?;
        }
        Ok(())
    }

    fn is_secure(&self) -> bool {
        self.stream.is_secure()
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Finds the position of CRLF in a buffer.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Length of the first complete response in `buf`, literals included.
fn frame_length(buf: &[u8]) -> Result<Option<usize>> {
    let mut start = 0;
    loop {
        let Some(crlf) = find_crlf(&buf[start..]) else {
            if buf.len() - start > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
            return Ok(None);
        };
        let line_end = start + crlf + 2;

        match parse_literal_length(&buf[start..line_end]) {
            Some(len) => {
                if len > MAX_LITERAL_SIZE {
                    return Err(Error::Protocol(format!(
                        "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
                    )));
                }
                let literal_end = line_end + len;
                if buf.len() < literal_end {
                    return Ok(None);
                }
                start = literal_end;
            }
            None => return Ok(Some(line_end)),
        }
    }
}

/// Parses a literal length from the end of a line.
///
/// Matches patterns like `{123}\r\n` or `{123+}\r\n` (non-synchronizing).
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let open = line.iter().rposition(|&b| b == b'{')?;
    let inner = line[open + 1..].strip_suffix(b"}")?;
    let digits = inner.strip_suffix(b"+").unwrap_or(inner);
    std::str::from_utf8(digits).ok()?.parse().ok()
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
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tokio_test::io::{Builder, Mock};

    use super::*;

    impl SecureStream for Mock {
        fn is_secure(&self) -> bool {
            false
        }

        async fn start_tls(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"no newline"), None);
        assert_eq!(find_crlf(b"just\n"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
    }

    #[test]
    fn test_frame_length_waits_for_literal() {
        assert_eq!(frame_length(b"* 1 FETCH (BODY {5}\r\nhel").unwrap(), None);
        assert_eq!(frame_length(b"* 1 FETCH (BODY {5}\r\nhello)\r\n* OK").unwrap(), Some(29));
    }

    #[tokio::test]
    async fn test_receive_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);

        let response = framed.receive().await.unwrap().unwrap();
        assert_eq!(response, b"* OK ready\r\n");
        assert_eq!(framed.receive().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_receive_with_literal() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY {5}\r\n")
            .read(b"hello)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.receive().await.unwrap().unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn test_receive_splits_coalesced_frames() {
        let mock = Builder::new().read(b"* 3 EXISTS\r\nA0000 OK done\r\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.receive().await.unwrap().unwrap(), b"* 3 EXISTS\r\n");
        assert_eq!(framed.receive().await.unwrap().unwrap(), b"A0000 OK done\r\n");
    }

    #[tokio::test]
    async fn test_send_writes_through() {
        let mock = Builder::new().write(b"A0000 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.send(b"A0000 NOOP\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_literal_size_validation() {
        let header = format!("* 1 FETCH (BODY {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let error = framed.receive().await.unwrap_err();
        assert!(error.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_line_length_limit() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let error = framed.receive().await.unwrap_err();
        assert!(error.to_string().contains("line too long"));
    }

    #[tokio::test]
    async fn test_compressed_round_trip() {
        let (client, server) = duplex(64 * 1024);
        let mut client = FramedStream::new(client);
        let mut server = FramedStream::new(server);
        client.enable_compression().unwrap();
        server.enable_compression().unwrap();

        client.send(b"A0001 NOOP\r\n").await.unwrap();
        assert_eq!(server.receive().await.unwrap().unwrap(), b"A0001 NOOP\r\n");

        server.send(b"* 1 FETCH (BODY[] {3}\r\nabc)\r\nA0001 OK\r\n").await.unwrap();
        assert_eq!(
            client.receive().await.unwrap().unwrap(),
            b"* 1 FETCH (BODY[] {3}\r\nabc)\r\n"
        );
        assert_eq!(client.receive().await.unwrap().unwrap(), b"A0001 OK\r\n");
        assert!(client.is_compressed());
    }

    #[tokio::test]
    async fn test_compressed_bytes_differ_on_wire() {
        let (client, mut server) = duplex(64 * 1024);
        let mut client = FramedStream::new(client);
        client.enable_compression().unwrap();
        client.send(b"A0001 NOOP\r\n").await.unwrap();
        client.close().await.unwrap();

        let mut wire = Vec::new();
        server.read_to_end(&mut wire).await.unwrap();
        assert!(!wire.is_empty());
        assert_ne!(wire, b"A0001 NOOP\r\n");

        let mut inflate = Decompress::new(false);
        let mut out = vec![0u8; 64];
        inflate.decompress(&wire, &mut out, FlushDecompress::Sync).unwrap();
        assert_eq!(&out[..usize::try_from(inflate.total_out()).unwrap()], b"A0001 NOOP\r\n");
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_compression_inflates_bytes_read_with_completion() {
        let mut deflate = Deflate {
            compress: Compress::new(Compression::default(), false),
            decompress: Decompress::new(false),
        };
        let mut wire = b"A0001 OK DEFLATE active\r\n".to_vec();
        wire.extend(FramedStream::<Mock>::deflate_output(&mut deflate, b"* 1 EXISTS\r\n").unwrap());

        let mock = Builder::new().read(&wire).build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.receive().await.unwrap().unwrap(), b"A0001 OK DEFLATE active\r\n");
        framed.enable_compression().unwrap();
        assert_eq!(framed.receive().await.unwrap().unwrap(), b"* 1 EXISTS\r\n");
        assert_eq!(framed.receive().await.unwrap(), None);
    }

    #[test]
    fn test_deflate_output_flushes_once() {
        let mut deflate = Deflate {
            compress: Compress::new(Compression::default(), false),
            decompress: Decompress::new(false),
        };
        let first = FramedStream::<Mock>::deflate_output(&mut deflate, b"A0001 NOOP\r\n").unwrap();
        let second = FramedStream::<Mock>::deflate_output(&mut deflate, b"A0002 NOOP\r\n").unwrap();
        assert!(first.ends_with(&[0x00, 0x00, 0xff, 0xff]));
        assert!(second.ends_with(&[0x00, 0x00, 0xff, 0xff]));

        let mut inflate = Decompress::new(false);
        let mut out = vec![0u8; 64];
        let wire = [first, second].concat();
        inflate.decompress(&wire, &mut out, FlushDecompress::Sync).unwrap();
        let len = usize::try_from(inflate.total_out()).unwrap();
        assert_eq!(&out[..len], b"A0001 NOOP\r\nA0002 NOOP\r\n");
    }

    #[test]
    fn test_deflate_output_larger_than_chunk() {
        let mut deflate = Deflate {
            compress: Compress::new(Compression::none(), false),
            decompress: Decompress::new(false),
        };
        let data = vec![b'x'; DEFAULT_BUFFER_SIZE * 3];
        let wire = FramedStream::<Mock>::deflate_output(&mut deflate, &data).unwrap();
        assert!(wire.len() > data.len());

        let mut inflate = Decompress::new(false);
        let mut out = vec![0u8; data.len() + 64];
        inflate.decompress(&wire, &mut out, FlushDecompress::Sync).unwrap();
        assert_eq!(usize::try_from(inflate.total_out()).unwrap(), data.len());
        assert!(out[..data.len()].iter().all(|&b| b == b'x'));
    }

    #[tokio::test]
    async fn test_duplex_is_never_secure() {
        let (client, _server) = duplex(64);
        let mut framed = FramedStream::new(client);
        assert!(!framed.is_secure());
        assert!(framed.upgrade_to_secure().await.is_err());
    }
}
