//! Outgoing protocol data.

/// Bytes the I/O layer should write to the server, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    /// Raw bytes for the wire.
    pub data: Vec<u8>,
}

impl Transmit {
    /// Wraps bytes for sending.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the data as a string slice, if valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

impl From<&[u8]> for Transmit {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl AsRef<[u8]> for Transmit {
    fn as_ref(&self) -> &[u8] {
        &self.data
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
    use super::*;

    #[test]
    fn test_transmit_as_str() {
        let t = Transmit::from(&b"A0000 NOOP\r\n"[..]);
        assert_eq!(t.as_str(), Some("A0000 NOOP\r\n"));
        assert_eq!(t.as_ref(), b"A0000 NOOP\r\n");
    }

    #[test]
    fn test_transmit_binary() {
        let t = Transmit::new(vec![0xff, 0xfe]);
        assert_eq!(t.as_str(), None);
    }
}
