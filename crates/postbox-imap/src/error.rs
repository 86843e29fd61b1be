//! Error types for the IMAP engine.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response parsing error.
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Server completed a command with a tagged NO or BAD.
    #[error("Server returned {status}: {text}")]
    CommandRejected {
        /// `NO` or `BAD`.
        status: String,
        /// Bracketed response code, if the server sent one.
        code: Option<String>,
        /// Human-readable text.
        text: String,
    },

    /// No greeting or response arrived within the configured bound.
    #[error("Connection timed out after {0:?}")]
    ConnectionTimeout(Duration),

    /// The transport was closed underneath the session.
    #[error("Transport closed")]
    TransportClosed,

    /// The session was logged out while the request was pending.
    #[error("Session logged out")]
    LoggedOut,

    /// A required capability is missing.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A secure transport is required but the connection is not encrypted.
    #[error("TLS is required but the connection is not secure")]
    TlsRequired,

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Caller supplied an argument that cannot be expressed on the wire.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Text encoding or decoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Tagged NO/BAD from the server.
    CommandRejected,
    /// CREATE against a mailbox that already exists.
    AlreadyExists,
    /// Greeting or response deadline missed.
    ConnectionTimeout,
    /// Socket closed, or session logged out.
    TransportClosed,
    /// Capability absent for the requested operation.
    UnsupportedOperation,
    /// Malformed data, bad input or protocol violation.
    Protocol,
    /// Network or TLS failure.
    Io,
}

impl Error {
    /// Returns the taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CommandRejected { code, .. } => {
                if code
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case("ALREADYEXISTS"))
                {
                    ErrorKind::AlreadyExists
                } else {
                    ErrorKind::CommandRejected
                }
            }
            Self::ConnectionTimeout(_) => ErrorKind::ConnectionTimeout,
            Self::TransportClosed | Self::LoggedOut | Self::Bye(_) => ErrorKind::TransportClosed,
            Self::Unsupported(_) | Self::TlsRequired => ErrorKind::UnsupportedOperation,
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) => ErrorKind::Io,
            Self::Parse { .. } | Self::InvalidInput(_) | Self::Encoding(_) | Self::Protocol(_) => {
                ErrorKind::Protocol
            }
        }
    }

    /// Returns the server response code for a rejected command.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::CommandRejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_kind() {
        let err = Error::CommandRejected {
            status: "NO".to_string(),
            code: Some("ALREADYEXISTS".to_string()),
            text: "Mailbox exists".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.code(), Some("ALREADYEXISTS"));
    }

    #[test]
    fn test_rejected_kind() {
        let err = Error::CommandRejected {
            status: "BAD".to_string(),
            code: None,
            text: "Syntax error".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::CommandRejected);
        assert!(err.to_string().contains("BAD"));
    }

    #[test]
    fn test_closed_kinds() {
        assert_eq!(Error::TransportClosed.kind(), ErrorKind::TransportClosed);
        assert_eq!(Error::LoggedOut.kind(), ErrorKind::TransportClosed);
        assert_eq!(
            Error::Unsupported("MOVE".into()).kind(),
            ErrorKind::UnsupportedOperation
        );
    }
}
