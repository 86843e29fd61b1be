//! Connection management.
//!
//! - Configuration (host, port, security mode, timers, credentials)
//! - The [`Transport`] seam and its framed implementation
//! - TCP/TLS stream with in-place STARTTLS
//! - The background driver task and the [`Client`] handle onto it

mod client;
mod config;
mod driver;
mod framed;
mod stream;
mod transport;

pub use client::{Client, FlagMode, MessageOptions, SelectOptions};
pub use config::{Config, ConfigBuilder, Credentials, Security};
pub use framed::FramedStream;
pub use stream::{ImapStream, connect, create_tls_connector};
pub use transport::{SecureStream, Transport};
