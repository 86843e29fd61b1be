//! # postbox-imap
//!
//! A client-side IMAP protocol engine.
//!
//! High-level mailbox operations are turned into IMAP command trees, sent
//! over a long-lived connection, and the server's responses are decoded into
//! typed results. Behaviour adapts to what the server advertises: STARTTLS,
//! `COMPRESS=DEFLATE`, IDLE, CONDSTORE, UIDPLUS, MOVE, NAMESPACE, ID and the
//! Gmail `X-GM-*` extensions.
//!
//! ## Quick Start
//!
//! ```ignore
//! use postbox_imap::{Client, Config, Credentials, LoggingHandler, SelectOptions};
//! use postbox_imap::command::FetchOptions;
//!
//! #[tokio::main]
//! async fn main() -> postbox_imap::Result<()> {
//!     let config = Config::builder("imap.example.com")
//!         .auth(Credentials::password("user@example.com", "secret"))
//!         .build();
//!     let client = Client::open(config, LoggingHandler).await?;
//!
//!     let tree = client.list_mailboxes().await?;
//!     for mailbox in tree.descendants() {
//!         println!("{} {:?}", mailbox.path, mailbox.special_use);
//!     }
//!
//!     let info = client.select_mailbox("INBOX", SelectOptions::default()).await?;
//!     let messages = client
//!         .list_messages("1:*", &["UID", "FLAGS", "ENVELOPE"], &FetchOptions::default())
//!         .await?;
//!     println!("{} messages, fetched {}", info.exists, messages.len());
//!
//!     client.logout().await
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select_mailbox() ──→ Selected
//!        │                              │                                  │
//!        └──────────── logout() / close() / connection loss ───────────→ Logout
//! ```
//!
//! Server pushes (`EXISTS`, `EXPUNGE`, `FETCH`), mailbox changes, errors and
//! connection close are reported through an [`EventHandler`].
//!
//! ## Modules
//!
//! - [`codec`]: modified UTF-7, XOAUTH2 tokens, IMAP dates, RFC 2047 words
//! - [`syntax`]: generic command/response trees, parser and serializer
//! - [`command`]: FETCH, SEARCH and STORE builders
//! - [`parser`]: decoders from response trees to typed results
//! - [`mailbox`]: mailbox tree and special-use detection
//! - [`protocol`]: sans-I/O command executor with IDLE handling
//! - [`connection`]: configuration, transports and the [`Client`] handle

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod command;
pub mod connection;
mod error;
pub mod handler;
pub mod mailbox;
pub mod parser;
pub mod protocol;
pub mod syntax;
pub mod types;

pub use connection::{
    Client, Config, ConfigBuilder, Credentials, FlagMode, FramedStream, ImapStream,
    MessageOptions, Security, SelectOptions, Transport,
};
pub use error::{Error, ErrorKind, Result};
pub use handler::{
    ChannelHandler, CollectingHandler, Event, EventHandler, LoggingHandler, NoopHandler, Update,
};
pub use mailbox::{MailboxNode, SpecialUseTable};
pub use syntax::{Attribute, Command, Response, ResponseTree};
pub use types::{CapabilitySet, SessionState};
