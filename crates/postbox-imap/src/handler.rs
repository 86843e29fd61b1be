//! Session event notifications.
//!
//! IMAP servers push `EXISTS`, `EXPUNGE` and `FETCH` responses at any time
//! (RFC 2683). The client also reports mailbox selection changes, connection
//! timeouts and transport shutdown. All of these reach the application through
//! an [`EventHandler`], invoked in wire order.
//!
//! # Example
//!
//! ```ignore
//! use postbox_imap::{EventHandler, Update};
//!
//! struct Counter(u32);
//!
//! impl EventHandler for Counter {
//!     fn on_update(&mut self, update: &Update) {
//!         if let Update::Exists(count) = update {
//!             self.0 = *count;
//!         }
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::error::{Error, ErrorKind};
use crate::parser::{FetchRecord, MailboxInfo};

/// Unsolicited change to the selected mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// New message count.
    Exists(u32),
    /// Sequence number removed. Later sequence numbers shift down by one.
    Expunge(u32),
    /// Flag or metadata change made elsewhere.
    Fetch(FetchRecord),
}

/// Everything a handler can be told, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A mailbox change pushed by the server.
    Update(Update),
    /// A mailbox was opened.
    SelectMailbox {
        /// Mailbox path as given to the select call.
        path: String,
        /// SELECT/EXAMINE result.
        info: MailboxInfo,
    },
    /// The previously selected mailbox was closed.
    CloseMailbox(String),
    /// A fatal connection error.
    Error {
        /// Error category.
        kind: ErrorKind,
        /// Display text of the error.
        message: String,
    },
    /// The connection is gone.
    Close,
}

impl Event {
    /// Invokes the matching handler method.
    pub(crate) fn deliver(&self, handler: &mut dyn EventHandler) {
        match self {
            Self::Update(update) => handler.on_update(update),
            Self::SelectMailbox { path, info } => handler.on_select_mailbox(path, info),
            Self::CloseMailbox(path) => handler.on_close_mailbox(path),
            Self::Error { message, .. } => handler.on_error(&Error::Protocol(message.clone())),
            Self::Close => handler.on_close(),
        }
    }
}

impl From<&Error> for Event {
    fn from(error: &Error) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Receives session events. Every method defaults to doing nothing.
pub trait EventHandler: Send {
    /// Called for EXISTS, EXPUNGE and FETCH pushes.
    fn on_update(&mut self, update: &Update) {
        let _ = update;
    }

    /// Called after SELECT or EXAMINE succeeds.
    fn on_select_mailbox(&mut self, path: &str, info: &MailboxInfo) {
        let _ = (path, info);
    }

    /// Called when the session leaves the selected state.
    fn on_close_mailbox(&mut self, path: &str) {
        let _ = path;
    }

    /// Called once for the error that ends the connection.
    fn on_error(&mut self, error: &Error) {
        let _ = error;
    }

    /// Called once when the transport has closed.
    fn on_close(&mut self) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl EventHandler for NoopHandler {}

/// Logs events using tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_update(&mut self, update: &Update) {
        match update {
            Update::Exists(count) => tracing::debug!(count, "EXISTS"),
            Update::Expunge(seq) => tracing::debug!(seq, "EXPUNGE"),
            Update::Fetch(record) => tracing::debug!(seq = record.seq, values = ?record.values, "FETCH"),
        }
    }

    fn on_select_mailbox(&mut self, path: &str, info: &MailboxInfo) {
        tracing::debug!(path, exists = info.exists, read_only = info.read_only, "mailbox selected");
    }

    fn on_close_mailbox(&mut self, path: &str) {
        tracing::debug!(path, "mailbox closed");
    }

    fn on_error(&mut self, error: &Error) {
        tracing::error!(%error, "connection error");
    }

    fn on_close(&mut self) {
        tracing::info!("connection closed");
    }
}

/// Collects events into a shared list.
///
/// Clones share the same list, so a test can keep one clone and hand the
/// other to the client.
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CollectingHandler {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out the events collected so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Takes all collected events, leaving the list empty.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: Event) {
        self.lock().push(event);
    }
}

impl EventHandler for CollectingHandler {
    fn on_update(&mut self, update: &Update) {
        self.push(Event::Update(update.clone()));
    }

    fn on_select_mailbox(&mut self, path: &str, info: &MailboxInfo) {
        self.push(Event::SelectMailbox {
            path: path.to_string(),
            info: info.clone(),
        });
    }

    fn on_close_mailbox(&mut self, path: &str) {
        self.push(Event::CloseMailbox(path.to_string()));
    }

    fn on_error(&mut self, error: &Error) {
        self.push(Event::from(error));
    }

    fn on_close(&mut self) {
        self.push(Event::Close);
    }
}

/// Forwards events over an unbounded tokio channel, preserving order.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<Event>,
}

impl ChannelHandler {
    /// Creates a handler and the receiver that yields its events.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: Event) {
        // A dropped receiver just means nobody is listening
        let _ = self.sender.send(event);
    }
}

impl EventHandler for ChannelHandler {
    fn on_update(&mut self, update: &Update) {
        self.send(Event::Update(update.clone()));
    }

    fn on_select_mailbox(&mut self, path: &str, info: &MailboxInfo) {
        self.send(Event::SelectMailbox {
            path: path.to_string(),
            info: info.clone(),
        });
    }

    fn on_close_mailbox(&mut self, path: &str) {
        self.send(Event::CloseMailbox(path.to_string()));
    }

    fn on_error(&mut self, error: &Error) {
        self.send(Event::from(error));
    }

    fn on_close(&mut self) {
        self.send(Event::Close);
    }
}
