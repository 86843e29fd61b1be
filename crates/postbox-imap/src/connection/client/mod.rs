//! Public IMAP client handle.
//!
//! A [`Client`] is a cheap, cloneable handle onto a background driver task.
//! Every operation is queued on the driver and resolved through its own reply
//! channel, so handles can be shared across tasks while commands still go out
//! one at a time.
//!
//! Operations are grouped by concern:
//!
//! - `setup`: capabilities, STARTTLS, compression, ID, login and logout
//! - `mailbox`: SELECT/EXAMINE, LIST/LSUB, NAMESPACE, CREATE/DELETE/RENAME
//! - `message`: FETCH, SEARCH, STORE, COPY/MOVE, EXPUNGE, APPEND

#![allow(clippy::missing_errors_doc)]

mod mailbox;
mod message;
mod setup;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

pub use self::mailbox::SelectOptions;
pub use self::message::{FlagMode, MessageOptions};
use super::config::Config;
use super::driver::{Driver, Message, Shared};
use super::framed::FramedStream;
use super::stream;
use super::transport::Transport;
use crate::handler::EventHandler;
use crate::protocol::Protocol;
use crate::syntax::{Command, ResponseTree};
use crate::types::{CapabilitySet, SessionState};
use crate::{Error, Result};

/// Handle onto a running IMAP session.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
    sender: mpsc::UnboundedSender<Message>,
    config: Arc<Config>,
    driver: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.shared.session();
        f.debug_struct("Client")
            .field("host", &self.config.host)
            .field("state", &session.state)
            .field("selected_mailbox", &session.selected_mailbox)
            .field("secure", &session.secure)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connects to `config.host` over TCP (and TLS for implicit security)
    /// and runs the session setup.
    pub async fn open(config: Config, handler: impl EventHandler + 'static) -> Result<Self> {
        let stream = stream::connect(&config).await?;
        Self::connect(FramedStream::new(stream), config, handler).await
    }

    /// Starts a session over an already open transport.
    ///
    /// Waits for the greeting, then negotiates capabilities, STARTTLS,
    /// client ID, login and compression as configured. On failure the
    /// driver is shut down before the error is returned.
    pub async fn connect<T>(
        transport: T,
        config: Config,
        handler: impl EventHandler + 'static,
    ) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let shared = Arc::new(Shared::new(Box::new(handler), transport.is_secure()));
        let (sender, requests) = mpsc::unbounded_channel();
        let (greeting_tx, greeting_rx) = oneshot::channel();
        let protocol = Protocol::new(config.timings(), Instant::now());
        let driver = Driver::new(transport, protocol, Arc::clone(&shared), requests, greeting_tx);
        let handle = tokio::spawn(driver.run());

        let client = Self {
            shared,
            sender,
            config: Arc::new(config),
            driver: Arc::new(Mutex::new(Some(handle))),
        };

        let greeting = match greeting_rx.await {
            Ok(greeting) => greeting,
            Err(_) => Err(Error::TransportClosed),
        };
        let result = match greeting {
            Ok(response) if response.command == "BYE" => {
                Err(Error::Bye(response.human_readable.unwrap_or_default()))
            }
            Ok(_) => client.bring_up().await,
            Err(error) => Err(error),
        };

        if let Err(error) = result {
            debug!(%error, "session setup failed");
            client.shutdown().await;
            return Err(error);
        }
        Ok(client)
    }

    async fn bring_up(&self) -> Result<()> {
        self.update_capability(false).await?;

        if !self.config.ignore_tls && self.upgrade_connection().await? {
            self.update_capability(true).await?;
        }
        if self.config.require_tls && !self.is_secure() {
            return Err(Error::TlsRequired);
        }

        if let Some(client_id) = self.config.client_id.as_ref() {
            self.update_id(Some(client_id)).await?;
        }
        // PREAUTH greetings skip LOGIN
        if let Some(credentials) = self.config.auth.as_ref() {
            if !self.state().is_authenticated() {
                self.login(credentials).await?;
            }
        }
        self.compress_connection().await?;
        Ok(())
    }

    /// Runs an arbitrary command and returns its response tree.
    ///
    /// Untagged responses whose type is in `expected` are collected into the
    /// tree. All others go to the event handler, including ones named after
    /// the command itself, such as the EXPUNGE pushes of an `EXPUNGE`.
    pub async fn execute(
        &self,
        command: impl Into<Command>,
        expected: &[&str],
    ) -> Result<ResponseTree> {
        let (reply, response) = oneshot::channel();
        let message = Message::Execute {
            command: command.into(),
            expected: expected.iter().map(|kind| kind.to_ascii_uppercase()).collect(),
            reply,
        };
        self.sender.send(message).map_err(|_| self.closed_error())?;
        response.await.map_err(|_| self.closed_error())?
    }

    /// Enters IDLE (or starts NOOP polling) without waiting for the delay.
    pub fn enter_idle(&self) {
        let _ = self.sender.send(Message::EnterIdle);
    }

    /// Leaves IDLE if it is active.
    pub fn break_idle(&self) {
        let _ = self.sender.send(Message::BreakIdle);
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.session().state
    }

    /// Path of the open mailbox, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<String> {
        self.shared.session().selected_mailbox.clone()
    }

    /// Snapshot of the server's advertised capabilities.
    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.shared.session().capabilities.clone()
    }

    /// Case-insensitive capability check. The empty token is never present.
    #[must_use]
    pub fn has_capability(&self, token: &str) -> bool {
        self.shared.session().capabilities.contains(token)
    }

    /// Whether the transport is encrypted.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.shared.session().secure
    }

    /// The configuration this session was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stops the driver and waits for it to finish.
    async fn shutdown(&self) {
        let _ = self.sender.send(Message::Shutdown);
        let handle = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                debug!(%error, "driver task ended abnormally");
            }
        }
    }

    fn closed_error(&self) -> Error {
        if self.state() == SessionState::Logout {
            Error::LoggedOut
        } else {
            Error::TransportClosed
        }
    }
}
