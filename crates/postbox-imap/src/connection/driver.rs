//! Background task that owns the transport and the protocol core.
//!
//! The driver loops over three sources with `tokio::select!`: requests from
//! client handles, frames from the transport, and the core's next deadline.
//! Pending bytes are flushed at the top of every iteration, so an upgrade
//! reported by the core always happens before the next write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::transport::Transport;
use crate::handler::{Event, EventHandler};
use crate::protocol::{Protocol, ProtocolEvent, RequestId, UpgradeAction};
use crate::syntax::{Command, Response, ResponseTree};
use crate::types::{Session, SessionState};
use crate::{Error, Result};

/// Reply channel for one command.
pub type Reply = oneshot::Sender<Result<ResponseTree>>;

/// Requests from client handles.
pub enum Message {
    /// Run a command and reply with its completion.
    Execute {
        /// Command to run.
        command: Command,
        /// Upper-cased untagged types to collect.
        expected: Vec<String>,
        /// Receives the completion.
        reply: Reply,
    },
    /// Start the idle cycle now.
    EnterIdle,
    /// Leave IDLE if it is active.
    BreakIdle,
    /// Stop the driver; outstanding requests fail with `LoggedOut`.
    Shutdown,
}

/// State shared between the driver and client handles.
///
/// Neither lock is held across an `.await`, and handler callbacks run after
/// the session lock is released.
pub struct Shared {
    session: Mutex<Session>,
    handler: Mutex<Box<dyn EventHandler>>,
}

impl Shared {
    /// Fresh session state around `handler`.
    pub fn new(handler: Box<dyn EventHandler>, secure: bool) -> Self {
        let session = Session {
            secure,
            ..Session::new()
        };
        Self {
            session: Mutex::new(session),
            handler: Mutex::new(handler),
        }
    }

    /// Locks the session record.
    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers one event to the handler.
    pub fn emit(&self, event: &Event) {
        let mut handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        event.deliver(handler.as_mut());
    }

    /// Passes a connection-level error to the handler.
    pub fn report_error(&self, error: &Error) {
        let mut handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        handler.on_error(error);
    }

    /// Changes state and reports a closed mailbox, if any.
    pub fn change_state(&self, next: SessionState) {
        let closed = {
            let mut session = self.session();
            let previous = session.state;
            let closed = session.change_state(next);
            if previous != next {
                debug!(from = %previous, to = %next, "state change");
            }
            closed
        };
        if let Some(path) = closed {
            self.emit(&Event::CloseMailbox(path));
        }
    }
}

/// The driver task.
pub struct Driver<T> {
    transport: T,
    protocol: Protocol,
    shared: Arc<Shared>,
    requests: mpsc::UnboundedReceiver<Message>,
    pending: HashMap<RequestId, Reply>,
    greeting: Option<oneshot::Sender<Result<Response>>>,
}

impl<T: Transport> Driver<T> {
    /// Wires a driver; nothing runs until [`Driver::run`].
    pub fn new(
        transport: T,
        protocol: Protocol,
        shared: Arc<Shared>,
        requests: mpsc::UnboundedReceiver<Message>,
        greeting: oneshot::Sender<Result<Response>>,
    ) -> Self {
        Self {
            transport,
            protocol,
            shared,
            requests,
            pending: HashMap::new(),
            greeting: Some(greeting),
        }
    }

    /// Runs until shutdown, timeout or transport close.
    pub async fn run(mut self) {
        let reason = self.serve().await;
        self.shutdown(reason).await;
    }

    async fn serve(&mut self) -> Error {
        loop {
            if let Err(error) = self.flush().await {
                return error;
            }

            let deadline = self.protocol.poll_timeout();
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                message = self.requests.recv() => match message {
                    Some(Message::Execute { command, expected, reply }) => {
                        let expected: Vec<&str> = expected.iter().map(String::as_str).collect();
                        let id = self.protocol.submit(command, &expected, Instant::now());
                        self.pending.insert(id, reply);
                    }
                    Some(Message::EnterIdle) => {
                        let session = self.shared.session().clone();
                        self.protocol.enter_idle(Instant::now(), &session);
                    }
                    Some(Message::BreakIdle) => self.protocol.break_idle(Instant::now()),
                    Some(Message::Shutdown) | None => return Error::LoggedOut,
                },
                frame = self.transport.receive() => match frame {
                    Ok(Some(frame)) => {
                        let events = {
                            let mut session = self.shared.session();
                            self.protocol.handle_frame(&frame, &mut session, Instant::now())
                        };
                        if let Err(error) = self.process(events).await {
                            return error;
                        }
                    }
                    Ok(None) => return Error::TransportClosed,
                    Err(error) => return error,
                },
                () = timer => {
                    let session = self.shared.session().clone();
                    let events = self.protocol.handle_timeout(Instant::now(), &session);
                    if let Err(error) = self.process(events).await {
                        return error;
                    }
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<()> {
        while let Some(transmit) = self.protocol.poll_transmit() {
            self.transport.send(&transmit.data).await?;
        }
        Ok(())
    }

    async fn process(&mut self, events: Vec<ProtocolEvent>) -> Result<()> {
        for event in events {
            match event {
                ProtocolEvent::Greeting(response) => {
                    if let Some(greeting) = self.greeting.take() {
                        let _ = greeting.send(Ok(response));
                    }
                }
                ProtocolEvent::Completed { id, result } => {
                    if let Some(reply) = self.pending.remove(&id) {
                        // The caller may have given up waiting
                        let _ = reply.send(result);
                    }
                }
                ProtocolEvent::Notify(event) => self.shared.emit(&event),
                ProtocolEvent::Upgrade(UpgradeAction::StartTls) => {
                    info!("upgrading connection to TLS");
                    self.transport.upgrade_to_secure().await?;
                    self.shared.session().secure = true;
                }
                ProtocolEvent::Upgrade(UpgradeAction::Compress) => {
                    info!("enabling DEFLATE compression");
                    self.transport.enable_compression()?;
                }
                ProtocolEvent::Timeout(after) => return Err(Error::ConnectionTimeout(after)),
            }
        }
        Ok(())
    }

    /// Fails everything still waiting, closes the transport and notifies the
    /// handler.
    async fn shutdown(mut self, reason: Error) {
        debug!(%reason, "driver stopping");

        let mut replies: Vec<Reply> = self
            .protocol
            .close()
            .into_iter()
            .filter_map(|id| self.pending.remove(&id))
            .collect();
        replies.extend(self.pending.drain().map(|(_, reply)| reply));

        self.requests.close();
        while let Ok(message) = self.requests.try_recv() {
            if let Message::Execute { reply, .. } = message {
                replies.push(reply);
            }
        }

        for reply in replies {
            let _ = reply.send(Err(terminal_error(&reason)));
        }
        if let Some(greeting) = self.greeting.take() {
            let _ = greeting.send(Err(terminal_error(&reason)));
        }

        self.shared.change_state(SessionState::Logout);

        if matches!(reason, Error::ConnectionTimeout(_) | Error::Io(_) | Error::Tls(_) | Error::Protocol(_)) {
            warn!(%reason, "connection failed");
            self.shared.report_error(&reason);
        }
        if let Err(error) = self.transport.close().await {
            debug!(%error, "error while closing transport");
        }
        self.shared.emit(&Event::Close);
    }
}

/// The error a request receives when the driver stops underneath it.
fn terminal_error(reason: &Error) -> Error {
    match reason {
        Error::ConnectionTimeout(after) => Error::ConnectionTimeout(*after),
        Error::LoggedOut => Error::LoggedOut,
        _ => Error::TransportClosed,
    }
}
