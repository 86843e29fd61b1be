//! Sans-I/O IMAP command executor.
//!
//! [`Protocol`] owns everything about a session that does not touch a socket:
//! the tag generator, the ordered command queue, the command in flight, the
//! IDLE cycle and every deadline. The I/O layer feeds it complete frames and
//! the current time, and drains bytes to write:
//!
//! - `submit()` queues a command and returns its [`RequestId`];
//! - `handle_frame()` consumes one server response and reports
//!   [`ProtocolEvent`]s;
//! - `poll_transmit()` yields bytes to send, in order;
//! - `poll_timeout()` / `handle_timeout()` drive IDLE, keepalive NOOPs and
//!   connection timeouts.
//!
//! Only one command awaits a tagged completion at a time. Untagged responses
//! whose type the in-flight command accepts are collected into its
//! [`ResponseTree`]; everything else goes through [`dispatch`].
//!
//! # Example
//!
//! ```ignore
//! use postbox_imap::protocol::{Protocol, ProtocolEvent, Timings};
//!
//! let mut protocol = Protocol::new(Timings::default(), Instant::now());
//! protocol.handle_frame(b"* OK ready\r\n", &mut session, Instant::now());
//! let id = protocol.submit("CAPABILITY".into(), &[], Instant::now());
//!
//! while let Some(transmit) = protocol.poll_transmit() {
//!     send_to_server(&transmit.data);
//! }
//! ```

#![allow(clippy::missing_const_for_fn)]

mod dispatch;
mod idle;
mod transmit;

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

pub use dispatch::{UntaggedKind, dispatch};
pub use idle::{DONE, IdleStage, IdleTimer};
pub use transmit::Transmit;

use crate::command::TagGenerator;
use crate::handler::Event;
use crate::syntax::{Command, Redacted, Response, ResponseTree, parse_response, serialize_command};
use crate::types::{Session, SessionState};
use crate::{Error, Result};

/// Identifies a submitted command until its completion is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Transport change that must happen before anything else is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeAction {
    /// STARTTLS completed; switch to TLS.
    StartTls,
    /// COMPRESS DEFLATE completed; switch to raw deflate.
    Compress,
}

impl UpgradeAction {
    fn for_command(base_name: &str) -> Option<Self> {
        match base_name {
            "STARTTLS" => Some(Self::StartTls),
            "COMPRESS" => Some(Self::Compress),
            _ => None,
        }
    }
}

/// Events produced by the protocol state machine.
#[derive(Debug)]
pub enum ProtocolEvent {
    /// The server greeting (`OK`, `PREAUTH` or `BYE`).
    Greeting(Response),
    /// A submitted command finished.
    Completed {
        /// Id returned by [`Protocol::submit`].
        id: RequestId,
        /// The tree on `OK`, otherwise the rejection.
        result: Result<ResponseTree>,
    },
    /// An unsolicited update for the event handler.
    Notify(Event),
    /// Reported just before the `Completed` of the command that requires it.
    Upgrade(UpgradeAction),
    /// No greeting or response arrived within the given bound.
    Timeout(Duration),
}

/// Timer settings for the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Deadline for the server greeting.
    pub connect_timeout: Duration,
    /// Longest silence tolerated while a command awaits completion.
    pub response_timeout: Duration,
    /// Pause after the queue drains before the idle cycle starts.
    pub enter_idle_delay: Duration,
    /// How long an IDLE runs before `DONE` is sent.
    pub idle_timeout: Duration,
    /// Keepalive period for servers without IDLE.
    pub noop_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(90),
            response_timeout: Duration::from_secs(60),
            enter_idle_delay: Duration::from_secs(1),
            idle_timeout: Duration::from_secs(60),
            noop_interval: Duration::from_secs(60),
        }
    }
}

struct Queued {
    id: RequestId,
    command: Command,
    expected: Vec<String>,
}

/// Who is waiting for the in-flight completion.
#[derive(Debug, Clone, Copy)]
enum Origin {
    Request(RequestId),
    Idle(IdleStage),
    Keepalive,
}

struct InFlight {
    tag: String,
    origin: Origin,
    /// Untagged types collected into `tree`.
    accepted: Vec<String>,
    /// Chunks still waiting for a `+` continuation.
    chunks: VecDeque<Vec<u8>>,
    upgrade: Option<UpgradeAction>,
    tree: ResponseTree,
}

/// Sans-I/O IMAP executor.
pub struct Protocol {
    timings: Timings,
    tags: TagGenerator,
    next_id: u64,
    queue: VecDeque<Queued>,
    current: Option<InFlight>,
    outbound: VecDeque<Transmit>,
    idle_timer: IdleTimer,
    greeted: bool,
    greeting_deadline: Option<Instant>,
    response_deadline: Option<Instant>,
    closed: bool,
}

impl Protocol {
    /// Creates an executor waiting for the server greeting.
    #[must_use]
    pub fn new(timings: Timings, now: Instant) -> Self {
        Self {
            timings,
            tags: TagGenerator::default(),
            next_id: 0,
            queue: VecDeque::new(),
            current: None,
            outbound: VecDeque::new(),
            idle_timer: IdleTimer::Off,
            greeted: false,
            greeting_deadline: Some(now + timings.connect_timeout),
            response_deadline: None,
            closed: false,
        }
    }

    /// Returns `true` once the greeting has been processed.
    #[must_use]
    pub fn is_greeted(&self) -> bool {
        self.greeted
    }

    /// Returns `true` while an IDLE command has been acknowledged by the
    /// server and not yet terminated.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(
            self.current,
            Some(InFlight {
                origin: Origin::Idle(stage),
                ..
            }) if stage.is_entered()
        )
    }

    /// Number of submitted commands not yet completed.
    #[must_use]
    pub fn pending(&self) -> usize {
        let in_flight = matches!(
            self.current,
            Some(InFlight {
                origin: Origin::Request(_),
                ..
            })
        );
        self.queue.len() + usize::from(in_flight)
    }

    /// Queues a command. Untagged responses whose type is in `expected` are
    /// collected into its completion; all others are dispatched.
    pub fn submit(&mut self, command: Command, expected: &[&str], now: Instant) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.queue.push_back(Queued {
            id,
            command,
            expected: expected.iter().map(|kind| kind.to_ascii_uppercase()).collect(),
        });
        self.pump(now);
        id
    }

    /// Returns the next bytes to write, if any.
    pub fn poll_transmit(&mut self) -> Option<Transmit> {
        self.outbound.pop_front()
    }

    /// Returns the earliest pending deadline.
    ///
    /// The caller should call `handle_timeout()` once it is reached.
    #[must_use]
    pub fn poll_timeout(&self) -> Option<Instant> {
        let idle_deadline = self.current.as_ref().and_then(|current| match current.origin {
            Origin::Idle(stage) => stage.deadline(),
            Origin::Request(_) | Origin::Keepalive => None,
        });
        [
            self.greeting_deadline,
            self.response_deadline,
            idle_deadline,
            self.idle_timer.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Handles every deadline that has passed by `now`.
    pub fn handle_timeout(&mut self, now: Instant, session: &Session) -> Vec<ProtocolEvent> {
        if self.closed {
            return Vec::new();
        }
        if self.greeting_deadline.is_some_and(|deadline| now >= deadline) {
            self.greeting_deadline = None;
            return vec![ProtocolEvent::Timeout(self.timings.connect_timeout)];
        }
        if self.response_deadline.is_some_and(|deadline| now >= deadline) {
            self.response_deadline = None;
            return vec![ProtocolEvent::Timeout(self.timings.response_timeout)];
        }

        if let Some(current) = self.current.as_mut() {
            if let Origin::Idle(stage) = &mut current.origin {
                if stage.deadline().is_some_and(|done_at| now >= done_at) {
                    debug!("IDLE timeout reached, sending DONE");
                    *stage = IdleStage::Done;
                    self.outbound.push_back(Transmit::from(DONE));
                    self.response_deadline = Some(now + self.timings.response_timeout);
                }
            }
        }

        match self.idle_timer {
            IdleTimer::EnterAt(at) if now >= at => {
                self.idle_timer = IdleTimer::Off;
                self.begin_idle(now, session);
            }
            IdleTimer::NoopAt(at) if now >= at => {
                self.idle_timer = IdleTimer::Off;
                if self.current.is_none() && self.queue.is_empty() {
                    self.start(now, Command::new("NOOP"), Vec::new(), Origin::Keepalive);
                }
            }
            _ => {}
        }

        Vec::new()
    }

    /// Starts the idle cycle now instead of after `enter_idle_delay`.
    pub fn enter_idle(&mut self, now: Instant, session: &Session) {
        self.idle_timer = IdleTimer::Off;
        self.begin_idle(now, session);
    }

    /// Sends `DONE` if an IDLE is entered; otherwise does nothing.
    pub fn break_idle(&mut self, now: Instant) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if let Origin::Idle(stage) = &mut current.origin {
            if stage.is_entered() {
                *stage = IdleStage::Done;
                self.outbound.push_back(Transmit::from(DONE));
                self.response_deadline = Some(now + self.timings.response_timeout);
            }
        }
    }

    /// Stops the executor and returns every request still owed a completion.
    pub fn close(&mut self) -> Vec<RequestId> {
        self.closed = true;
        self.idle_timer = IdleTimer::Off;
        self.greeting_deadline = None;
        self.response_deadline = None;
        self.outbound.clear();

        let mut ids = Vec::new();
        if let Some(InFlight {
            origin: Origin::Request(id),
            ..
        }) = self.current.take()
        {
            ids.push(id);
        }
        ids.extend(self.queue.drain(..).map(|queued| queued.id));
        ids
    }

    /// Consumes one complete server response.
    pub fn handle_frame(
        &mut self,
        frame: &[u8],
        session: &mut Session,
        now: Instant,
    ) -> Vec<ProtocolEvent> {
        trace!(frame = %String::from_utf8_lossy(frame).trim_end(), "received");
        let response = match parse_response(frame) {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "skipping unparsable response");
                return Vec::new();
            }
        };

        if self.response_deadline.is_some() {
            self.response_deadline = Some(now + self.timings.response_timeout);
        }

        let mut events = Vec::new();
        if !self.greeted {
            self.handle_greeting(response, session, now, &mut events);
        } else if response.is_continuation() {
            self.handle_continuation(now);
        } else if response.is_untagged() {
            self.handle_untagged(response, session, &mut events);
        } else {
            self.handle_tagged(response, session, now, &mut events);
        }
        events
    }

    fn handle_greeting(
        &mut self,
        response: Response,
        session: &mut Session,
        now: Instant,
        events: &mut Vec<ProtocolEvent>,
    ) {
        if !response.is_untagged() || !response.is_status() {
            warn!(tag = %response.tag, kind = %response.command, "expected a greeting");
            return;
        }

        self.greeted = true;
        self.greeting_deadline = None;
        if response.command == "PREAUTH" {
            session.change_state(SessionState::Authenticated);
        }
        if response.code.as_deref() == Some("CAPABILITY") {
            session.capabilities.replace_from_attributes(&response.code_args);
        }
        debug!(status = %response.command, "greeting received");
        events.push(ProtocolEvent::Greeting(response));
        self.pump(now);
    }

    fn handle_continuation(&mut self, now: Instant) {
        let Some(current) = self.current.as_mut() else {
            warn!("continuation without a command in flight");
            return;
        };

        if let Some(chunk) = current.chunks.pop_front() {
            self.outbound.push_back(Transmit::new(chunk));
            return;
        }

        match &mut current.origin {
            Origin::Idle(stage) => match *stage {
                IdleStage::Requested { break_pending: true } => {
                    *stage = IdleStage::Done;
                    self.outbound.push_back(Transmit::from(DONE));
                }
                IdleStage::Requested { break_pending: false } => {
                    debug!("entered IDLE");
                    *stage = IdleStage::Entered {
                        done_at: now + self.timings.idle_timeout,
                    };
                    self.response_deadline = None;
                }
                IdleStage::Entered { .. } | IdleStage::Done => {}
            },
            Origin::Request(_) | Origin::Keepalive => {
                // A SASL challenge carries error details; an empty reply
                // makes the server send the tagged failure
                debug!("answering continuation with an empty line");
                self.outbound.push_back(Transmit::from(&b"\r\n"[..]));
            }
        }
    }

    fn handle_untagged(
        &mut self,
        response: Response,
        session: &mut Session,
        events: &mut Vec<ProtocolEvent>,
    ) {
        if let Some(current) = self.current.as_mut() {
            if current.accepted.iter().any(|kind| *kind == response.command) {
                current.tree.push(response);
                return;
            }
        }
        if let Some(event) = dispatch(&response, session) {
            events.push(ProtocolEvent::Notify(event));
        }
    }

    fn handle_tagged(
        &mut self,
        response: Response,
        session: &mut Session,
        now: Instant,
        events: &mut Vec<ProtocolEvent>,
    ) {
        let Some(mut current) = self.current.take_if(|current| current.tag == response.tag) else {
            warn!(tag = %response.tag, "completion for unknown tag");
            return;
        };
        self.response_deadline = None;

        let ok = response.command == "OK";
        if ok {
            if response.code.as_deref() == Some("CAPABILITY") {
                session.capabilities.replace_from_attributes(&response.code_args);
            } else if let Some(record) = current.tree.records("CAPABILITY").last() {
                session.capabilities.replace_from_attributes(&record.attributes);
            }
        }

        match current.origin {
            Origin::Request(id) => {
                let result = if ok {
                    if let Some(action) = current.upgrade {
                        events.push(ProtocolEvent::Upgrade(action));
                    }
                    current.tree.response = response;
                    Ok(current.tree)
                } else {
                    Err(Error::CommandRejected {
                        status: response.command,
                        code: response.code,
                        text: response.human_readable.unwrap_or_default(),
                    })
                };
                events.push(ProtocolEvent::Completed { id, result });
            }
            Origin::Idle(_) | Origin::Keepalive if !ok => {
                warn!(
                    status = %response.command,
                    text = ?response.human_readable,
                    "background command rejected"
                );
            }
            Origin::Idle(_) | Origin::Keepalive => {}
        }

        self.pump(now);
    }

    /// Starts the next queued command, breaks an IDLE that is in the way, or
    /// arms the idle timer once the queue has drained.
    fn pump(&mut self, now: Instant) {
        if !self.greeted || self.closed {
            return;
        }

        if let Some(current) = self.current.as_mut() {
            if self.queue.is_empty() {
                return;
            }
            if let Origin::Idle(stage) = &mut current.origin {
                match *stage {
                    IdleStage::Entered { .. } => {
                        debug!("breaking IDLE for queued command");
                        *stage = IdleStage::Done;
                        self.outbound.push_back(Transmit::from(DONE));
                        self.response_deadline = Some(now + self.timings.response_timeout);
                    }
                    IdleStage::Requested { .. } => {
                        *stage = IdleStage::Requested { break_pending: true };
                    }
                    IdleStage::Done => {}
                }
            }
            return;
        }

        match self.queue.pop_front() {
            Some(next) => self.start(now, next.command, next.expected, Origin::Request(next.id)),
            None => self.idle_timer = IdleTimer::EnterAt(now + self.timings.enter_idle_delay),
        }
    }

    fn begin_idle(&mut self, now: Instant, session: &Session) {
        if self.closed
            || self.current.is_some()
            || !self.queue.is_empty()
            || !session.state.is_authenticated()
        {
            return;
        }
        if session.capabilities.contains("IDLE") {
            self.start(
                now,
                Command::new("IDLE"),
                Vec::new(),
                Origin::Idle(IdleStage::Requested { break_pending: false }),
            );
        } else {
            self.idle_timer = IdleTimer::NoopAt(now + self.timings.noop_interval);
        }
    }

    fn start(&mut self, now: Instant, command: Command, accepted: Vec<String>, origin: Origin) {
        let tag = self.tags.next_tag();
        let redacted = Redacted {
            tag: &tag,
            command: &command,
        };
        debug!(command = %redacted, "sending");

        let base_name = command.base_name();
        let mut chunks: VecDeque<Vec<u8>> = serialize_command(&tag, &command).into();
        if let Some(first) = chunks.pop_front() {
            self.outbound.push_back(Transmit::new(first));
        }

        self.idle_timer = IdleTimer::Off;
        self.response_deadline = Some(now + self.timings.response_timeout);
        self.current = Some(InFlight {
            tag,
            origin,
            upgrade: UpgradeAction::for_command(&base_name),
            accepted,
            chunks,
            tree: ResponseTree::default(),
        });
    }
}

impl std::fmt::Debug for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("greeted", &self.greeted)
            .field("queued", &self.queue.len())
            .field("in_flight", &self.current.as_ref().map(|c| &c.tag))
            .field("outbound_count", &self.outbound.len())
            .field("idle_timer", &self.idle_timer)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::handler::Update;
    use crate::syntax::Attribute;

    const SECOND: Duration = Duration::from_secs(1);

    fn drain(protocol: &mut Protocol) -> Vec<String> {
        std::iter::from_fn(|| protocol.poll_transmit())
            .map(|t| String::from_utf8(t.data).unwrap())
            .collect()
    }

    fn greeted(session: &mut Session, now: Instant) -> Protocol {
        let mut protocol = Protocol::new(Timings::default(), now);
        let events = protocol.handle_frame(b"* OK ready\r\n", session, now);
        assert!(matches!(events.as_slice(), [ProtocolEvent::Greeting(_)]));
        protocol
    }

    fn idle_session() -> Session {
        let mut session = Session::new();
        session.change_state(SessionState::Authenticated);
        session.capabilities.replace(["IMAP4rev1", "IDLE"]);
        session
    }

    fn completed(events: Vec<ProtocolEvent>) -> Result<ResponseTree> {
        events
            .into_iter()
            .find_map(|event| match event {
                ProtocolEvent::Completed { result, .. } => Some(result),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_commands_wait_for_greeting() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = Protocol::new(Timings::default(), now);

        protocol.submit("CAPABILITY".into(), &[], now);
        assert!(drain(&mut protocol).is_empty());

        protocol.handle_frame(b"* OK [CAPABILITY IMAP4rev1 STARTTLS] hi\r\n", &mut session, now);
        assert!(session.capabilities.contains("starttls"));
        assert_eq!(drain(&mut protocol), vec!["A0000 CAPABILITY\r\n"]);
    }

    #[test]
    fn test_preauth_greeting_authenticates() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = Protocol::new(Timings::default(), now);
        protocol.handle_frame(b"* PREAUTH welcome\r\n", &mut session, now);
        assert_eq!(session.state, SessionState::Authenticated);
    }

    #[test]
    fn test_execution_is_serialized() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);

        let first = protocol.submit("NOOP".into(), &[], now);
        let second = protocol.submit("CAPABILITY".into(), &[], now);
        assert_eq!(drain(&mut protocol), vec!["A0000 NOOP\r\n"]);
        assert_eq!(protocol.pending(), 2);

        let events = protocol.handle_frame(b"A0000 OK done\r\n", &mut session, now);
        assert!(matches!(events[0], ProtocolEvent::Completed { id, .. } if id == first));
        assert_eq!(drain(&mut protocol), vec!["A0001 CAPABILITY\r\n"]);

        let events = protocol.handle_frame(b"* CAPABILITY IMAP4rev1 IDLE\r\n", &mut session, now);
        assert!(events.is_empty());
        let events = protocol.handle_frame(b"A0001 OK done\r\n", &mut session, now);
        assert!(matches!(events[0], ProtocolEvent::Completed { id, .. } if id == second));
        assert!(session.capabilities.contains("IDLE"));
    }

    #[test]
    fn test_payload_collects_accepted_types() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);

        protocol.submit(
            Command::new("UID FETCH")
                .arg(Attribute::sequence("1:*"))
                .arg(Attribute::atom("FLAGS")),
            &["FETCH"],
            now,
        );
        drain(&mut protocol);

        let events =
            protocol.handle_frame(b"* 1 FETCH (UID 10 FLAGS ())\r\n", &mut session, now);
        assert!(events.is_empty());
        let events = protocol.handle_frame(b"* 4 EXISTS\r\n", &mut session, now);
        assert!(matches!(
            events.as_slice(),
            [ProtocolEvent::Notify(Event::Update(Update::Exists(4)))]
        ));

        let tree = completed(protocol.handle_frame(b"A0000 OK fetched\r\n", &mut session, now))
            .unwrap();
        assert_eq!(tree.records("FETCH").len(), 1);
        assert!(tree.records("EXISTS").is_empty());
        assert_eq!(tree.response.human_readable.as_deref(), Some("fetched"));
    }

    #[test]
    fn test_own_type_is_dispatched_unless_expected() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);

        protocol.submit("EXPUNGE".into(), &[], now);
        drain(&mut protocol);

        let events = protocol.handle_frame(b"* 2 EXPUNGE\r\n", &mut session, now);
        assert!(matches!(
            events.as_slice(),
            [ProtocolEvent::Notify(Event::Update(Update::Expunge(2)))]
        ));
        let tree = completed(protocol.handle_frame(b"A0000 OK expunged\r\n", &mut session, now))
            .unwrap();
        assert!(tree.records("EXPUNGE").is_empty());
    }

    #[test]
    fn test_rejection_carries_code() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);

        protocol.submit(Command::new("CREATE").arg(Attribute::string("a")), &[], now);
        let result = completed(protocol.handle_frame(
            b"A0000 NO [ALREADYEXISTS] Mailbox exists\r\n",
            &mut session,
            now,
        ));
        let error = result.unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::AlreadyExists);
        assert!(matches!(
            error,
            Error::CommandRejected { ref status, ref text, .. } if status == "NO" && text == "Mailbox exists"
        ));
    }

    #[test]
    fn test_literal_waits_for_continuation() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);

        protocol.submit(
            Command::new("APPEND")
                .arg(Attribute::string("INBOX"))
                .arg(Attribute::Literal(b"hello".to_vec())),
            &[],
            now,
        );
        assert_eq!(drain(&mut protocol), vec!["A0000 APPEND \"INBOX\" {5}\r\n"]);
        protocol.handle_frame(b"+ go ahead\r\n", &mut session, now);
        assert_eq!(drain(&mut protocol), vec!["hello\r\n"]);
    }

    #[test]
    fn test_sasl_challenge_gets_empty_reply() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);

        protocol.submit(
            Command::new("AUTHENTICATE")
                .arg(Attribute::atom("XOAUTH2"))
                .arg(Attribute::atom("dG9rZW4=").sensitive()),
            &[],
            now,
        );
        drain(&mut protocol);
        protocol.handle_frame(b"+ eyJzdGF0dXMiOiI0MDAifQ==\r\n", &mut session, now);
        assert_eq!(drain(&mut protocol), vec!["\r\n"]);
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);
        protocol.submit("NOOP".into(), &[], now);
        assert!(protocol.handle_frame(b"Z9999 OK what\r\n", &mut session, now).is_empty());
        assert_eq!(protocol.pending(), 1);
    }

    #[test]
    fn test_starttls_upgrade_precedes_completion() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);
        protocol.submit("STARTTLS".into(), &[], now);
        let events = protocol.handle_frame(b"A0000 OK begin TLS\r\n", &mut session, now);
        assert!(matches!(
            events.as_slice(),
            [
                ProtocolEvent::Upgrade(UpgradeAction::StartTls),
                ProtocolEvent::Completed { result: Ok(_), .. }
            ]
        ));
    }

    #[test]
    fn test_idle_cycle() {
        let start = Instant::now();
        let mut session = idle_session();
        let mut protocol = greeted(&mut session, start);

        assert_eq!(protocol.poll_timeout(), Some(start + SECOND));
        protocol.handle_timeout(start + SECOND, &session);
        assert_eq!(drain(&mut protocol), vec!["A0000 IDLE\r\n"]);

        let entered = start + SECOND;
        protocol.handle_frame(b"+ idling\r\n", &mut session, entered);
        assert!(protocol.is_idle());
        assert_eq!(protocol.poll_timeout(), Some(entered + Duration::from_secs(60)));

        protocol.handle_timeout(entered + Duration::from_secs(60), &session);
        assert_eq!(drain(&mut protocol), vec!["DONE\r\n"]);
        assert!(!protocol.is_idle());

        let done = entered + Duration::from_secs(60);
        protocol.handle_frame(b"A0000 OK IDLE terminated\r\n", &mut session, done);
        assert_eq!(protocol.poll_timeout(), Some(done + SECOND));
    }

    #[test]
    fn test_command_breaks_idle() {
        let now = Instant::now();
        let mut session = idle_session();
        let mut protocol = greeted(&mut session, now);
        protocol.enter_idle(now, &session);
        protocol.handle_frame(b"+ idling\r\n", &mut session, now);
        drain(&mut protocol);

        protocol.submit("NOOP".into(), &[], now);
        assert_eq!(drain(&mut protocol), vec!["DONE\r\n"]);

        let events = protocol.handle_frame(b"* 3 EXISTS\r\n", &mut session, now);
        assert_eq!(events.len(), 1);
        protocol.handle_frame(b"A0000 OK IDLE done\r\n", &mut session, now);
        assert_eq!(drain(&mut protocol), vec!["A0001 NOOP\r\n"]);
    }

    #[test]
    fn test_break_before_continuation() {
        let now = Instant::now();
        let mut session = idle_session();
        let mut protocol = greeted(&mut session, now);
        protocol.enter_idle(now, &session);
        drain(&mut protocol);

        protocol.submit("NOOP".into(), &[], now);
        assert!(drain(&mut protocol).is_empty());
        protocol.handle_frame(b"+ idling\r\n", &mut session, now);
        assert_eq!(drain(&mut protocol), vec!["DONE\r\n"]);
    }

    #[test]
    fn test_break_idle_only_when_entered() {
        let now = Instant::now();
        let mut session = idle_session();
        let mut protocol = greeted(&mut session, now);

        protocol.break_idle(now);
        assert!(drain(&mut protocol).is_empty());

        protocol.enter_idle(now, &session);
        drain(&mut protocol);
        protocol.break_idle(now);
        assert!(drain(&mut protocol).is_empty());

        protocol.handle_frame(b"+ idling\r\n", &mut session, now);
        protocol.break_idle(now);
        assert_eq!(drain(&mut protocol), vec!["DONE\r\n"]);
    }

    #[test]
    fn test_noop_without_idle_capability() {
        let start = Instant::now();
        let mut session = idle_session();
        session.capabilities.replace(["IMAP4rev1"]);
        let mut protocol = greeted(&mut session, start);

        protocol.handle_timeout(start + SECOND, &session);
        assert!(drain(&mut protocol).is_empty());
        let noop_at = start + SECOND + Duration::from_secs(60);
        assert_eq!(protocol.poll_timeout(), Some(noop_at));

        protocol.handle_timeout(noop_at, &session);
        assert_eq!(drain(&mut protocol), vec!["A0000 NOOP\r\n"]);
    }

    #[test]
    fn test_idle_needs_authentication() {
        let start = Instant::now();
        let mut session = Session::new();
        session.capabilities.replace(["IDLE"]);
        let mut protocol = greeted(&mut session, start);
        protocol.handle_timeout(start + SECOND, &session);
        assert!(drain(&mut protocol).is_empty());
        assert_eq!(protocol.poll_timeout(), None);
    }

    #[test]
    fn test_greeting_timeout() {
        let start = Instant::now();
        let session = Session::new();
        let mut protocol = Protocol::new(Timings::default(), start);
        assert_eq!(protocol.poll_timeout(), Some(start + Duration::from_secs(90)));
        let events = protocol.handle_timeout(start + Duration::from_secs(90), &session);
        assert!(matches!(
            events.as_slice(),
            [ProtocolEvent::Timeout(d)] if *d == Duration::from_secs(90)
        ));
    }

    #[test]
    fn test_response_timeout_resets_on_traffic() {
        let start = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, start);
        protocol.submit(Command::new("SEARCH").arg(Attribute::atom("ALL")), &[], start);

        let later = start + Duration::from_secs(30);
        protocol.handle_frame(b"* SEARCH 1 2\r\n", &mut session, later);
        assert_eq!(protocol.poll_timeout(), Some(later + Duration::from_secs(60)));
        assert!(protocol.handle_timeout(start + Duration::from_secs(60), &session).is_empty());

        let events = protocol.handle_timeout(later + Duration::from_secs(60), &session);
        assert!(matches!(events.as_slice(), [ProtocolEvent::Timeout(_)]));
    }

    #[test]
    fn test_close_returns_outstanding_requests() {
        let now = Instant::now();
        let mut session = Session::new();
        let mut protocol = greeted(&mut session, now);
        let a = protocol.submit("NOOP".into(), &[], now);
        let b = protocol.submit("NOOP".into(), &[], now);
        assert_eq!(protocol.close(), vec![a, b]);
        assert_eq!(protocol.pending(), 0);
        assert_eq!(protocol.poll_timeout(), None);
    }
}
