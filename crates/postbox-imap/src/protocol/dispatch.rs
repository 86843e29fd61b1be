//! Routing of untagged responses no command asked for.

use tracing::{trace, warn};

use crate::handler::{Event, Update};
use crate::parser::parse_fetch_record;
use crate::syntax::Response;
use crate::types::Session;

/// Untagged response types with a dedicated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntaggedKind {
    /// Status line; its response code may carry capabilities or an alert.
    Ok,
    /// Replaces the capability set.
    Capability,
    /// New message count.
    Exists,
    /// A message was removed.
    Expunge,
    /// Unsolicited flag or data change.
    Fetch,
    /// The server is closing the connection.
    Bye,
    /// Logged and dropped.
    Other,
}

impl UntaggedKind {
    /// Classifies an untagged response by its type.
    #[must_use]
    pub fn of(response: &Response) -> Self {
        match response.command.as_str() {
            "OK" => Self::Ok,
            "CAPABILITY" => Self::Capability,
            "EXISTS" => Self::Exists,
            "EXPUNGE" => Self::Expunge,
            "FETCH" => Self::Fetch,
            "BYE" => Self::Bye,
            _ => Self::Other,
        }
    }
}

/// Applies an unsolicited response to the session, returning the event to
/// report, if any.
pub fn dispatch(response: &Response, session: &mut Session) -> Option<Event> {
    match UntaggedKind::of(response) {
        UntaggedKind::Ok => {
            match response.code.as_deref() {
                Some("CAPABILITY") => session
                    .capabilities
                    .replace_from_attributes(&response.code_args),
                Some("ALERT") => warn!(
                    text = response.human_readable.as_deref().unwrap_or_default(),
                    "server alert"
                ),
                _ => trace!(text = ?response.human_readable, "untagged OK"),
            }
            None
        }
        UntaggedKind::Capability => {
            session
                .capabilities
                .replace_from_attributes(&response.attributes);
            None
        }
        UntaggedKind::Exists => response.nr.map(|nr| Event::Update(Update::Exists(nr))),
        UntaggedKind::Expunge => response.nr.map(|nr| Event::Update(Update::Expunge(nr))),
        UntaggedKind::Fetch => {
            parse_fetch_record(response).map(|record| Event::Update(Update::Fetch(record)))
        }
        UntaggedKind::Bye => {
            warn!(text = ?response.human_readable, "server said BYE");
            None
        }
        UntaggedKind::Other => {
            trace!(kind = %response.command, "ignoring untagged response");
            None
        }
    }
}
