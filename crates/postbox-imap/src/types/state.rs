//! Session state shared by the driver and client handles.

use std::fmt;

use super::capability::CapabilitySet;

/// IMAP connection state (RFC 3501 section 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Before LOGIN/AUTHENTICATE, or after a plain `OK` greeting.
    #[default]
    NotAuthenticated,
    /// Logged in, no mailbox open.
    Authenticated,
    /// A mailbox is open.
    Selected,
    /// LOGOUT sent or connection gone. Terminal.
    Logout,
}

impl SessionState {
    /// Returns `true` when authenticated or selected.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::Selected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotAuthenticated => "not-authenticated",
            Self::Authenticated => "authenticated",
            Self::Selected => "selected",
            Self::Logout => "logout",
        };
        f.write_str(name)
    }
}

/// Mutable session record.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Current state.
    pub state: SessionState,
    /// Last advertised capabilities.
    pub capabilities: CapabilitySet,
    /// Path of the open mailbox; only set while `Selected`.
    pub selected_mailbox: Option<String>,
    /// Whether the transport is encrypted.
    pub secure: bool,
}

impl Session {
    /// A not-authenticated, insecure session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to `next`.
    ///
    /// Returns the previously selected mailbox when leaving `Selected` for a
    /// different state, and clears it. Re-entering `Selected` keeps the field
    /// so the caller can overwrite it.
    pub fn change_state(&mut self, next: SessionState) -> Option<String> {
        let previous = self.state;
        self.state = next;
        if previous == SessionState::Selected && next != SessionState::Selected {
            self.selected_mailbox.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let session = Session::new();
        assert_eq!(session.state, SessionState::NotAuthenticated);
        assert!(session.capabilities.is_empty());
        assert!(!session.secure);
    }

    #[test]
    fn test_leaving_selected_returns_mailbox() {
        let mut session = Session::new();
        session.change_state(SessionState::Authenticated);
        session.change_state(SessionState::Selected);
        session.selected_mailbox = Some("INBOX".into());

        let closed = session.change_state(SessionState::Authenticated);
        assert_eq!(closed.as_deref(), Some("INBOX"));
        assert_eq!(session.selected_mailbox, None);
    }

    #[test]
    fn test_reselect_keeps_mailbox() {
        let mut session = Session::new();
        session.change_state(SessionState::Selected);
        session.selected_mailbox = Some("INBOX".into());
        assert_eq!(session.change_state(SessionState::Selected), None);
        assert_eq!(session.selected_mailbox.as_deref(), Some("INBOX"));
    }

    #[test]
    fn test_logout_from_selected() {
        let mut session = Session::new();
        session.change_state(SessionState::Selected);
        session.selected_mailbox = Some("Drafts".into());
        assert_eq!(session.change_state(SessionState::Logout).as_deref(), Some("Drafts"));
    }

    #[test]
    fn test_is_authenticated() {
        assert!(!SessionState::NotAuthenticated.is_authenticated());
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(SessionState::Selected.is_authenticated());
        assert!(!SessionState::Logout.is_authenticated());
    }
}
