//! IDLE cycle bookkeeping.
//!
//! Once the command queue drains, the session waits `enter_idle_delay` and
//! then either issues IDLE (RFC 2177) or, without the capability, falls back
//! to a NOOP every `noop_interval`. An IDLE is ended with `DONE` after
//! `idle_timeout`, or as soon as another command is queued.

use tokio::time::Instant;

/// Terminates an IDLE command.
pub const DONE: &[u8] = b"DONE\r\n";

/// Timer armed while nothing is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleTimer {
    /// No timer.
    #[default]
    Off,
    /// Start the idle cycle at this instant.
    EnterAt(Instant),
    /// Send a keepalive NOOP at this instant.
    NoopAt(Instant),
}

impl IdleTimer {
    /// When the timer fires.
    pub fn deadline(self) -> Option<Instant> {
        match self {
            Self::Off => None,
            Self::EnterAt(at) | Self::NoopAt(at) => Some(at),
        }
    }
}

/// Progress of an IDLE command that is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStage {
    /// IDLE sent, waiting for the `+` continuation.
    Requested {
        /// A command was queued before the continuation arrived.
        break_pending: bool,
    },
    /// Continuation received.
    Entered {
        /// When `DONE` is sent if nothing else breaks the IDLE first.
        done_at: Instant,
    },
    /// `DONE` sent, waiting for the tagged completion.
    Done,
}

impl IdleStage {
    /// When `DONE` is due.
    pub fn deadline(self) -> Option<Instant> {
        match self {
            Self::Entered { done_at } => Some(done_at),
            Self::Requested { .. } | Self::Done => None,
        }
    }

    /// The server confirmed IDLE.
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered { .. })
    }
}
