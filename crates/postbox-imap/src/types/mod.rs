//! Session-level types.

mod capability;
mod state;

pub use capability::CapabilitySet;
pub use state::{Session, SessionState};
