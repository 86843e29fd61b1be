//! Mailbox tree and special-use detection.

mod special_use;
mod tree;

pub use special_use::{SPECIAL_USE_FLAGS, SpecialUseTable};
pub use tree::{MailboxNode, apply_list_records, ensure_path};
