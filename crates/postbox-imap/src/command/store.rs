//! STORE command builder.

use crate::syntax::{Attribute, Command};

/// What a STORE does with the given values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    /// Replace the flag list.
    SetFlags,
    /// Add to the flag list.
    AddFlags,
    /// Remove from the flag list.
    RemoveFlags,
    /// Gmail `X-GM-LABELS`.
    SetLabels,
    /// Add Gmail labels.
    AddLabels,
    /// Remove Gmail labels.
    RemoveLabels,
}

impl StoreAction {
    /// Wire keyword without the `.SILENT` suffix.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::SetFlags => "FLAGS",
            Self::AddFlags => "+FLAGS",
            Self::RemoveFlags => "-FLAGS",
            Self::SetLabels => "X-GM-LABELS",
            Self::AddLabels => "+X-GM-LABELS",
            Self::RemoveLabels => "-X-GM-LABELS",
        }
    }
}

/// Options for [`build_store`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// The sequence set holds UIDs.
    pub by_uid: bool,
    /// Ask the server not to echo the new values.
    pub silent: bool,
}

/// Builds a STORE command.
#[must_use]
pub fn build_store(
    sequence: &str,
    action: StoreAction,
    values: &[&str],
    options: &StoreOptions,
) -> Command {
    let name = if options.by_uid { "UID STORE" } else { "STORE" };
    let mut keyword = action.keyword().to_string();
    if options.silent {
        keyword.push_str(".SILENT");
    }

    Command::new(name)
        .arg(Attribute::sequence(sequence))
        .arg(Attribute::atom(keyword))
        .arg(Attribute::List(
            values.iter().map(|value| super::flag_attribute(value)).collect(),
        ))
}
