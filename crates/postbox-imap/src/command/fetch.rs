//! FETCH command builder.

use crate::syntax::{Attribute, Command, parse_attributes};
use crate::{Error, Result};

/// Options for [`build_fetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Send `UID FETCH` and treat the sequence as UIDs.
    pub by_uid: bool,
    /// CONDSTORE: only report messages changed since this mod-sequence.
    pub changed_since: Option<u64>,
}

/// Builds a FETCH command.
///
/// Each item is written the way it appears on the wire, in any case:
/// `uid`, `envelope`, `body.peek[header.fields (date subject)]<0.512>`,
/// `modseq (1234)`. Atoms are upper-cased. A single resulting attribute is
/// sent bare, anything more goes into a list.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if no items are given or an item does not
/// parse.
pub fn build_fetch(sequence: &str, items: &[&str], options: &FetchOptions) -> Result<Command> {
    let mut query = Vec::new();
    for item in items {
        let parsed = parse_attributes(item)
            .map_err(|e| Error::InvalidInput(format!("fetch item {item:?}: {e}")))?;
        query.extend(parsed.into_iter().map(upper_case_atoms));
    }

    let mut query = query.into_iter();
    let items = match (query.next(), query.len()) {
        (None, _) => return Err(Error::InvalidInput("no fetch items".into())),
        (Some(single), 0) => single,
        (Some(first), _) => Attribute::List(std::iter::once(first).chain(query).collect()),
    };

    let name = if options.by_uid { "UID FETCH" } else { "FETCH" };
    let mut command = Command::new(name)
        .arg(Attribute::sequence(sequence))
        .arg(items);
    if let Some(modseq) = options.changed_since {
        command = command.arg(Attribute::List(vec![
            Attribute::atom("CHANGEDSINCE"),
            Attribute::Number(modseq),
        ]));
    }

    Ok(command)
}

fn upper_case_atoms(attribute: Attribute) -> Attribute {
    match attribute {
        Attribute::Atom {
            value,
            section,
            partial,
        } => Attribute::Atom {
            value: value.to_ascii_uppercase(),
            section: section.map(|items| items.into_iter().map(upper_case_atoms).collect()),
            partial,
        },
        Attribute::List(items) => {
            Attribute::List(items.into_iter().map(upper_case_atoms).collect())
        }
        other => other,
    }
}
