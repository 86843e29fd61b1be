//! Command builders.
//!
//! Pure functions that turn request parameters into [`Command`] trees.

mod fetch;
mod search;
mod store;
mod tag_generator;

pub use fetch::{FetchOptions, build_fetch};
pub use search::{ExtensionValue, SearchKey, SearchOptions, build_search};
pub use store::{StoreAction, StoreOptions, build_store};
pub use tag_generator::TagGenerator;

use crate::syntax::{Attribute, Command};

/// Flags and keywords go out as atoms; anything that would not lex as one
/// (spaces, specials, 8-bit) is sent as a string.
pub(crate) fn flag_attribute(value: &str) -> Attribute {
    let body = value.strip_prefix('\\').unwrap_or(value);
    let atom_safe = !body.is_empty()
        && body.bytes().all(|b| {
            b.is_ascii_graphic() && !matches!(b, b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\' | b']')
        });
    if atom_safe {
        Attribute::atom(value)
    } else {
        Attribute::string(value)
    }
}

/// `LIST`/`LSUB` with an empty reference and the `*` wildcard.
pub(crate) fn list_all(name: &str) -> Command {
    Command::new(name)
        .arg(Attribute::string(""))
        .arg(Attribute::string("*"))
}
