//! Decoders from generic response trees to typed results.
//!
//! All parsers are total: missing or oddly shaped records give empty or
//! default fields, never an error.

mod bodystructure;
mod envelope;
mod fetch;
mod id;
mod namespace;
mod search;
mod select;

pub use bodystructure::{BodyNode, parse_bodystructure};
pub use envelope::{Address, Envelope, parse_envelope};
pub use fetch::{FetchRecord, FetchValue, parse_fetch, parse_fetch_record};
pub use id::parse_id;
pub use namespace::{Namespace, Namespaces, parse_namespace};
pub use search::parse_search;
pub use select::{MailboxInfo, parse_select};

use crate::syntax::Attribute;

/// Text values of a flat list, skipping non-text entries.
pub(crate) fn text_list(attribute: &Attribute) -> Vec<String> {
    attribute
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(Attribute::to_text)
        .collect()
}
