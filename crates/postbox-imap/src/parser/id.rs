//! ID result (RFC 2971).

use std::collections::BTreeMap;

use crate::syntax::ResponseTree;

/// Decodes the server's ID field/value list. `NIL` gives an empty map.
#[must_use]
pub fn parse_id(tree: &ResponseTree) -> BTreeMap<String, String> {
    let mut id = BTreeMap::new();

    let Some(list) = tree
        .records("ID")
        .first()
        .and_then(|record| record.attributes.first())
        .and_then(|attribute| attribute.as_list())
    else {
        return id;
    };

    for pair in list.chunks_exact(2) {
        if let (Some(key), Some(value)) = (pair[0].to_text(), pair[1].to_text()) {
            id.insert(key, value);
        }
    }

    id
}
