//! SEARCH result.

use crate::syntax::ResponseTree;

/// Collects the numbers of every SEARCH record, sorted ascending.
#[must_use]
pub fn parse_search(tree: &ResponseTree) -> Vec<u32> {
    let mut numbers: Vec<u32> = tree
        .records("SEARCH")
        .iter()
        .flat_map(|record| &record.attributes)
        .filter_map(|attribute| attribute.as_number())
        .filter_map(|n| u32::try_from(n).ok())
        .collect();
    numbers.sort_unstable();
    numbers
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::parser::test_support::tree;

    #[test]
    fn test_merges_and_sorts() {
        let parsed = parse_search(&tree(
            &["* SEARCH 5 7\r\n", "* SEARCH 6\r\n"],
            "A1 OK done\r\n",
        ));
        assert_eq!(parsed, vec![5, 6, 7]);
    }

    #[test]
    fn test_empty() {
        assert!(parse_search(&tree(&["* SEARCH\r\n"], "A1 OK done\r\n")).is_empty());
        assert!(parse_search(&tree(&[], "A1 OK done\r\n")).is_empty());
    }
}
