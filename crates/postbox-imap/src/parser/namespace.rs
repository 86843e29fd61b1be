//! NAMESPACE result (RFC 2342).

use crate::syntax::{Attribute, ResponseTree};

/// One namespace: a prefix and its hierarchy delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Mailbox name prefix, possibly empty.
    pub prefix: String,
    /// `None` when the server sent `NIL` (flat namespace).
    pub delimiter: Option<String>,
}

/// The three namespace groups. `None` means the server has none of that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    /// The user's own mailboxes.
    pub personal: Option<Vec<Namespace>>,
    /// Other users' mailboxes.
    pub users: Option<Vec<Namespace>>,
    /// Shared mailboxes.
    pub shared: Option<Vec<Namespace>>,
}

/// Decodes a NAMESPACE completion, or `None` if it carried no NAMESPACE record.
#[must_use]
pub fn parse_namespace(tree: &ResponseTree) -> Option<Namespaces> {
    let record = tree.records("NAMESPACE").first()?;
    let group = |index: usize| record.attributes.get(index).and_then(parse_group);

    Some(Namespaces {
        personal: group(0),
        users: group(1),
        shared: group(2),
    })
}

fn parse_group(attribute: &Attribute) -> Option<Vec<Namespace>> {
    let entries = attribute.as_list()?;
    let namespaces: Vec<Namespace> = entries
        .iter()
        .filter_map(Attribute::as_list)
        .map(|pair| Namespace {
            prefix: pair.first().and_then(Attribute::to_text).unwrap_or_default(),
            delimiter: pair.get(1).and_then(Attribute::to_text),
        })
        .collect();

    (!namespaces.is_empty()).then_some(namespaces)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::parser::test_support::tree;

    fn ns(prefix: &str, delimiter: Option<&str>) -> Namespace {
        Namespace {
            prefix: prefix.into(),
            delimiter: delimiter.map(Into::into),
        }
    }

    #[test]
    fn test_no_namespace_record() {
        assert_eq!(parse_namespace(&tree(&[], "A1 OK done\r\n")), None);
    }

    #[test]
    fn test_single_personal() {
        let parsed = parse_namespace(&tree(
            &["* NAMESPACE ((\"INBOX.\" \".\")) NIL NIL\r\n"],
            "A1 OK done\r\n",
        ))
        .unwrap();
        assert_eq!(
            parsed,
            Namespaces {
                personal: Some(vec![ns("INBOX.", Some("."))]),
                users: None,
                shared: None,
            }
        );
    }

    #[test]
    fn test_all_groups() {
        let parsed = parse_namespace(&tree(
            &[concat!(
                "* NAMESPACE ((\"\" \"/\")) ((\"~\" \"/\")) ",
                "((\"#shared/\" \"/\") (\"#public/\" \"/\"))\r\n"
            )],
            "A1 OK done\r\n",
        ))
        .unwrap();
        assert_eq!(parsed.personal, Some(vec![ns("", Some("/"))]));
        assert_eq!(parsed.users, Some(vec![ns("~", Some("/"))]));
        assert_eq!(
            parsed.shared,
            Some(vec![ns("#shared/", Some("/")), ns("#public/", Some("/"))])
        );
    }

    #[test]
    fn test_nil_delimiter() {
        let parsed = parse_namespace(&tree(
            &["* NAMESPACE ((\"\" NIL)) NIL NIL\r\n"],
            "A1 OK done\r\n",
        ))
        .unwrap();
        assert_eq!(parsed.personal, Some(vec![ns("", None)]));
        assert_eq!(parsed.users, None);
        assert_eq!(parsed.shared, None);
    }
}
