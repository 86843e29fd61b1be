//! SEARCH command builder.

use chrono::NaiveDate;

use crate::codec::format_imap_date;
use crate::syntax::{Attribute, Command};

/// One SEARCH criterion. Keys are written in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    /// Key without argument: `ALL`, `SEEN`, `UNSEEN`, `DELETED`, ...
    Is(String),
    /// String-valued key: `BODY`, `TEXT`, `SUBJECT`, `FROM`, `KEYWORD`, ...
    Text(String, String),
    /// `HEADER <field> <value>`.
    Header(String, String),
    /// Date-valued key: `SINCE`, `BEFORE`, `ON`, `SENTBEFORE`, ...
    Date(String, NaiveDate),
    /// `UID <sequence set>`.
    Uid(String),
    /// `LARGER` or `SMALLER`.
    Size(String, u64),
    /// Server extension such as `X-GM-MSGID`, `X-GM-THRID` or `X-GM-RAW`.
    Extension(String, ExtensionValue),
    /// Either key matches.
    Or(Box<SearchKey>, Box<SearchKey>),
    /// The key does not match.
    Not(Box<SearchKey>),
    /// Parenthesized conjunction.
    Group(Vec<SearchKey>),
}

/// Typed argument of an extension key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionValue {
    /// Written as a bare number.
    Number(u64),
    /// Written as an astring.
    Text(String),
}

impl SearchKey {
    /// Shorthand for [`SearchKey::Is`].
    pub fn is(flag: &str) -> Self {
        Self::Is(flag.to_string())
    }

    /// Shorthand for [`SearchKey::Or`].
    pub fn or(left: Self, right: Self) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Shorthand for [`SearchKey::Not`].
    pub fn not(key: Self) -> Self {
        Self::Not(Box::new(key))
    }
}

/// Options for [`build_search`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Send `UID SEARCH` so results are UIDs.
    pub by_uid: bool,
}

/// Builds a SEARCH command.
///
/// If any text value is non-ASCII the command gets a single
/// `CHARSET UTF-8` prefix and each such value is sent as a UTF-8 literal.
#[must_use]
pub fn build_search(keys: &[SearchKey], options: &SearchOptions) -> Command {
    let name = if options.by_uid { "UID SEARCH" } else { "SEARCH" };
    let mut command = Command::new(name);

    if keys.iter().any(has_non_ascii) {
        command = command
            .arg(Attribute::atom("CHARSET"))
            .arg(Attribute::atom("UTF-8"));
    }
    for key in keys {
        write_key(&mut command.attributes, key);
    }

    command
}

fn write_key(out: &mut Vec<Attribute>, key: &SearchKey) {
    match key {
        SearchKey::Is(flag) => out.push(Attribute::atom(flag.to_ascii_uppercase())),
        SearchKey::Text(name, value) => {
            out.push(Attribute::atom(name.to_ascii_uppercase()));
            out.push(text_value(value));
        }
        SearchKey::Header(field, value) => {
            out.push(Attribute::atom("HEADER"));
            out.push(text_value(field));
            out.push(text_value(value));
        }
        SearchKey::Date(name, date) => {
            out.push(Attribute::atom(name.to_ascii_uppercase()));
            out.push(Attribute::atom(format_imap_date(*date)));
        }
        SearchKey::Uid(set) => {
            out.push(Attribute::atom("UID"));
            out.push(Attribute::sequence(set.as_str()));
        }
        SearchKey::Size(name, size) => {
            out.push(Attribute::atom(name.to_ascii_uppercase()));
            out.push(Attribute::Number(*size));
        }
        SearchKey::Extension(name, value) => {
            out.push(Attribute::atom(name.to_ascii_uppercase()));
            out.push(match value {
                ExtensionValue::Number(n) => Attribute::Number(*n),
                ExtensionValue::Text(text) => text_value(text),
            });
        }
        SearchKey::Or(left, right) => {
            out.push(Attribute::atom("OR"));
            write_key(out, left);
            write_key(out, right);
        }
        SearchKey::Not(inner) => {
            out.push(Attribute::atom("NOT"));
            write_key(out, inner);
        }
        SearchKey::Group(keys) => {
            let mut items = Vec::new();
            for key in keys {
                write_key(&mut items, key);
            }
            out.push(Attribute::List(items));
        }
    }
}

fn text_value(value: &str) -> Attribute {
    if value.is_ascii() {
        Attribute::string(value)
    } else {
        Attribute::Literal(value.as_bytes().to_vec())
    }
}

fn has_non_ascii(key: &SearchKey) -> bool {
    match key {
        SearchKey::Text(_, value) | SearchKey::Extension(_, ExtensionValue::Text(value)) => {
            !value.is_ascii()
        }
        SearchKey::Header(field, value) => !field.is_ascii() || !value.is_ascii(),
        SearchKey::Or(left, right) => has_non_ascii(left) || has_non_ascii(right),
        SearchKey::Not(inner) => has_non_ascii(inner),
        SearchKey::Group(keys) => keys.iter().any(has_non_ascii),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_search() {
        let keys = vec![
            SearchKey::is("unseen"),
            SearchKey::Header("subject".into(), "hello world".into()),
            SearchKey::or(SearchKey::is("unseen"), SearchKey::is("seen")),
            SearchKey::not(SearchKey::is("seen")),
            SearchKey::Date("sentbefore".into(), NaiveDate::from_ymd_opt(2011, 2, 3).unwrap()),
            SearchKey::Date("since".into(), NaiveDate::from_ymd_opt(2011, 12, 23).unwrap()),
            SearchKey::Uid("1:*".into()),
            SearchKey::Extension(
                "X-GM-MSGID".into(),
                ExtensionValue::Number(1499257647490662970),
            ),
            SearchKey::Extension(
                "X-GM-THRID".into(),
                ExtensionValue::Number(1499257647490662971),
            ),
        ];
        let command = build_search(&keys, &SearchOptions::default());

        assert_eq!(command.name, "SEARCH");
        assert_eq!(
            command.attributes,
            vec![
                Attribute::atom("UNSEEN"),
                Attribute::atom("HEADER"),
                Attribute::string("subject"),
                Attribute::string("hello world"),
                Attribute::atom("OR"),
                Attribute::atom("UNSEEN"),
                Attribute::atom("SEEN"),
                Attribute::atom("NOT"),
                Attribute::atom("SEEN"),
                Attribute::atom("SENTBEFORE"),
                Attribute::atom("3-Feb-2011"),
                Attribute::atom("SINCE"),
                Attribute::atom("23-Dec-2011"),
                Attribute::atom("UID"),
                Attribute::sequence("1:*"),
                Attribute::atom("X-GM-MSGID"),
                Attribute::Number(1499257647490662970),
                Attribute::atom("X-GM-THRID"),
                Attribute::Number(1499257647490662971),
            ]
        );
    }

    #[test]
    fn test_unicode_search() {
        let keys = vec![SearchKey::Text("body".into(), "jõgeva".into())];
        let command = build_search(&keys, &SearchOptions::default());
        assert_eq!(
            command.attributes,
            vec![
                Attribute::atom("CHARSET"),
                Attribute::atom("UTF-8"),
                Attribute::atom("BODY"),
                Attribute::Literal("jõgeva".as_bytes().to_vec()),
            ]
        );
    }

    #[test]
    fn test_charset_is_call_wide() {
        let keys = vec![
            SearchKey::Text("from".into(), "bob".into()),
            SearchKey::not(SearchKey::Text("subject".into(), "ärger".into())),
        ];
        let command = build_search(&keys, &SearchOptions { by_uid: true });
        assert_eq!(command.name, "UID SEARCH");
        assert_eq!(command.attributes[0], Attribute::atom("CHARSET"));
        // ASCII values stay quoted strings
        assert_eq!(command.attributes[3], Attribute::string("bob"));
        assert_eq!(
            command.attributes[6],
            Attribute::Literal("ärger".as_bytes().to_vec())
        );
    }

    #[test]
    fn test_group_and_size() {
        let keys = vec![SearchKey::Group(vec![
            SearchKey::Size("larger".into(), 1024),
            SearchKey::is("flagged"),
        ])];
        let command = build_search(&keys, &SearchOptions::default());
        assert_eq!(
            command.attributes,
            vec![Attribute::List(vec![
                Attribute::atom("LARGER"),
                Attribute::Number(1024),
                Attribute::atom("FLAGGED"),
            ])]
        );
    }
}
