//! Command and response trees.
//!
//! These are the shapes exchanged with the syntax layer: commands are built as
//! a name plus attributes and serialized by [`super::serialize_command`];
//! server lines are parsed into [`Response`] records by
//! [`super::parse_response`].

use std::collections::BTreeMap;

/// A `<start.length>` byte range on a body section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partial {
    /// First byte offset.
    pub start: u64,
    /// Byte count; `None` means to the end.
    pub length: Option<u64>,
}

/// A node of a command or response tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Bare word, optionally with a `[section]` and a `<partial>`.
    Atom {
        /// The word itself.
        value: String,
        /// Contents of `[...]` directly after the word.
        section: Option<Vec<Attribute>>,
        /// Trailing `<start.length>`.
        partial: Option<Partial>,
    },
    /// Quoted string.
    String(String),
    /// Non-negative number.
    Number(u64),
    /// Sequence set such as `1:*` or `4,7:9`, written verbatim.
    Sequence(String),
    /// Raw bytes sent or received as `{n}`.
    Literal(Vec<u8>),
    /// Parenthesized list.
    List(Vec<Attribute>),
    /// `NIL`.
    Nil,
    /// Sent like the wrapped value but never written to logs.
    Sensitive(Box<Attribute>),
}

impl Attribute {
    /// Plain atom without section or partial.
    pub fn atom(value: impl Into<String>) -> Self {
        Self::Atom {
            value: value.into(),
            section: None,
            partial: None,
        }
    }

    /// Text that is sent quoted, or as a literal when it must be.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Sequence set written verbatim.
    pub fn sequence(value: impl Into<String>) -> Self {
        Self::Sequence(value.into())
    }

    /// Wraps `self` so it is redacted in logs.
    #[must_use]
    pub fn sensitive(self) -> Self {
        Self::Sensitive(Box::new(self))
    }

    /// Strips any [`Attribute::Sensitive`] wrapper.
    #[must_use]
    pub fn unwrapped(&self) -> &Self {
        match self {
            Self::Sensitive(inner) => inner.unwrapped(),
            other => other,
        }
    }

    /// Text of an atom, string or UTF-8 literal.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.unwrapped() {
            Self::Atom { value, .. } | Self::String(value) | Self::Sequence(value) => {
                Some(value.as_str())
            }
            Self::Literal(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Numeric value of a number, or of an atom or string holding digits.
    #[must_use]
    pub fn as_number(&self) -> Option<u64> {
        match self.unwrapped() {
            Self::Number(n) => Some(*n),
            other => other.as_text().and_then(|s| s.parse().ok()),
        }
    }

    /// Text of any scalar, numbers included.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self.unwrapped() {
            Self::Number(n) => Some(n.to_string()),
            other => other.as_text().map(str::to_string),
        }
    }

    /// List items, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self.unwrapped() {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this is `NIL`.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self.unwrapped(), Self::Nil)
    }
}

/// A command tree: `name` followed by its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, possibly two words (`UID FETCH`).
    pub name: String,
    /// Arguments in wire order.
    pub attributes: Vec<Attribute>,
}

impl Command {
    /// Command with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    #[must_use]
    pub fn arg(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Command name without a `UID ` prefix, upper-cased.
    #[must_use]
    pub fn base_name(&self) -> String {
        let upper = self.name.to_ascii_uppercase();
        match upper.strip_prefix("UID ") {
            Some(rest) => rest.trim().to_string(),
            None => upper,
        }
    }
}

impl From<&str> for Command {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Command {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// One parsed server line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// `*`, `+` or the tag of the command being completed.
    pub tag: String,
    /// Numeric prefix of lines such as `* 12 EXISTS`.
    pub nr: Option<u32>,
    /// Upper-cased response type or status (`OK`, `FETCH`, `LIST`, ...).
    pub command: String,
    /// Upper-cased response code from `[CODE args]`.
    pub code: Option<String>,
    /// Arguments of the response code.
    pub code_args: Vec<Attribute>,
    /// Free text after a status or continuation.
    pub human_readable: Option<String>,
    /// Data after the response type.
    pub attributes: Vec<Attribute>,
}

impl Response {
    /// Whether the tag is `*`.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        self.tag == "*"
    }

    /// A `+` continuation request.
    #[must_use]
    pub fn is_continuation(&self) -> bool {
        self.tag == "+"
    }

    /// True for `OK`, `NO`, `BAD`, `BYE` and `PREAUTH` lines.
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(
            self.command.as_str(),
            "OK" | "NO" | "BAD" | "BYE" | "PREAUTH"
        )
    }
}

/// A tagged completion with the untagged records its command accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTree {
    /// The tagged status line.
    pub response: Response,
    /// Accepted untagged records keyed by upper-cased type, in arrival order.
    pub payload: BTreeMap<String, Vec<Response>>,
}

impl ResponseTree {
    /// Untagged records of `kind`, or an empty slice.
    #[must_use]
    pub fn records(&self, kind: &str) -> &[Response] {
        self.payload.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn push(&mut self, response: Response) {
        self.payload
            .entry(response.command.clone())
            .or_default()
            .push(response);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(Command::new("UID FETCH").base_name(), "FETCH");
        assert_eq!(Command::new("uid move").base_name(), "MOVE");
        assert_eq!(Command::new("select").base_name(), "SELECT");
    }

    #[test]
    fn test_attribute_accessors() {
        assert_eq!(Attribute::atom("123").as_number(), Some(123));
        assert_eq!(Attribute::Number(7).to_text().as_deref(), Some("7"));
        assert_eq!(
            Attribute::string("secret").sensitive().as_text(),
            Some("secret")
        );
        assert!(Attribute::Nil.is_nil());
        assert!(Attribute::Literal(vec![0xff]).as_text().is_none());
    }

    #[test]
    fn test_records_missing_kind() {
        let tree = ResponseTree::default();
        assert!(tree.records("FETCH").is_empty());
    }
}
