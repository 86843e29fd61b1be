//! Command serialization.

use std::fmt;

use super::tree::{Attribute, Command};

/// Serializes a tagged command into wire chunks.
///
/// Every chunk but the last ends with a synchronizing literal header
/// (`{n}\r\n`); the next chunk may only be sent after the server's `+`
/// continuation. The last chunk ends with CRLF.
#[must_use]
pub fn serialize_command(tag: &str, command: &Command) -> Vec<Vec<u8>> {
    let mut writer = Writer::new(false);
    writer.command(tag, command);
    writer.finish()
}

/// Log-safe rendering of a tagged command: sensitive values and literal
/// contents are hidden.
pub struct Redacted<'a> {
    /// Command tag.
    pub tag: &'a str,
    /// Command to render.
    pub command: &'a Command,
}

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut writer = Writer::new(true);
        writer.command(self.tag, self.command);
        let text: Vec<u8> = writer.finish().concat();
        f.write_str(String::from_utf8_lossy(&text).trim_end())
    }
}

struct Writer {
    chunks: Vec<Vec<u8>>,
    current: Vec<u8>,
    redact: bool,
}

impl Writer {
    const fn new(redact: bool) -> Self {
        Self {
            chunks: Vec::new(),
            current: Vec::new(),
            redact,
        }
    }

    fn command(&mut self, tag: &str, command: &Command) {
        self.current.extend_from_slice(tag.as_bytes());
        self.current.push(b' ');
        self.current.extend_from_slice(command.name.as_bytes());
        for attribute in &command.attributes {
            self.current.push(b' ');
            self.attribute(attribute);
        }
        self.current.extend_from_slice(b"\r\n");
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.chunks.push(self.current);
        self.chunks
    }

    fn attribute(&mut self, attribute: &Attribute) {
        match attribute {
            Attribute::Atom {
                value,
                section,
                partial,
            } => {
                self.current.extend_from_slice(value.as_bytes());
                if let Some(section) = section {
                    self.current.push(b'[');
                    self.joined(section);
                    self.current.push(b']');
                }
                if let Some(partial) = partial {
                    let text = match partial.length {
                        Some(length) => format!("<{}.{length}>", partial.start),
                        None => format!("<{}>", partial.start),
                    };
                    self.current.extend_from_slice(text.as_bytes());
                }
            }
            Attribute::String(value) => {
                if needs_literal(value) {
                    self.literal(value.as_bytes());
                } else {
                    self.quoted(value);
                }
            }
            Attribute::Number(n) => self.current.extend_from_slice(n.to_string().as_bytes()),
            Attribute::Sequence(set) => self.current.extend_from_slice(set.as_bytes()),
            Attribute::Literal(bytes) => self.literal(bytes),
            Attribute::List(items) => {
                self.current.push(b'(');
                self.joined(items);
                self.current.push(b')');
            }
            Attribute::Nil => self.current.extend_from_slice(b"NIL"),
            Attribute::Sensitive(inner) => {
                if self.redact {
                    self.current.extend_from_slice(b"[redacted]");
                } else {
                    self.attribute(inner);
                }
            }
        }
    }

    fn joined(&mut self, items: &[Attribute]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.current.push(b' ');
            }
            self.attribute(item);
        }
    }

    fn quoted(&mut self, value: &str) {
        self.current.push(b'"');
        for b in value.bytes() {
            if b == b'"' || b == b'\\' {
                self.current.push(b'\\');
            }
            self.current.push(b);
        }
        self.current.push(b'"');
    }

    fn literal(&mut self, bytes: &[u8]) {
        if self.redact {
            self.current
                .extend_from_slice(format!("{{{}}}", bytes.len()).as_bytes());
            return;
        }
        self.current
            .extend_from_slice(format!("{{{}}}\r\n", bytes.len()).as_bytes());
        self.chunks.push(std::mem::take(&mut self.current));
        self.current.extend_from_slice(bytes);
    }
}

/// Strings that cannot be sent quoted.
fn needs_literal(value: &str) -> bool {
    value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0 || !b.is_ascii())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::syntax::Partial;

    #[test]
    fn test_simple_command() {
        let chunks = serialize_command("A0001", &Command::from("CAPABILITY"));
        assert_eq!(chunks, vec![b"A0001 CAPABILITY\r\n".to_vec()]);
    }

    #[test]
    fn test_quoted_escaping() {
        let command = Command::new("SELECT").arg(Attribute::string("a \"b\" \\c"));
        let chunks = serialize_command("A1", &command);
        assert_eq!(chunks, vec![b"A1 SELECT \"a \\\"b\\\" \\\\c\"\r\n".to_vec()]);
    }

    #[test]
    fn test_literal_splits_chunks() {
        let command = Command::new("APPEND")
            .arg(Attribute::string("INBOX"))
            .arg(Attribute::Literal(b"hello".to_vec()));
        let chunks = serialize_command("A2", &command);
        assert_eq!(
            chunks,
            vec![
                b"A2 APPEND \"INBOX\" {5}\r\n".to_vec(),
                b"hello\r\n".to_vec(),
            ]
        );
    }

    #[test]
    fn test_non_ascii_string_becomes_literal() {
        let command = Command::new("SEARCH").arg(Attribute::string("ä"));
        let chunks = serialize_command("A3", &command);
        assert_eq!(
            chunks,
            vec![b"A3 SEARCH {2}\r\n".to_vec(), "ä\r\n".as_bytes().to_vec()]
        );
    }

    #[test]
    fn test_sections_and_lists() {
        let command = Command::new("UID FETCH")
            .arg(Attribute::sequence("1:*"))
            .arg(Attribute::List(vec![
                Attribute::atom("UID"),
                Attribute::Atom {
                    value: "BODY.PEEK".into(),
                    section: Some(vec![
                        Attribute::atom("HEADER.FIELDS"),
                        Attribute::List(vec![Attribute::atom("DATE")]),
                    ]),
                    partial: Some(Partial {
                        start: 0,
                        length: Some(100),
                    }),
                },
                Attribute::Atom {
                    value: "BODY".into(),
                    section: Some(Vec::new()),
                    partial: None,
                },
            ]));
        let chunks = serialize_command("A4", &command);
        assert_eq!(
            String::from_utf8(chunks.concat()).unwrap(),
            "A4 UID FETCH 1:* (UID BODY.PEEK[HEADER.FIELDS (DATE)]<0.100> BODY[])\r\n"
        );
    }

    #[test]
    fn test_redacted_display() {
        let command = Command::new("LOGIN")
            .arg(Attribute::string("user"))
            .arg(Attribute::string("hunter2").sensitive());
        let shown = Redacted {
            tag: "A5",
            command: &command,
        }
        .to_string();
        assert_eq!(shown, "A5 LOGIN \"user\" [redacted]");

        let wire = serialize_command("A5", &command).concat();
        assert_eq!(wire, b"A5 LOGIN \"user\" \"hunter2\"\r\n");
    }
}
