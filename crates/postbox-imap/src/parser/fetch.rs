//! FETCH result.

use std::collections::{BTreeMap, HashMap};

use crate::syntax::{Attribute, Response, ResponseTree};

use super::bodystructure::{BodyNode, parse_bodystructure};
use super::envelope::{Envelope, parse_envelope};
use super::text_list;

/// Decoded value of one FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchValue {
    /// Numeric item such as `UID` or `RFC822.SIZE`.
    Number(u64),
    /// String, atom or UTF-8 literal.
    Text(String),
    /// Flags, labels and other flat lists.
    List(Vec<String>),
    /// Decoded `ENVELOPE`.
    Envelope(Box<Envelope>),
    /// Decoded `BODYSTRUCTURE`.
    BodyStructure(Box<BodyNode>),
    /// Literal that is not valid UTF-8.
    Bytes(Vec<u8>),
    /// `NIL`.
    Nil,
}

impl FetchValue {
    /// Numeric value, parsing text if needed.
    #[must_use]
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Text value, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// List value, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// All data items reported for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRecord {
    /// Sequence number from `* <seq> FETCH`.
    pub seq: u32,
    /// Values keyed by lower-cased item label, e.g. `body[header (date)]<0>`.
    pub values: BTreeMap<String, FetchValue>,
}

impl FetchRecord {
    /// Value for a lower-cased item label.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FetchValue> {
        self.values.get(key)
    }

    /// The `UID` item.
    #[must_use]
    pub fn uid(&self) -> Option<u64> {
        self.get("uid").and_then(FetchValue::as_number)
    }

    /// The `FLAGS` item, empty when absent.
    #[must_use]
    pub fn flags(&self) -> &[String] {
        self.get("flags")
            .and_then(FetchValue::as_list)
            .unwrap_or_default()
    }
}

/// Decodes all FETCH records of a completion, merging records that share a
/// sequence number. Distinct messages keep first-seen order.
#[must_use]
pub fn parse_fetch(tree: &ResponseTree) -> Vec<FetchRecord> {
    let mut records: Vec<FetchRecord> = Vec::new();
    let mut by_seq: HashMap<u32, usize> = HashMap::new();

    for record in tree.records("FETCH").iter().filter_map(parse_fetch_record) {
        match by_seq.get(&record.seq) {
            Some(&index) => records[index].values.extend(record.values),
            None => {
                by_seq.insert(record.seq, records.len());
                records.push(record);
            }
        }
    }

    records
}

/// Decodes a single `* <seq> FETCH (...)` record.
#[must_use]
pub fn parse_fetch_record(response: &Response) -> Option<FetchRecord> {
    let seq = response.nr?;
    let items = response
        .attributes
        .first()
        .and_then(Attribute::as_list)
        .unwrap_or_default();

    let values = items
        .chunks_exact(2)
        .map(|pair| {
            let key = item_key(&pair[0]);
            let value = decode_value(&key, &pair[1]);
            (key, value)
        })
        .collect();

    Some(FetchRecord { seq, values })
}

/// Rebuilds the lower-cased label of an item, including section and partial.
fn item_key(attribute: &Attribute) -> String {
    match attribute {
        Attribute::Atom {
            value,
            section,
            partial,
        } => {
            let mut key = value.to_ascii_lowercase();
            if let Some(section) = section {
                key.push('[');
                key.push_str(&joined(section));
                key.push(']');
            }
            if let Some(partial) = partial {
                match partial.length {
                    Some(length) => key.push_str(&format!("<{}.{length}>", partial.start)),
                    None => key.push_str(&format!("<{}>", partial.start)),
                }
            }
            key
        }
        Attribute::List(items) => format!("({})", joined(items)),
        other => other.to_text().unwrap_or_default().to_ascii_lowercase(),
    }
}

fn joined(items: &[Attribute]) -> String {
    items.iter().map(item_key).collect::<Vec<_>>().join(" ")
}

fn decode_value(key: &str, value: &Attribute) -> FetchValue {
    if value.is_nil() {
        return FetchValue::Nil;
    }

    if let Some(items) = value.as_list() {
        return match key {
            "envelope" => FetchValue::Envelope(Box::new(parse_envelope(items))),
            "bodystructure" | "body" => {
                FetchValue::BodyStructure(Box::new(parse_bodystructure(items)))
            }
            "modseq" => FetchValue::Text(
                items
                    .first()
                    .and_then(Attribute::to_text)
                    .unwrap_or_else(|| "0".into()),
            ),
            _ => FetchValue::List(text_list(value)),
        };
    }

    match (key, value) {
        ("modseq" | "x-gm-msgid" | "x-gm-thrid", _) => {
            FetchValue::Text(value.to_text().unwrap_or_else(|| "0".into()))
        }
        ("uid" | "rfc822.size", _) => FetchValue::Number(value.as_number().unwrap_or(0)),
        (_, Attribute::Number(n)) => FetchValue::Number(*n),
        (_, Attribute::Literal(bytes)) => match String::from_utf8(bytes.clone()) {
            Ok(text) => FetchValue::Text(text),
            Err(e) => FetchValue::Bytes(e.into_bytes()),
        },
        _ => value.to_text().map_or(FetchValue::Nil, FetchValue::Text),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::parser::test_support::tree;

    #[test]
    fn test_lowercase_keys_with_section_and_partial() {
        let records = parse_fetch(&tree(
            &["* 123 FETCH (BODY[HEADER (DATE SUBJECT)]<0.123> \"abc\")\r\n"],
            "A1 OK done\r\n",
        ));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seq, 123);
        assert_eq!(
            records[0].get("body[header (date subject)]<0.123>"),
            Some(&FetchValue::Text("abc".into()))
        );
    }

    #[test]
    fn test_merge_by_sequence_number() {
        let records = parse_fetch(&tree(
            &[
                "* 123 FETCH (UID 789)\r\n",
                "* 124 FETCH (UID 790)\r\n",
                "* 123 FETCH (MODSEQ (127))\r\n",
            ],
            "A1 OK done\r\n",
        ));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seq, 123);
        assert_eq!(records[0].values.len(), 2);
        assert_eq!(records[0].get("uid"), Some(&FetchValue::Number(789)));
        assert_eq!(records[0].get("modseq"), Some(&FetchValue::Text("127".into())));
        assert_eq!(records[1].seq, 124);
        assert_eq!(records[1].uid(), Some(790));
        assert_eq!(records[1].values.len(), 1);
    }

    #[test]
    fn test_untagged_flags_and_modseq() {
        let response = crate::syntax::parse_response(
            b"* 123 FETCH (FLAGS (\\Seen) MODSEQ (4))\r\n",
        )
        .unwrap();
        let record = parse_fetch_record(&response).unwrap();
        assert_eq!(record.seq, 123);
        assert_eq!(record.flags(), ["\\Seen".to_string()]);
        assert_eq!(record.get("modseq"), Some(&FetchValue::Text("4".into())));
    }

    #[test]
    fn test_value_kinds() {
        let mut tree = tree(
            &[concat!(
                "* 1 FETCH (RFC822.SIZE 44827 X-GM-MSGID 1278455344230334865 ",
                "X-GM-LABELS (\\Inbox \"Work stuff\") INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" ",
                "BODY[] {5}\r\nhello ",
                "ENVELOPE (NIL \"hi\" NIL NIL NIL NIL NIL NIL NIL NIL) ",
                "BODY (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 5 1))\r\n"
            )],
            "A1 OK done\r\n",
        );
        tree.push(crate::syntax::parse_response(b"* 1 FETCH (BODY[1] {2}\r\n\xff\xfe)\r\n").unwrap());
        let records = parse_fetch(&tree);
        let record = &records[0];
        assert_eq!(record.get("rfc822.size"), Some(&FetchValue::Number(44827)));
        assert_eq!(
            record.get("x-gm-msgid"),
            Some(&FetchValue::Text("1278455344230334865".into()))
        );
        assert_eq!(
            record.get("x-gm-labels"),
            Some(&FetchValue::List(vec!["\\Inbox".into(), "Work stuff".into()]))
        );
        assert_eq!(
            record.get("internaldate").and_then(FetchValue::as_text),
            Some("17-Jul-1996 02:44:25 -0700")
        );
        assert_eq!(record.get("body[]"), Some(&FetchValue::Text("hello".into())));
        assert_eq!(record.get("body[1]"), Some(&FetchValue::Bytes(vec![0xff, 0xfe])));
        match record.get("envelope") {
            Some(FetchValue::Envelope(envelope)) => {
                assert_eq!(envelope.subject.as_deref(), Some("hi"));
            }
            other => panic!("expected envelope, got {other:?}"),
        }
        match record.get("body") {
            Some(FetchValue::BodyStructure(body)) => assert_eq!(body.content_type, "text/plain"),
            other => panic!("expected body structure, got {other:?}"),
        }
    }

    #[test]
    fn test_records_without_number_are_skipped() {
        let records = parse_fetch(&tree(&["* FETCH (UID 1)\r\n"], "A1 OK done\r\n"));
        assert!(records.is_empty());
    }
}
