//! BODYSTRUCTURE decoding.

use std::collections::BTreeMap;

use crate::codec::decode_encoded_words;
use crate::syntax::Attribute;

use super::envelope::{Envelope, parse_envelope};

/// One node of a message's MIME tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyNode {
    /// Dotted part number (`1`, `2.1`, ...). `None` for a multipart root.
    pub part: Option<String>,
    /// Lower-cased `type/subtype`.
    pub content_type: String,
    /// Content-type parameters with lower-cased keys; `None` when `NIL`.
    pub parameters: Option<BTreeMap<String, String>>,
    /// Content-ID.
    pub id: Option<String>,
    /// Content-Description.
    pub description: Option<String>,
    /// Lower-cased transfer encoding.
    pub encoding: Option<String>,
    /// Encoded size in bytes.
    pub size: Option<u64>,
    /// Line count of `text/*` and `message/rfc822` parts.
    pub line_count: Option<u64>,
    /// Envelope of an encapsulated `message/rfc822`.
    pub envelope: Option<Box<Envelope>>,
    /// Content-MD5 from the extension data.
    pub md5: Option<String>,
    /// Lower-cased disposition type, e.g. `attachment`.
    pub disposition: Option<String>,
    /// Disposition parameters; `filename` has encoded words decoded.
    pub disposition_parameters: Option<BTreeMap<String, String>>,
    /// Content-Language tags.
    pub language: Option<Vec<String>>,
    /// Content-Location.
    pub location: Option<String>,
    /// Subparts of a multipart, or the body of a `message/rfc822`.
    pub child_nodes: Vec<BodyNode>,
}

/// Decodes a BODYSTRUCTURE (or BODY) list.
///
/// Multipart children are numbered depth-first; a lone non-multipart body is
/// part `1`.
#[must_use]
pub fn parse_bodystructure(fields: &[Attribute]) -> BodyNode {
    if is_multipart(fields) {
        process(fields, &[])
    } else {
        process(fields, &[1])
    }
}

fn is_multipart(fields: &[Attribute]) -> bool {
    fields.first().and_then(Attribute::as_list).is_some()
}

fn process(node: &[Attribute], path: &[u32]) -> BodyNode {
    let mut body = BodyNode {
        part: (!path.is_empty()).then(|| {
            path.iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(".")
        }),
        ..BodyNode::default()
    };
    let lower = |index: usize| {
        node.get(index)
            .and_then(Attribute::to_text)
            .map(|s| s.to_ascii_lowercase())
    };
    let mut i = 0;

    if is_multipart(node) {
        let mut part = 0;
        while let Some(child) = node.get(i).and_then(Attribute::as_list) {
            part += 1;
            let mut child_path = path.to_vec();
            child_path.push(part);
            body.child_nodes.push(process(child, &child_path));
            i += 1;
        }
        body.content_type = format!("multipart/{}", lower(i).unwrap_or_default());
        i += 1;
        if i < node.len() {
            body.parameters = parse_parameters(&node[i]);
            i += 1;
        }
    } else {
        body.content_type = format!(
            "{}/{}",
            lower(0).unwrap_or_default(),
            lower(1).unwrap_or_default()
        );
        body.parameters = node.get(2).and_then(parse_parameters);
        body.id = node.get(3).and_then(Attribute::to_text);
        body.description = node.get(4).and_then(Attribute::to_text);
        body.encoding = lower(5);
        body.size = node.get(6).and_then(Attribute::as_number);
        i = 7;

        if body.content_type == "message/rfc822" {
            body.envelope = node
                .get(i)
                .and_then(Attribute::as_list)
                .map(|fields| Box::new(parse_envelope(fields)));
            if let Some(inner) = node.get(i + 1).and_then(Attribute::as_list) {
                let mut inner_path = path.to_vec();
                // A single-part body of an encapsulated message is part
                // `X.1` (RFC 3501 section 6.4.5), not `X` again
                if !is_multipart(inner) {
                    inner_path.push(1);
                }
                body.child_nodes.push(process(inner, &inner_path));
            }
            body.line_count = node.get(i + 2).and_then(Attribute::as_number);
            i += 3;
        } else if body.content_type.starts_with("text/") {
            body.line_count = node.get(i).and_then(Attribute::as_number);
            i += 1;
        }

        if i < node.len() {
            body.md5 = node.get(i).and_then(Attribute::to_text);
            i += 1;
        }
    }

    if let Some(disposition) = node.get(i).and_then(Attribute::as_list) {
        body.disposition = disposition
            .first()
            .and_then(Attribute::to_text)
            .map(|s| s.to_ascii_lowercase());
        body.disposition_parameters = disposition.get(1).and_then(parse_parameters);
    }
    i += 1;

    body.language = node.get(i).and_then(|language| match language.as_list() {
        Some(items) => Some(
            items
                .iter()
                .filter_map(Attribute::to_text)
                .map(|s| s.to_ascii_lowercase())
                .collect(),
        ),
        None => language.to_text().map(|s| vec![s.to_ascii_lowercase()]),
    });
    i += 1;

    body.location = node.get(i).and_then(Attribute::to_text);

    body
}

/// Key/value parameter list with lower-cased keys and decoded values.
fn parse_parameters(attribute: &Attribute) -> Option<BTreeMap<String, String>> {
    let list = attribute.as_list()?;
    Some(
        list.chunks_exact(2)
            .filter_map(|pair| {
                let key = pair[0].to_text()?.to_ascii_lowercase();
                let value = pair[1].to_text().unwrap_or_default();
                Some((key, decode_encoded_words(&value)))
            })
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::syntax::parse_attributes;

    fn structure(text: &str) -> BodyNode {
        let attributes = parse_attributes(text).unwrap();
        parse_bodystructure(attributes[0].as_list().unwrap())
    }

    #[test]
    fn test_unicode_filename() {
        let parsed = structure(concat!(
            "((\"APPLICATION\" \"OCTET-STREAM\" NIL NIL NIL \"BASE64\" 40 NIL ",
            "(\"ATTACHMENT\" (\"FILENAME\" \"=?ISO-8859-1?Q?BBR_Handel,_Gewerbe,_B=FCrobetriebe,?= ",
            "=?ISO-8859-1?Q?_private_Bildungseinrichtungen.txt?=\")) NIL) ",
            "\"MIXED\" (\"BOUNDARY\" \"----sinikael-?=_1-14105085265110.49903922458179295\") NIL NIL)"
        ));

        assert_eq!(parsed.part, None);
        assert_eq!(parsed.content_type, "multipart/mixed");
        assert_eq!(
            parsed.parameters.as_ref().unwrap()["boundary"],
            "----sinikael-?=_1-14105085265110.49903922458179295"
        );
        assert_eq!(parsed.child_nodes.len(), 1);

        let child = &parsed.child_nodes[0];
        assert_eq!(child.part.as_deref(), Some("1"));
        assert_eq!(child.content_type, "application/octet-stream");
        assert_eq!(child.parameters, None);
        assert_eq!(child.encoding.as_deref(), Some("base64"));
        assert_eq!(child.size, Some(40));
        assert_eq!(child.disposition.as_deref(), Some("attachment"));
        assert_eq!(
            child.disposition_parameters.as_ref().unwrap()["filename"],
            "BBR Handel, Gewerbe, Bürobetriebe, private Bildungseinrichtungen.txt"
        );
    }

    #[test]
    fn test_single_part_is_part_one() {
        let parsed = structure(
            "(\"TEXT\" \"PLAIN\" (\"CHARSET\" \"US-ASCII\") NIL NIL \"7BIT\" 3028 92)",
        );
        assert_eq!(parsed.part.as_deref(), Some("1"));
        assert_eq!(parsed.content_type, "text/plain");
        assert_eq!(parsed.parameters.as_ref().unwrap()["charset"], "US-ASCII");
        assert_eq!(parsed.size, Some(3028));
        assert_eq!(parsed.line_count, Some(92));
        assert!(parsed.child_nodes.is_empty());
    }

    #[test]
    fn test_nested_numbering() {
        let parsed = structure(concat!(
            "((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1) ",
            "((\"TEXT\" \"HTML\" NIL NIL NIL \"QUOTED-PRINTABLE\" 20 2) ",
            "(\"IMAGE\" \"PNG\" (\"NAME\" \"a.png\") \"<img1>\" NIL \"BASE64\" 30) \"RELATED\") ",
            "\"MIXED\")"
        ));
        assert_eq!(parsed.child_nodes[0].part.as_deref(), Some("1"));
        let related = &parsed.child_nodes[1];
        assert_eq!(related.part.as_deref(), Some("2"));
        assert_eq!(related.content_type, "multipart/related");
        assert_eq!(related.child_nodes[0].part.as_deref(), Some("2.1"));
        assert_eq!(related.child_nodes[1].part.as_deref(), Some("2.2"));
        assert_eq!(related.child_nodes[1].id.as_deref(), Some("<img1>"));
        assert_eq!(related.child_nodes[1].line_count, None);
    }

    #[test]
    fn test_message_rfc822() {
        let parsed = structure(concat!(
            "((\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1) ",
            "(\"MESSAGE\" \"RFC822\" NIL NIL NIL \"7BIT\" 500 ",
            "(NIL \"Forwarded\" NIL NIL NIL NIL NIL NIL NIL NIL) ",
            "(\"TEXT\" \"PLAIN\" NIL NIL NIL \"8BIT\" 100 4) 12) ",
            "\"MIXED\")"
        ));
        let message = &parsed.child_nodes[1];
        assert_eq!(message.part.as_deref(), Some("2"));
        assert_eq!(
            message.envelope.as_ref().unwrap().subject.as_deref(),
            Some("Forwarded")
        );
        assert_eq!(message.line_count, Some(12));
        assert_eq!(message.child_nodes[0].part.as_deref(), Some("2.1"));
        assert_eq!(message.child_nodes[0].content_type, "text/plain");
    }

    #[test]
    fn test_extension_fields() {
        let parsed = structure(concat!(
            "(\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 1 1 \"abc\" ",
            "(\"INLINE\" NIL) (\"EN\" \"DE\") \"http://x/\")"
        ));
        assert_eq!(parsed.md5.as_deref(), Some("abc"));
        assert_eq!(parsed.disposition.as_deref(), Some("inline"));
        assert_eq!(parsed.disposition_parameters, None);
        assert_eq!(parsed.language, Some(vec!["en".to_string(), "de".to_string()]));
        assert_eq!(parsed.location.as_deref(), Some("http://x/"));
    }

    #[test]
    fn test_empty_is_total() {
        let parsed = parse_bodystructure(&[]);
        assert_eq!(parsed.content_type, "/");
    }
}
