//! ENVELOPE decoding.

use crate::codec::decode_encoded_words;
use crate::syntax::Attribute;

/// Parsed ENVELOPE structure.
///
/// Absent address lists are empty; absent scalar fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Raw `Date` header.
    pub date: Option<String>,
    /// Subject with RFC 2047 words decoded.
    pub subject: Option<String>,
    /// `From` addresses.
    pub from: Vec<Address>,
    /// `Sender` addresses.
    pub sender: Vec<Address>,
    /// `Reply-To` addresses.
    pub reply_to: Vec<Address>,
    /// `To` addresses.
    pub to: Vec<Address>,
    /// `Cc` addresses.
    pub cc: Vec<Address>,
    /// `Bcc` addresses.
    pub bcc: Vec<Address>,
    /// `In-Reply-To` header.
    pub in_reply_to: Option<String>,
    /// `Message-ID` header.
    pub message_id: Option<String>,
}

/// A mailbox, or an RFC 2822 group of mailboxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name (or group name), RFC 2047-decoded.
    pub name: Option<String>,
    /// `mailbox@host`; `None` for groups.
    pub address: Option<String>,
    /// Members when this entry is a group.
    pub group: Option<Vec<Address>>,
}

/// Decodes the ten positional ENVELOPE fields.
#[must_use]
pub fn parse_envelope(fields: &[Attribute]) -> Envelope {
    let text = |index: usize| fields.get(index).and_then(Attribute::to_text);
    let addresses = |index: usize| fields.get(index).map(parse_addresses).unwrap_or_default();

    Envelope {
        date: text(0),
        subject: text(1).map(|s| decode_encoded_words(&s)),
        from: addresses(2),
        sender: addresses(3),
        reply_to: addresses(4),
        to: addresses(5),
        cc: addresses(6),
        bcc: addresses(7),
        in_reply_to: text(8),
        message_id: text(9),
    }
}

/// Decodes an address list, folding group start/end markers into groups.
///
/// A group starts with an entry whose host is `NIL` and whose mailbox is the
/// group name, and ends with an entry whose mailbox and host are both `NIL`.
fn parse_addresses(list: &Attribute) -> Vec<Address> {
    let Some(entries) = list.as_list() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut group: Option<Address> = None;

    for entry in entries.iter().filter_map(Attribute::as_list) {
        let field = |index: usize| entry.get(index).and_then(Attribute::to_text);
        let (name, mailbox, host) = (field(0), field(2), field(3));

        match (mailbox, host) {
            (Some(group_name), None) => {
                if let Some(open) = group.take() {
                    out.push(open);
                }
                group = Some(Address {
                    name: Some(decode_encoded_words(&group_name)),
                    address: None,
                    group: Some(Vec::new()),
                });
            }
            (None, None) => {
                if let Some(closed) = group.take() {
                    out.push(closed);
                }
            }
            (mailbox, host) => {
                let address = Address {
                    name: name.map(|n| decode_encoded_words(&n)),
                    address: Some(format!(
                        "{}@{}",
                        mailbox.unwrap_or_default(),
                        host.unwrap_or_default()
                    )),
                    group: None,
                };
                match group.as_mut().and_then(|g| g.group.as_mut()) {
                    Some(members) => members.push(address),
                    None => out.push(address),
                }
            }
        }
    }
    if let Some(open) = group {
        out.push(open);
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::syntax::parse_attributes;

    fn envelope(text: &str) -> Envelope {
        let attributes = parse_attributes(text).unwrap();
        parse_envelope(attributes[0].as_list().unwrap())
    }

    #[test]
    fn test_rfc3501_example() {
        let parsed = envelope(concat!(
            "(\"Wed, 17 Jul 1996 02:23:25 -0700 (PDT)\" \"IMAP4rev1 WG mtg summary and minutes\" ",
            "((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) ",
            "((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) ",
            "((\"Terry Gray\" NIL \"gray\" \"cac.washington.edu\")) ",
            "((NIL NIL \"imap\" \"cac.washington.edu\")) ",
            "((NIL NIL \"minutes\" \"CNRI.Reston.VA.US\") (\"John Klensin\" NIL \"KLENSIN\" \"MIT.EDU\")) ",
            "NIL NIL \"<B27397-0100000@cac.washington.edu>\")"
        ));

        assert_eq!(parsed.date.as_deref(), Some("Wed, 17 Jul 1996 02:23:25 -0700 (PDT)"));
        assert_eq!(parsed.subject.as_deref(), Some("IMAP4rev1 WG mtg summary and minutes"));
        assert_eq!(
            parsed.from,
            vec![Address {
                name: Some("Terry Gray".into()),
                address: Some("gray@cac.washington.edu".into()),
                group: None,
            }]
        );
        assert_eq!(parsed.to[0].name, None);
        assert_eq!(parsed.to[0].address.as_deref(), Some("imap@cac.washington.edu"));
        assert_eq!(parsed.cc.len(), 2);
        assert_eq!(parsed.cc[1].address.as_deref(), Some("KLENSIN@MIT.EDU"));
        assert!(parsed.bcc.is_empty());
        assert_eq!(parsed.in_reply_to, None);
        assert_eq!(
            parsed.message_id.as_deref(),
            Some("<B27397-0100000@cac.washington.edu>")
        );
    }

    #[test]
    fn test_encoded_subject_and_name() {
        let parsed = envelope(concat!(
            "(NIL \"=?UTF-8?Q?Gr=C3=BC=C3=9Fe?=\" ",
            "((\"=?ISO-8859-1?Q?J=F6rg?=\" NIL \"joerg\" \"example.org\")) ",
            "NIL NIL NIL NIL NIL NIL NIL)"
        ));
        assert_eq!(parsed.subject.as_deref(), Some("Grüße"));
        assert_eq!(parsed.from[0].name.as_deref(), Some("Jörg"));
        assert!(parsed.sender.is_empty());
    }

    #[test]
    fn test_groups() {
        let parsed = envelope(concat!(
            "(NIL NIL NIL NIL NIL ",
            "((NIL NIL \"undisclosed\" NIL) (NIL NIL \"a\" \"x.org\") (NIL NIL \"b\" \"x.org\") (NIL NIL NIL NIL) ",
            "(NIL NIL \"c\" \"y.org\")) ",
            "NIL NIL NIL NIL)"
        ));
        assert_eq!(parsed.to.len(), 2);
        assert_eq!(parsed.to[0].name.as_deref(), Some("undisclosed"));
        let members = parsed.to[0].group.as_ref().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].address.as_deref(), Some("b@x.org"));
        assert_eq!(parsed.to[1].address.as_deref(), Some("c@y.org"));
    }

    #[test]
    fn test_short_input_is_total() {
        assert_eq!(parse_envelope(&[]), Envelope::default());
    }
}
