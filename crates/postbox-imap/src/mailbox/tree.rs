//! Mailbox hierarchy built from LIST and LSUB responses.

use tracing::warn;

use crate::codec::decode_mailbox_name;
use crate::syntax::Response;

use super::special_use::SpecialUseTable;

/// One mailbox in the hierarchy. The root node has an empty name and path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxNode {
    /// Last path segment, decoded.
    pub name: String,
    /// Full decoded path.
    pub path: String,
    /// Hierarchy delimiter; `None` for flat servers.
    pub delimiter: Option<String>,
    /// Name attributes such as `\HasChildren` or `\Sent`.
    pub flags: Vec<String>,
    /// Seen in a LIST response.
    pub listed: bool,
    /// Seen in an LSUB response.
    pub subscribed: bool,
    /// Detected role such as `\Sent`.
    pub special_use: Option<String>,
    /// Child mailboxes in LIST order.
    pub children: Vec<MailboxNode>,
}

impl MailboxNode {
    /// An empty root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Finds a node by its full path, depth-first.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Self> {
        if self.path == path && !self.name.is_empty() {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    /// Every node below this one, depth-first.
    #[must_use]
    pub fn descendants(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        for child in &self.children {
            out.push(child);
            out.extend(child.descendants());
        }
        out
    }
}

/// Returns the node for `path`, creating any missing ancestors.
///
/// Segments match exactly, except `INBOX`, which matches in any case. A
/// created node takes its path from the segments of `path` itself.
pub fn ensure_path<'a>(
    root: &'a mut MailboxNode,
    path: &str,
    delimiter: Option<&str>,
) -> &'a mut MailboxNode {
    let segments: Vec<&str> = match delimiter {
        Some(delimiter) if !delimiter.is_empty() => path.split(delimiter).collect(),
        _ => vec![path],
    };

    let mut node = root;
    for (i, segment) in segments.iter().enumerate() {
        let index = match node
            .children
            .iter()
            .position(|child| same_segment(&child.name, segment))
        {
            Some(index) => index,
            None => {
                node.children.push(MailboxNode {
                    name: (*segment).to_string(),
                    path: segments[..=i].join(delimiter.unwrap_or_default()),
                    delimiter: delimiter.map(str::to_string),
                    ..MailboxNode::default()
                });
                node.children.len() - 1
            }
        };
        node = &mut node.children[index];
    }

    node
}

fn same_segment(existing: &str, wanted: &str) -> bool {
    existing == wanted
        || (existing.eq_ignore_ascii_case("INBOX") && wanted.eq_ignore_ascii_case("INBOX"))
}

/// Merges LIST (`subscribed == false`) or LSUB records into the tree.
///
/// LIST replaces a node's flags and marks it listed; LSUB adds missing flags
/// and marks it subscribed. Special use is re-evaluated either way.
pub fn apply_list_records(
    root: &mut MailboxNode,
    records: &[Response],
    subscribed: bool,
    special_use: &SpecialUseTable,
) {
    for record in records {
        let [flags, delimiter, name, ..] = record.attributes.as_slice() else {
            warn!(command = %record.command, "skipping short mailbox record");
            continue;
        };
        let Some(raw_name) = name.to_text() else {
            continue;
        };
        let path = decode_mailbox_name(&raw_name).unwrap_or(raw_name);
        let delimiter = delimiter.to_text();
        let flags: Vec<String> = flags
            .as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(|flag| flag.to_text())
            .collect();

        let node = ensure_path(root, &path, delimiter.as_deref());
        if subscribed {
            for flag in flags {
                if !node.flags.contains(&flag) {
                    node.flags.push(flag);
                }
            }
            node.subscribed = true;
        } else {
            node.flags = flags;
            node.listed = true;
        }
        node.special_use = special_use.check(&node.flags, &node.name).map(str::to_string);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::syntax::parse_response;

    fn node(name: &str, path: &str, children: Vec<MailboxNode>) -> MailboxNode {
        MailboxNode {
            name: name.into(),
            path: path.into(),
            delimiter: Some("/".into()),
            children,
            ..MailboxNode::default()
        }
    }

    #[test]
    fn test_creates_missing_path() {
        let mut root = MailboxNode::root();
        let leaf = ensure_path(&mut root, "hello/world", Some("/"));
        assert_eq!(*leaf, node("world", "hello/world", vec![]));
        assert_eq!(
            root.children,
            vec![node("hello", "hello", vec![node("world", "hello/world", vec![])])]
        );
    }

    #[test]
    fn test_idempotent() {
        let mut root = MailboxNode::root();
        ensure_path(&mut root, "hello/world", Some("/")).listed = true;
        let again = ensure_path(&mut root, "hello/world", Some("/"));
        assert!(again.listed);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].children.len(), 1);
    }

    #[test]
    fn test_inbox_case_insensitive() {
        let mut root = MailboxNode::root();
        assert_eq!(ensure_path(&mut root, "Inbox/world", Some("/")).path, "Inbox/world");
        assert_eq!(ensure_path(&mut root, "INBOX/worlds", Some("/")).path, "INBOX/worlds");
        assert_eq!(
            root.children,
            vec![node(
                "Inbox",
                "Inbox",
                vec![
                    node("world", "Inbox/world", vec![]),
                    node("worlds", "INBOX/worlds", vec![]),
                ]
            )]
        );
    }

    #[test]
    fn test_other_segments_are_case_sensitive() {
        let mut root = MailboxNode::root();
        ensure_path(&mut root, "Work", Some("/"));
        ensure_path(&mut root, "work", Some("/"));
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_nil_delimiter_keeps_whole_name() {
        let mut root = MailboxNode::root();
        let leaf = ensure_path(&mut root, "a/b", None);
        assert_eq!(leaf.name, "a/b");
        assert_eq!(leaf.delimiter, None);
    }

    #[test]
    fn test_apply_list_and_lsub() {
        let table = SpecialUseTable::default();
        let list = vec![
            parse_response(b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n").unwrap(),
            parse_response(b"* LIST (\\HasNoChildren \\Sent) \"/\" \"Archive/Sent\"\r\n").unwrap(),
            parse_response(b"* LIST () \"/\" \"Entw&APw-rfe\"\r\n").unwrap(),
            parse_response(b"* LIST (\\NoInferiors) NIL \"Flat\"\r\n").unwrap(),
        ];
        let lsub = vec![parse_response(b"* LSUB (\\Marked) \"/\" \"INBOX\"\r\n").unwrap()];

        let mut root = MailboxNode::root();
        apply_list_records(&mut root, &list, false, &table);
        apply_list_records(&mut root, &lsub, true, &table);

        let inbox = root.find("INBOX").unwrap();
        assert!(inbox.listed && inbox.subscribed);
        assert_eq!(inbox.flags, vec!["\\HasNoChildren", "\\Marked"]);

        let sent = root.find("Archive/Sent").unwrap();
        assert_eq!(sent.special_use.as_deref(), Some("\\Sent"));
        // Intermediate node exists but was never listed
        assert!(!root.find("Archive").unwrap().listed);

        let drafts = root.find("Entwürfe").unwrap();
        assert_eq!(drafts.special_use.as_deref(), Some("\\Drafts"));

        assert_eq!(root.find("Flat").unwrap().delimiter, None);
        assert_eq!(root.descendants().len(), 5);
    }
}
