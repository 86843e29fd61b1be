//! SELECT / EXAMINE result.

use crate::syntax::ResponseTree;

use super::text_list;

/// State of a freshly selected mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxInfo {
    /// Message count.
    pub exists: u32,
    /// Flags defined for the mailbox.
    pub flags: Vec<String>,
    /// Flags that can be changed permanently.
    pub permanent_flags: Vec<String>,
    /// Opened with EXAMINE or `[READ-ONLY]`.
    pub read_only: bool,
    /// `UIDVALIDITY` code.
    pub uid_validity: Option<u64>,
    /// `UIDNEXT` code.
    pub uid_next: Option<u64>,
    /// Exact decimal text, since mod-sequences use the full 63-bit range.
    pub highest_modseq: Option<String>,
    /// The server reported `NOMODSEQ`; `highest_modseq` is then always `None`.
    pub no_modseq: bool,
}

/// Decodes the untagged records of a SELECT or EXAMINE completion.
#[must_use]
pub fn parse_select(tree: &ResponseTree) -> MailboxInfo {
    let mut info = MailboxInfo {
        read_only: tree.response.code.as_deref() == Some("READ-ONLY"),
        ..MailboxInfo::default()
    };

    if let Some(exists) = tree.records("EXISTS").iter().rev().find_map(|r| r.nr) {
        info.exists = exists;
    }
    if let Some(flags) = tree
        .records("FLAGS")
        .iter()
        .rev()
        .find_map(|r| r.attributes.first())
    {
        info.flags = text_list(flags);
    }

    for record in tree.records("OK") {
        let first = record.code_args.first();
        match record.code.as_deref() {
            Some("PERMANENTFLAGS") => {
                info.permanent_flags = first.map(text_list).unwrap_or_default();
            }
            Some("UIDVALIDITY") => info.uid_validity = first.and_then(|a| a.as_number()),
            Some("UIDNEXT") => info.uid_next = first.and_then(|a| a.as_number()),
            Some("HIGHESTMODSEQ") => info.highest_modseq = first.and_then(|a| a.to_text()),
            Some("NOMODSEQ") => info.no_modseq = true,
            _ => {}
        }
    }
    if info.no_modseq {
        info.highest_modseq = None;
    }

    info
}
