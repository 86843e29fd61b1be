//! Mailbox-level operations.

use tracing::debug;

use super::Client;
use crate::codec::encode_mailbox_name;
use crate::command::list_all;
use crate::error::ErrorKind;
use crate::handler::Event;
use crate::mailbox::{MailboxNode, apply_list_records};
use crate::parser::{MailboxInfo, Namespaces, parse_namespace, parse_select};
use crate::syntax::{Attribute, Command};
use crate::types::SessionState;
use crate::Result;

/// Options for [`Client::select_mailbox`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Use EXAMINE instead of SELECT.
    pub read_only: bool,
    /// Ask for CONDSTORE if the server supports it.
    pub condstore: bool,
}

impl Client {
    /// Selects (or examines) a mailbox.
    ///
    /// The previously selected mailbox, if different, is reported closed
    /// before the new one is reported selected. A failed select leaves the
    /// session authenticated with no mailbox.
    pub async fn select_mailbox(&self, path: &str, options: SelectOptions) -> Result<MailboxInfo> {
        let name = if options.read_only { "EXAMINE" } else { "SELECT" };
        let mut command = Command::new(name).arg(Attribute::string(encode_mailbox_name(path)));
        if options.condstore && self.has_capability("CONDSTORE") {
            command = command.arg(Attribute::List(vec![Attribute::atom("CONDSTORE")]));
        }

        let tree = match self.execute(command, &["EXISTS", "FLAGS", "OK"]).await {
            Ok(tree) => tree,
            Err(error) => {
                if self.state() == SessionState::Selected {
                    self.shared.change_state(SessionState::Authenticated);
                }
                return Err(error);
            }
        };

        let previous = {
            let mut session = self.shared.session();
            session.change_state(SessionState::Selected);
            session.selected_mailbox.replace(path.to_string())
        };
        if let Some(previous) = previous.filter(|previous| previous != path) {
            self.shared.emit(&Event::CloseMailbox(previous));
        }
        let info = parse_select(&tree);
        debug!(mailbox = path, exists = info.exists, read_only = info.read_only, "mailbox selected");
        self.shared.emit(&Event::SelectMailbox {
            path: path.to_string(),
            info: info.clone(),
        });

        Ok(info)
    }

    /// Lists all mailboxes and subscriptions as a tree.
    ///
    /// LIST populates the tree; LSUB then marks subscribed nodes and merges
    /// their flags. Special-use roles are detected from flags first and
    /// localized names second.
    pub async fn list_mailboxes(&self) -> Result<MailboxNode> {
        let mut root = MailboxNode::root();

        let listed = self.execute(list_all("LIST"), &["LIST"]).await?;
        apply_list_records(&mut root, listed.records("LIST"), false, &self.config.special_use);

        let subscribed = self.execute(list_all("LSUB"), &["LSUB"]).await?;
        apply_list_records(&mut root, subscribed.records("LSUB"), true, &self.config.special_use);

        Ok(root)
    }

    /// Personal, other-user and shared namespaces, or `None` if the server
    /// lacks NAMESPACE support.
    pub async fn list_namespaces(&self) -> Result<Option<Namespaces>> {
        if !self.has_capability("NAMESPACE") {
            return Ok(None);
        }

        let tree = self.execute("NAMESPACE", &["NAMESPACE"]).await?;
        Ok(parse_namespace(&tree))
    }

    /// Creates a mailbox. Returns `true` if it already existed.
    pub async fn create_mailbox(&self, path: &str) -> Result<bool> {
        let command = Command::new("CREATE").arg(Attribute::string(encode_mailbox_name(path)));
        match self.execute(command, &[]).await {
            Ok(_) => Ok(false),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => Ok(true),
            Err(error) => Err(error),
        }
    }

    /// Deletes a mailbox.
    pub async fn delete_mailbox(&self, path: &str) -> Result<()> {
        let command = Command::new("DELETE").arg(Attribute::string(encode_mailbox_name(path)));
        self.execute(command, &[]).await?;
        Ok(())
    }

    /// Renames `from` to `to`.
    pub async fn rename_mailbox(&self, from: &str, to: &str) -> Result<()> {
        let command = Command::new("RENAME")
            .arg(Attribute::string(encode_mailbox_name(from)))
            .arg(Attribute::string(encode_mailbox_name(to)));
        self.execute(command, &[]).await?;
        Ok(())
    }
}
