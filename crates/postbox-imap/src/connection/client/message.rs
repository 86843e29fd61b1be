//! Message-level operations on the selected mailbox.

use super::Client;
use crate::codec::encode_mailbox_name;
use crate::command::{
    FetchOptions, SearchKey, SearchOptions, StoreAction, StoreOptions, build_fetch, build_search,
    build_store, flag_attribute,
};
use crate::parser::{FetchRecord, parse_fetch, parse_search};
use crate::syntax::{Attribute, Command};
use crate::Result;

/// How [`Client::set_flags`] changes the flag list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlagMode {
    /// Replace all flags.
    #[default]
    Set,
    /// Add to the existing flags.
    Add,
    /// Remove from the existing flags.
    Remove,
}

impl From<FlagMode> for StoreAction {
    fn from(mode: FlagMode) -> Self {
        match mode {
            FlagMode::Set => Self::SetFlags,
            FlagMode::Add => Self::AddFlags,
            FlagMode::Remove => Self::RemoveFlags,
        }
    }
}

/// Options for copy, move and delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageOptions {
    /// The sequence set holds UIDs.
    pub by_uid: bool,
}

impl Client {
    /// Fetches `items` for the messages in `sequence`.
    pub async fn list_messages(
        &self,
        sequence: &str,
        items: &[&str],
        options: &FetchOptions,
    ) -> Result<Vec<FetchRecord>> {
        let command = build_fetch(sequence, items, options)?;
        let tree = self.execute(command, &["FETCH"]).await?;
        Ok(parse_fetch(&tree))
    }

    /// Searches the selected mailbox. Results are sorted ascending.
    pub async fn search(&self, keys: &[SearchKey], options: &SearchOptions) -> Result<Vec<u32>> {
        let command = build_search(keys, options);
        let tree = self.execute(command, &["SEARCH"]).await?;
        Ok(parse_search(&tree))
    }

    /// Sets, adds or removes flags and returns the echoed FETCH records.
    pub async fn set_flags(
        &self,
        sequence: &str,
        mode: FlagMode,
        flags: &[&str],
        options: &StoreOptions,
    ) -> Result<Vec<FetchRecord>> {
        self.store(sequence, mode.into(), flags, options).await
    }

    /// Runs STORE with any action, Gmail labels included.
    ///
    /// With `options.silent` the server echoes nothing and the result is
    /// usually empty.
    pub async fn store(
        &self,
        sequence: &str,
        action: StoreAction,
        values: &[&str],
        options: &StoreOptions,
    ) -> Result<Vec<FetchRecord>> {
        let command = build_store(sequence, action, values, options);
        let tree = self.execute(command, &["FETCH"]).await?;
        Ok(parse_fetch(&tree))
    }

    /// Copies messages to `destination` and returns the server's text.
    pub async fn copy_messages(
        &self,
        sequence: &str,
        destination: &str,
        options: &MessageOptions,
    ) -> Result<String> {
        let name = if options.by_uid { "UID COPY" } else { "COPY" };
        let command = Command::new(name)
            .arg(Attribute::sequence(sequence))
            .arg(Attribute::string(encode_mailbox_name(destination)));
        let tree = self.execute(command, &[]).await?;
        Ok(tree
            .response
            .human_readable
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "COPY completed".to_string()))
    }

    /// Moves messages to `destination`.
    ///
    /// Uses MOVE when available, otherwise copies and then deletes the
    /// originals.
    pub async fn move_messages(
        &self,
        sequence: &str,
        destination: &str,
        options: &MessageOptions,
    ) -> Result<()> {
        if !self.has_capability("MOVE") {
            self.copy_messages(sequence, destination, options).await?;
            return self.delete_messages(sequence, options).await;
        }

        let name = if options.by_uid { "UID MOVE" } else { "MOVE" };
        let command = Command::new(name)
            .arg(Attribute::sequence(sequence))
            .arg(Attribute::string(encode_mailbox_name(destination)));
        self.execute(command, &["OK"]).await?;
        Ok(())
    }

    /// Flags messages `\Deleted` and expunges them.
    ///
    /// With UIDPLUS and `by_uid` only the given UIDs are expunged; otherwise
    /// a plain EXPUNGE also removes any other message already flagged.
    pub async fn delete_messages(&self, sequence: &str, options: &MessageOptions) -> Result<()> {
        let store = StoreOptions {
            by_uid: options.by_uid,
            silent: false,
        };
        self.store(sequence, StoreAction::AddFlags, &["\\Deleted"], &store)
            .await?;

        let command = if options.by_uid && self.has_capability("UIDPLUS") {
            Command::new("UID EXPUNGE").arg(Attribute::sequence(sequence))
        } else {
            Command::new("EXPUNGE")
        };
        self.execute(command, &[]).await?;
        Ok(())
    }

    /// Appends a message to `destination`.
    ///
    /// `flags` defaults to `\Seen`.
    pub async fn upload(
        &self,
        destination: &str,
        message: &[u8],
        flags: Option<&[&str]>,
    ) -> Result<()> {
        let flags = flags.unwrap_or(&["\\Seen"]);
        let command = Command::new("APPEND")
            .arg(Attribute::string(encode_mailbox_name(destination)))
            .arg(Attribute::List(flags.iter().map(|flag| flag_attribute(flag)).collect()))
            .arg(Attribute::Literal(message.to_vec()));
        self.execute(command, &[]).await?;
        Ok(())
    }
}
