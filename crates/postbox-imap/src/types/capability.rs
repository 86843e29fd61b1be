//! Server capability set.

use std::collections::BTreeSet;

use crate::syntax::Attribute;

/// Capabilities advertised by the server, stored upper-cased.
///
/// Empty until the first `CAPABILITY` response or response code arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    tokens: BTreeSet<String>,
}

impl CapabilitySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive membership test. The empty token is never present.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        !token.is_empty() && self.tokens.contains(&token.to_ascii_uppercase())
    }

    /// Replaces the whole set.
    pub fn replace<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tokens = tokens
            .into_iter()
            .map(|token| token.as_ref().trim().to_ascii_uppercase())
            .filter(|token| !token.is_empty())
            .collect();
    }

    /// Replaces the set from response attributes, ignoring non-text values.
    pub fn replace_from_attributes(&mut self, attributes: &[Attribute]) {
        self.replace(attributes.iter().filter_map(Attribute::to_text));
    }

    /// Forgets all capabilities.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// No capabilities known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Iterates the tokens in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.replace(iter);
        set
    }
}
