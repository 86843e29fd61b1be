//! Command tags.
//!
//! Tags tie a tagged completion back to the command that produced it.

/// Sequential tag source: `A0000`, `A0001`, ...
///
/// Owned by the protocol core, so no synchronization is needed. The counter
/// wraps instead of failing; a wrapped tag can only collide with a command
/// four billion requests in the past.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator whose tags start with `prefix`.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Returns the next tag and advances the counter.
    pub fn next_tag(&mut self) -> String {
        let n = self.counter;
        self.counter = self.counter.wrapping_add(1);
        format!("{}{n:04}", self.prefix)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}
