//! Ordered header storage.
//!
//! Header names can legally repeat (multiple `Received` headers), so headers
//! are kept as an ordered list of pairs instead of an overwrite-on-duplicate
//! map. Lookup by name is case-insensitive and returns the first match.

use serde::{Deserialize, Serialize};

/// Ordered `(name, value)` header pairs for one MIME part.
///
/// Names keep the case they had on the wire; values are stored trimmed but
/// otherwise unparsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, preserving document order and duplicates.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`, compared ASCII-case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in document order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over all `(name, value)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of stored headers, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no headers were parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mutable access to the last value, used when merging folded
    /// continuation lines.
    pub(crate) fn last_value_mut(&mut self) -> Option<&mut String> {
        self.entries.last_mut().map(|(_, v)| v)
    }
}
