//! Ordered argument storage
//!
//! Entries are located by their flag token with a linear scan, never by a
//! remembered index, since earlier removals and insertions shift positions.

use std::fmt;

/// One argument: a flag token and an optional, already-quoted value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgEntry {
    flag: String,
    value: Option<String>,
}

impl ArgEntry {
    /// Create an entry; the value is stored exactly as given
    pub fn new(flag: impl Into<String>, value: Option<String>) -> Self {
        Self {
            flag: flag.into(),
            value,
        }
    }

    /// Flag token, fixed once the entry exists
    pub fn flag(&self) -> &str {
        &self.flag
    }

    /// Stored value including any quotes
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn matches(&self, token: &str) -> bool {
        self.flag == token
    }
}

impl fmt::Display for ArgEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {}", self.flag, value),
            None => f.write_str(&self.flag),
        }
    }
}

/// Where to place an entry relative to an existing anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Before(String),
    After(String),
}

impl Position {
    /// Logical name of the anchor
    pub fn anchor(&self) -> &str {
        match self {
            Self::Before(name) | Self::After(name) => name,
        }
    }
}

/// Ordered list of arguments owned by a single command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList {
    entries: Vec<ArgEntry>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at the end
    pub fn push(&mut self, entry: ArgEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Insert next to the first entry whose flag equals `anchor`.
    ///
    /// Returns the index of the new entry, or `None` when no anchor exists,
    /// in which case the list is left untouched.
    pub fn insert_at(&mut self, entry: ArgEntry, anchor: &str, after: bool) -> Option<usize> {
        let index = self.position(anchor)? + usize::from(after);
        self.entries.insert(index, entry);
        Some(index)
    }

    /// Remove the first entry whose flag equals `token`
    pub fn dedupe(&mut self, token: &str) -> Option<ArgEntry> {
        let index = self.position(token)?;
        Some(self.entries.remove(index))
    }

    /// Remove every entry whose flag equals `token`, returning how many went
    pub fn remove_all(&mut self, token: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.matches(token));
        before - self.entries.len()
    }

    /// Index of the first entry whose flag equals `token`
    pub fn position(&self, token: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.matches(token))
    }

    /// First entry whose flag equals `token`
    pub fn find(&self, token: &str) -> Option<&ArgEntry> {
        self.entries.iter().find(|entry| entry.matches(token))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.position(token).is_some()
    }

    pub(crate) fn remove_index(&mut self, index: usize) -> ArgEntry {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArgEntry> {
        self.entries.iter()
    }

    /// All tokens, flags and values flattened in order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|entry| std::iter::once(entry.flag()).chain(entry.value()))
    }

    /// Space-joined tokens, or `None` for an empty list
    pub fn render(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.tokens().collect::<Vec<_>>().join(" "))
    }
}
