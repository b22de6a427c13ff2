//! Shared, ordered record of what test handlers did.

use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

/// An append-only list of entries shared between a test and the doubles it
/// creates. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl InvocationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `"{who}: {what}"`.
    pub fn record(&self, who: &str, what: impl Display) {
        self.push(format!("{who}: {what}"));
    }

    /// Appends an entry verbatim.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// A snapshot of all entries in the order they were appended.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
