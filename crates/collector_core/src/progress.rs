use std::collections::HashSet;

use crate::WorkId;

/// Identifiers already present in the output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSet<I: WorkId> {
    done: HashSet<I>,
}

impl<I: WorkId> Default for ProgressSet<I> {
    fn default() -> Self {
        Self {
            done: HashSet::new(),
        }
    }
}

impl<I: WorkId> ProgressSet<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &I) -> bool {
        self.done.contains(id)
    }

    /// Returns `true` if the id was not yet recorded.
    pub fn insert(&mut self, id: I) -> bool {
        self.done.insert(id)
    }

    /// Parses a raw identifier cell and records it. Cells that do not parse
    /// are ignored so the item is retried later.
    pub fn insert_raw(&mut self, raw: &str) -> bool {
        match raw.trim().parse::<I>() {
            Ok(id) => {
                self.done.insert(id);
                true
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}

impl<I: WorkId> FromIterator<I> for ProgressSet<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self {
            done: iter.into_iter().collect(),
        }
    }
}
