use std::collections::VecDeque;
use std::fmt;

pub const HIST_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: u64,
    pub line: String,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.line)
    }
}

/// Bounded log of executed command lines, oldest first.
///
/// Ids come from the caller's command counter and may have gaps; once the
/// store is full each append evicts the oldest entry.
#[derive(Debug)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_capacity(HIST_MAX)
    }
}

impl HistoryStore {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `line` under `id`. Empty lines are ignored; returns whether
    /// anything was stored.
    pub fn append(&mut self, id: u64, line: &str) -> bool {
        if line.is_empty() {
            return false;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            id,
            line: line.to_string(),
        });
        true
    }

    /// Entry with this id, if it is still retained.
    pub fn get_by_id(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Most recent entry whose line starts with `prefix`.
    pub fn get_by_prefix(&self, prefix: &str) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| strip_terminators(&entry.line).starts_with(prefix))
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn strip_terminators(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
