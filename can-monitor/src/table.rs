//! Row table
//!
//! The observable state of the monitor: an ordered sequence of rows. Row order
//! is first-seen order per identity in coalescing mode and arrival order in
//! log mode. Sorting for display works on a snapshot and never reorders the
//! table itself.

use crate::types::{IdentityKey, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How new frames for an already-seen identity are folded into the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    /// One live row per identity, overwritten in place
    #[default]
    Coalescing,
    /// One row per frame
    Log,
}

impl fmt::Display for TableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableMode::Coalescing => write!(f, "coalescing"),
            TableMode::Log => write!(f, "log"),
        }
    }
}

/// Display order for table snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Table order
    #[default]
    None,
    /// Ascending timestamp
    Time,
    /// Ascending arbitration ID
    Id,
}

/// Ordered sequence of rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowTable {
    rows: Vec<Row>,
}

impl RowTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the most recently appended row with the given identity
    ///
    /// Scans from the tail towards the head; the first match wins.
    pub fn find_latest(&self, key: &IdentityKey) -> Option<usize> {
        self.rows.iter().rposition(|row| row.identity_key() == *key)
    }

    /// Append a row at the end and return its index
    pub fn push(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Overwrite the row at `index`, keeping its position
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn replace(&mut self, index: usize, row: Row) {
        self.rows[index] = row;
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Snapshot of the rows ordered by ascending timestamp (stable)
    pub fn sorted_by_time(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
        rows
    }

    /// Snapshot of the rows ordered by ascending arbitration ID (stable)
    pub fn sorted_by_id(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.rows.iter().collect();
        rows.sort_by_key(|row| row.frame.arbitration_id);
        rows
    }

    /// Snapshot of the rows in the requested display order
    pub fn snapshot(&self, order: SortOrder) -> Vec<&Row> {
        match order {
            SortOrder::None => self.rows.iter().collect(),
            SortOrder::Time => self.sorted_by_time(),
            SortOrder::Id => self.sorted_by_id(),
        }
    }
}

impl<'a> IntoIterator for &'a RowTable {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
