//! Stream-to-table reconciliation
//!
//! Folds a batch of frames into the row table, one frame at a time and in
//! arrival order. Each frame is matched against existing rows by identity
//! key, gets its delta time, and then either replaces the matched row
//! (coalescing mode) or is appended (log mode, or first sight of an identity).

use crate::table::{RowTable, TableMode};
use crate::types::{Frame, Row};

/// What reconciling a single frame did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First frame of its identity, appended at the given index
    Inserted(usize),
    /// Coalesced into the existing row at the given index
    Replaced(usize),
    /// Known identity, appended as a new log row at the given index
    Appended(usize),
}

/// Counters for one reconciled batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub frames: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub appended: usize,
}

impl ReconcileStats {
    fn record(&mut self, outcome: Outcome) {
        self.frames += 1;
        match outcome {
            Outcome::Inserted(_) => self.inserted += 1,
            Outcome::Replaced(_) => self.replaced += 1,
            Outcome::Appended(_) => self.appended += 1,
        }
    }
}

/// Reconciler - merges frames into a row table
pub struct Reconciler;

impl Reconciler {
    /// Reconcile a batch of frames into the table
    ///
    /// # Arguments
    /// * `table` - Row table to update in place
    /// * `frames` - Frames in arrival order
    /// * `mode` - Table mode applied to every frame of the batch
    ///
    /// # Returns
    /// * `ReconcileStats` - How many frames were inserted, replaced or appended
    pub fn reconcile<I>(table: &mut RowTable, frames: I, mode: TableMode) -> ReconcileStats
    where
        I: IntoIterator<Item = Frame>,
    {
        let mut stats = ReconcileStats::default();
        for frame in frames {
            stats.record(Self::reconcile_frame(table, frame, mode));
        }
        stats
    }

    /// Reconcile a single frame into the table
    pub fn reconcile_frame(table: &mut RowTable, frame: Frame, mode: TableMode) -> Outcome {
        let key = frame.identity_key();

        match table.find_latest(&key) {
            Some(index) => {
                let delta_time = frame.timestamp - table.rows()[index].timestamp();
                log::trace!("{} matched row {} (dt {:.6}s)", key, index, delta_time);
                let row = Row::new(frame, delta_time);
                match mode {
                    TableMode::Log => Outcome::Appended(table.push(row)),
                    TableMode::Coalescing => {
                        table.replace(index, row);
                        Outcome::Replaced(index)
                    }
                }
            }
            None => {
                log::trace!("{} first seen", key);
                Outcome::Inserted(table.push(Row::new(frame, 0.0)))
            }
        }
    }
}
