//! Ingest queue
//!
//! Unbounded FIFO of frames that have arrived but are not yet reconciled.
//! Pushing never blocks and never drops; draining takes everything at once.

use crate::types::Frame;
use std::collections::VecDeque;

/// FIFO buffer between frame arrival and reconciliation
#[derive(Debug, Default)]
pub struct IngestQueue {
    frames: VecDeque<Frame>,
    total_pushed: u64,
}

impl IngestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame to the tail
    pub fn push(&mut self, frame: Frame) {
        self.frames.push_back(frame);
        self.total_pushed += 1;
    }

    /// Remove and return every queued frame in arrival order
    pub fn drain_all(&mut self) -> Vec<Frame> {
        Vec::from(std::mem::take(&mut self.frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames pushed over the lifetime of the queue
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }
}
