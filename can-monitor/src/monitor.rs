//! Monitor session
//!
//! Owns the ingest queue, the row table and the rate limiter, and reacts to
//! event source signals. Frames are queued on arrival and a flush is
//! requested from the limiter; every granted flush drains the queue,
//! reconciles the batch and publishes the table to subscribed observers.
//!
//! The monitor is a single writer: all mutation happens through `&mut self`
//! on one thread. Sources running elsewhere hand their events over a channel.

use crate::config::MonitorConfig;
use crate::queue::IngestQueue;
use crate::reconciler::{ReconcileStats, Reconciler};
use crate::table::{RowTable, SortOrder, TableMode};
use crate::throttle::{Decision, RateLimiter};
use crate::types::{Frame, Result, Row};
use std::fmt;
use std::time::Instant;

/// Signals emitted by an event source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Connection established; `channel_info` describes the remote bus
    Connected { channel_info: String },
    /// A frame arrived
    Frame(Frame),
    /// The transport reported an error
    Error(String),
    /// The connection closed
    Disconnected,
}

/// Connection status shown alongside the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected {
        channel_info: String,
    },
    Failed {
        error: String,
    },
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connected { channel_info } => {
                write!(f, "Connected to {}", channel_info)
            }
            ConnectionStatus::Failed { error } => write!(f, "Error: {}", error),
        }
    }
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Frames accepted into the queue
    pub frames_received: u64,
    /// Frames refused while the transport is in an error state
    pub frames_rejected: u64,
    /// Frames folded into the table
    pub frames_reconciled: u64,
    /// Non-empty flushes
    pub flushes: u64,
}

type Observer = Box<dyn FnMut(&RowTable)>;

/// Live monitor session
pub struct Monitor {
    config: MonitorConfig,
    queue: IngestQueue,
    table: RowTable,
    limiter: RateLimiter,
    mode: TableMode,
    status: ConnectionStatus,
    observers: Vec<Observer>,
    stats: MonitorStats,
    /// Rejection already reported for the current error episode
    rejection_logged: bool,
}

impl Monitor {
    /// Create a monitor session from a validated configuration
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "Monitor created (window {}ms, mode {})",
            config.window_ms,
            config.mode
        );
        Ok(Self {
            queue: IngestQueue::new(),
            table: RowTable::new(),
            limiter: RateLimiter::from_config(&config),
            mode: config.mode,
            status: ConnectionStatus::default(),
            observers: Vec::new(),
            stats: MonitorStats::default(),
            rejection_logged: false,
            config,
        })
    }

    /// Register an observer called with the table after every publish
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&RowTable) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Dispatch an event source signal
    pub fn handle_event(&mut self, event: SourceEvent, now: Instant) {
        match event {
            SourceEvent::Connected { channel_info } => self.on_connected(channel_info),
            SourceEvent::Frame(frame) => self.push_frame(frame, now),
            SourceEvent::Error(error) => self.on_error(error),
            SourceEvent::Disconnected => self.on_disconnected(),
        }
    }

    /// Queue a frame and request a rate-limited flush
    pub fn push_frame(&mut self, frame: Frame, now: Instant) {
        if matches!(self.status, ConnectionStatus::Failed { .. }) {
            if !self.rejection_logged {
                log::warn!("Transport in error state, ignoring incoming frames");
                self.rejection_logged = true;
            }
            self.stats.frames_rejected += 1;
            return;
        }

        self.queue.push(frame);
        self.stats.frames_received += 1;

        if self.limiter.request(now) == Decision::RunNow {
            self.flush();
        }
    }

    /// Run a trailing flush if one is due at `now`
    ///
    /// Returns `true` if a flush ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.limiter.poll(now) {
            self.flush();
            true
        } else {
            false
        }
    }

    /// Instant at which [`Monitor::poll`] should next be called
    pub fn next_deadline(&self) -> Option<Instant> {
        self.limiter.deadline()
    }

    /// Drain the queue, reconcile and publish
    ///
    /// Bypasses the rate limiter. Flushing an empty queue is a no-op and does
    /// not notify observers.
    pub fn flush(&mut self) -> ReconcileStats {
        let batch = self.queue.drain_all();
        if batch.is_empty() {
            return ReconcileStats::default();
        }

        let stats = Reconciler::reconcile(&mut self.table, batch, self.mode);
        self.stats.frames_reconciled += stats.frames as u64;
        self.stats.flushes += 1;
        log::debug!(
            "Flushed {} frames ({} new, {} replaced, {} appended), {} rows",
            stats.frames,
            stats.inserted,
            stats.replaced,
            stats.appended,
            self.table.len()
        );

        self.publish();
        stats
    }

    /// Remove all rows and the recorded transport error
    ///
    /// Frames still waiting in the queue are kept and show up with the next
    /// flush as first occurrences.
    pub fn clear(&mut self) {
        log::info!("Clearing {} rows", self.table.len());
        self.table.clear();
        if matches!(self.status, ConnectionStatus::Failed { .. }) {
            self.status = ConnectionStatus::Disconnected;
        }
        self.publish();
    }

    /// Switch table mode for frames reconciled from now on
    pub fn set_mode(&mut self, mode: TableMode) {
        if mode != self.mode {
            log::info!("Table mode: {} -> {}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> TableMode {
        self.mode
    }

    pub fn table(&self) -> &RowTable {
        &self.table
    }

    /// Rows in display order; the table itself is not reordered
    pub fn snapshot(&self, order: SortOrder) -> Vec<&Row> {
        self.table.snapshot(order)
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Frames waiting for the next flush
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn on_connected(&mut self, channel_info: String) {
        // Same connection, the server only described its bus
        if matches!(self.status, ConnectionStatus::Connected { .. }) {
            log::info!("Channel info: {}", channel_info);
            self.status = ConnectionStatus::Connected { channel_info };
            return;
        }

        log::info!("Connected to {}", channel_info);
        if self.config.clear_on_connect {
            self.clear();
        }
        self.rejection_logged = false;
        self.status = ConnectionStatus::Connected { channel_info };
    }

    fn on_error(&mut self, error: String) {
        log::warn!("Transport error: {}", error);
        self.status = ConnectionStatus::Failed { error };
    }

    fn on_disconnected(&mut self) {
        log::info!("Disconnected");
        // Publish what arrived before the close, then drop the trailing run
        self.flush();
        self.limiter.cancel();
        if self.config.clear_on_disconnect {
            self.clear();
        }
        // A transport error stays visible after the connection closes
        if !matches!(self.status, ConnectionStatus::Failed { .. }) {
            self.status = ConnectionStatus::Disconnected;
        }
    }

    fn publish(&mut self) {
        for observer in &mut self.observers {
            observer(&self.table);
        }
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("rows", &self.table.len())
            .field("pending", &self.queue.len())
            .field("observers", &self.observers.len())
            .field("stats", &self.stats)
            .finish()
    }
}
