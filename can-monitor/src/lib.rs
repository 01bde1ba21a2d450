//! CAN Monitor Library
//!
//! Keeps a live table of CAN traffic up to date while frames stream in from a
//! remote bus, without letting the arrival rate dictate how often the table is
//! redrawn.
//!
//! # Architecture
//!
//! - Frames are appended to an unbounded ingest queue as they arrive
//! - A leading/trailing rate limiter decides when the queue is flushed
//! - Each flush reconciles the batch into the row table: one row per
//!   identity (coalescing mode) or one row per frame (log mode), each with the
//!   time since the previous frame of the same identity
//! - Observers are notified after every flush that changed the table
//!
//! The library does NOT:
//! - Decode payloads into signals
//! - Open network connections (sources hand events in)
//! - Persist anything between sessions
//!
//! # Example Usage
//!
//! ```
//! use can_monitor::{Frame, Monitor, MonitorConfig, SourceEvent, TableMode};
//! use std::time::Instant;
//!
//! let config = MonitorConfig::new().with_window_ms(100);
//! let mut monitor = Monitor::new(config).unwrap();
//! monitor.subscribe(|table| println!("{} rows", table.len()));
//!
//! let now = Instant::now();
//! monitor.handle_event(SourceEvent::Frame(Frame::new(0x123, 1.0)), now);
//! monitor.handle_event(SourceEvent::Frame(Frame::new(0x123, 1.5)), now);
//!
//! // The second frame waits for the trailing flush
//! monitor.flush();
//! assert_eq!(monitor.table().len(), 1);
//! assert_eq!(monitor.mode(), TableMode::Coalescing);
//! ```

// Public modules
pub mod config;
pub mod display;
pub mod monitor;
pub mod protocol;
pub mod queue;
pub mod reconciler;
pub mod table;
pub mod throttle;
pub mod types;

// Re-export main types for convenience
pub use config::MonitorConfig;
pub use display::TimeFormat;
pub use monitor::{ConnectionStatus, Monitor, MonitorStats, SourceEvent};
pub use protocol::RemoteEvent;
pub use queue::IngestQueue;
pub use reconciler::{Outcome, ReconcileStats, Reconciler};
pub use table::{RowTable, SortOrder, TableMode};
pub use throttle::{Decision, RateLimiter, ThrottleState};
pub use types::{Frame, IdentityKey, MonitorError, Result, Row, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
