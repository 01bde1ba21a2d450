//! Leading/trailing rate limiter
//!
//! Gates the flush action so it runs at most once per window plus one
//! trailing run at window close. The limiter never sleeps or spawns timers:
//! callers pass the current `Instant` in, ask for the next deadline, and call
//! [`RateLimiter::poll`] when it passes.
//!
//! ```text
//!          request (leading)              request
//!   Idle ─────────────────► WindowOpen ─────────► PendingTrailing
//!    ▲                          │  ▲                    │
//!    └──── window expired ──────┘  └── window expired ──┘
//!                                      (trailing run)
//! ```

use crate::config::MonitorConfig;
use std::time::{Duration, Instant};

/// Limiter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    /// No window open; the next request may run immediately
    Idle,
    /// A run happened; requests until `closes_at` are coalesced
    WindowOpen { closes_at: Instant },
    /// Requests arrived during the window; one run is owed at `closes_at`
    PendingTrailing { closes_at: Instant },
}

/// Result of requesting a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run the action now
    RunNow,
    /// A trailing run is scheduled for window close
    Scheduled,
    /// Window is open and trailing runs are disabled
    Suppressed,
}

/// Timer-and-flag rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Duration,
    leading: bool,
    trailing: bool,
    state: ThrottleState,
    runs: u64,
}

impl RateLimiter {
    /// Create a limiter with leading and trailing runs enabled
    pub fn new(window: Duration) -> Self {
        Self::with_edges(window, true, true)
    }

    /// Create a limiter with explicit edge settings
    pub fn with_edges(window: Duration, leading: bool, trailing: bool) -> Self {
        Self {
            window,
            leading,
            trailing,
            state: ThrottleState::Idle,
            runs: 0,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::with_edges(config.window(), config.leading, config.trailing)
    }

    /// Ask to run the action at `now`
    ///
    /// Returns [`Decision::RunNow`] when the caller must run the action
    /// immediately. An overdue trailing run is folded into this request.
    pub fn request(&mut self, now: Instant) -> Decision {
        match self.state {
            ThrottleState::WindowOpen { closes_at } if now >= closes_at => {
                self.state = ThrottleState::Idle;
            }
            ThrottleState::PendingTrailing { closes_at } if now >= closes_at => {
                return self.run(now);
            }
            _ => {}
        }

        match self.state {
            ThrottleState::Idle if self.leading => self.run(now),
            ThrottleState::Idle => {
                self.state = ThrottleState::PendingTrailing {
                    closes_at: now + self.window,
                };
                Decision::Scheduled
            }
            ThrottleState::WindowOpen { closes_at } if self.trailing => {
                self.state = ThrottleState::PendingTrailing { closes_at };
                Decision::Scheduled
            }
            ThrottleState::WindowOpen { .. } => Decision::Suppressed,
            ThrottleState::PendingTrailing { .. } => Decision::Scheduled,
        }
    }

    /// Advance the timer to `now`
    ///
    /// Returns `true` when a trailing run is due and the caller must run the
    /// action. The trailing run opens a fresh window.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            ThrottleState::WindowOpen { closes_at } if now >= closes_at => {
                self.state = ThrottleState::Idle;
                false
            }
            ThrottleState::PendingTrailing { closes_at } if now >= closes_at => {
                self.run(now);
                true
            }
            _ => false,
        }
    }

    /// Instant at which a pending trailing run becomes due
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            ThrottleState::PendingTrailing { closes_at } => Some(closes_at),
            _ => None,
        }
    }

    /// Drop any pending trailing run and return to idle
    pub fn cancel(&mut self) {
        if self.deadline().is_some() {
            log::debug!("Discarding pending trailing flush");
        }
        self.state = ThrottleState::Idle;
    }

    pub fn state(&self) -> ThrottleState {
        self.state
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of runs granted so far
    pub fn runs(&self) -> u64 {
        self.runs
    }

    fn run(&mut self, now: Instant) -> Decision {
        self.state = ThrottleState::WindowOpen {
            closes_at: now + self.window,
        };
        self.runs += 1;
        Decision::RunNow
    }
}
