//! Monitor configuration types
//!
//! Controls the update window of the rate limiter, the initial table mode and
//! how the session reacts to connection lifecycle signals.

use crate::table::TableMode;
use crate::types::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a monitor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Length of the rate limiter window in milliseconds (default: 100ms)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Run the first flush of an idle period immediately
    #[serde(default = "default_true")]
    pub leading: bool,

    /// Run one more flush at window close if frames arrived during the window
    #[serde(default = "default_true")]
    pub trailing: bool,

    /// Initial table mode
    #[serde(default)]
    pub mode: TableMode,

    /// Drop all rows when the source disconnects
    #[serde(default)]
    pub clear_on_disconnect: bool,

    /// Drop all rows when a (new) connection is established
    #[serde(default = "default_true")]
    pub clear_on_connect: bool,
}

fn default_window_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            leading: true,
            trailing: true,
            mode: TableMode::default(),
            clear_on_disconnect: false,
            clear_on_connect: true,
        }
    }
}

impl MonitorConfig {
    /// Create a new monitor configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the rate limiter window
    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Builder method: enable or disable leading-edge flushes
    pub fn with_leading(mut self, enabled: bool) -> Self {
        self.leading = enabled;
        self
    }

    /// Builder method: enable or disable trailing-edge flushes
    pub fn with_trailing(mut self, enabled: bool) -> Self {
        self.trailing = enabled;
        self
    }

    /// Builder method: set the initial table mode
    pub fn with_mode(mut self, mode: TableMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method: clear rows on disconnect
    pub fn with_clear_on_disconnect(mut self, enabled: bool) -> Self {
        self.clear_on_disconnect = enabled;
        self
    }

    /// Builder method: clear rows on connect
    pub fn with_clear_on_connect(mut self, enabled: bool) -> Self {
        self.clear_on_connect = enabled;
        self
    }

    /// Rate limiter window as a `Duration`
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Reject configurations the rate limiter cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "window_ms must be greater than zero".to_string(),
            ));
        }
        if !self.leading && !self.trailing {
            return Err(MonitorError::InvalidConfig(
                "at least one of leading or trailing must be enabled".to_string(),
            ));
        }
        Ok(())
    }
}
