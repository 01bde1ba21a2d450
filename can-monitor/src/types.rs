//! Core types for the CAN monitor library
//!
//! This module defines the frame and row model shared by the queue, the
//! reconciler and the row table. Frames are what an event source delivers;
//! rows are what the table holds once a frame has been reconciled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock timestamp type used for display
pub type Timestamp = DateTime<Utc>;

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors surfaced by the monitor library
///
/// The reconcile path itself is infallible; these errors come from the wire
/// protocol, the transport, and configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Key that decides whether two frames come from the same logical source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub arbitration_id: u32,
    pub is_extended: bool,
    pub is_error_frame: bool,
    pub is_remote_frame: bool,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended {
            write!(f, "0x{:08X}", self.arbitration_id)?;
        } else {
            write!(f, "0x{:03X}", self.arbitration_id)?;
        }
        if self.is_remote_frame {
            write!(f, " (remote)")?;
        }
        if self.is_error_frame {
            write!(f, " (error)")?;
        }
        Ok(())
    }
}

/// A CAN frame as delivered by an event source
///
/// Field names on the wire follow the remote protocol's message payload, so
/// a `message` event payload deserializes straight into a `Frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Timestamp in seconds (wall clock or monotonic, source-defined)
    #[serde(default)]
    pub timestamp: f64,
    /// CAN message ID (11-bit or 29-bit)
    pub arbitration_id: u32,
    /// True if this is an extended (29-bit) CAN ID
    #[serde(default, rename = "extended_id")]
    pub is_extended: bool,
    /// True if this is a remote frame
    #[serde(default)]
    pub is_remote_frame: bool,
    /// True if this is an error frame
    #[serde(default)]
    pub is_error_frame: bool,
    /// Declared data length code, independent of the payload length
    #[serde(default)]
    pub dlc: Option<u8>,
    /// Payload bytes (empty for remote and error frames)
    #[serde(default)]
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a standard data frame with an empty payload
    pub fn new(arbitration_id: u32, timestamp: f64) -> Self {
        Self {
            timestamp,
            arbitration_id,
            is_extended: false,
            is_remote_frame: false,
            is_error_frame: false,
            dlc: None,
            data: Vec::new(),
        }
    }

    /// Builder method: set the payload
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Builder method: set the declared DLC
    pub fn with_dlc(mut self, dlc: u8) -> Self {
        self.dlc = Some(dlc);
        self
    }

    /// Builder method: mark as extended (29-bit) ID
    pub fn extended(mut self) -> Self {
        self.is_extended = true;
        self
    }

    /// Builder method: mark as remote frame
    pub fn remote(mut self) -> Self {
        self.is_remote_frame = true;
        self
    }

    /// Builder method: mark as error frame
    pub fn error_frame(mut self) -> Self {
        self.is_error_frame = true;
        self
    }

    /// Identity of the logical source this frame belongs to
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            arbitration_id: self.arbitration_id,
            is_extended: self.is_extended,
            is_error_frame: self.is_error_frame,
            is_remote_frame: self.is_remote_frame,
        }
    }

    /// Declared DLC, falling back to the payload length
    pub fn effective_dlc(&self) -> usize {
        self.dlc.map(usize::from).unwrap_or(self.data.len())
    }

    /// Interpret the timestamp as seconds since the Unix epoch
    ///
    /// Returns `None` for negative, non-finite or out-of-range values.
    pub fn wall_clock(&self) -> Option<Timestamp> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return None;
        }
        let secs = self.timestamp.trunc() as i64;
        let nsecs = ((self.timestamp.fract() * 1e9).round() as u32).min(999_999_999);
        DateTime::from_timestamp(secs, nsecs)
    }
}

/// A table entry: the most recent frame for a row plus its delta time
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Frame that produced this row
    pub frame: Frame,
    /// Seconds since the previous frame with the same identity (0 on first sight)
    pub delta_time: f64,
}

impl Row {
    pub fn new(frame: Frame, delta_time: f64) -> Self {
        Self { frame, delta_time }
    }

    pub fn identity_key(&self) -> IdentityKey {
        self.frame.identity_key()
    }

    pub fn timestamp(&self) -> f64 {
        self.frame.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_distinguishes_flags() {
        let data = Frame::new(0x123, 0.0);
        let remote = Frame::new(0x123, 0.0).remote();
        let extended = Frame::new(0x123, 0.0).extended();
        let error = Frame::new(0x123, 0.0).error_frame();

        assert_ne!(data.identity_key(), remote.identity_key());
        assert_ne!(data.identity_key(), extended.identity_key());
        assert_ne!(data.identity_key(), error.identity_key());
        assert_eq!(
            data.identity_key(),
            Frame::new(0x123, 9.0).with_data(vec![1, 2]).identity_key()
        );
    }

    #[test]
    fn test_identity_key_display() {
        assert_eq!(Frame::new(0x12, 0.0).identity_key().to_string(), "0x012");
        assert_eq!(
            Frame::new(0xABCDEF, 0.0).extended().identity_key().to_string(),
            "0x00ABCDEF"
        );
        assert_eq!(
            Frame::new(0x6EF, 0.0).remote().identity_key().to_string(),
            "0x6EF (remote)"
        );
    }

    #[test]
    fn test_effective_dlc() {
        assert_eq!(Frame::new(1, 0.0).with_data(vec![1, 2, 3]).effective_dlc(), 3);
        assert_eq!(Frame::new(1, 0.0).remote().with_dlc(8).effective_dlc(), 8);
    }

    #[test]
    fn test_wall_clock() {
        let frame = Frame::new(1, 1_500_000_000.25);
        let ts = frame.wall_clock().unwrap();
        assert_eq!(ts.timestamp(), 1_500_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 250);

        assert!(Frame::new(1, -1.0).wall_clock().is_none());
        assert!(Frame::new(1, f64::NAN).wall_clock().is_none());
    }

    #[test]
    fn test_frame_deserializes_from_message_payload() {
        let frame: Frame = serde_json::from_str(
            r#"{"timestamp": 1.5, "arbitration_id": 291, "extended_id": true, "dlc": 3, "data": [255, 254, 253]}"#,
        )
        .unwrap();
        assert_eq!(frame.arbitration_id, 0x123);
        assert!(frame.is_extended);
        assert!(!frame.is_remote_frame);
        assert_eq!(frame.dlc, Some(3));
        assert_eq!(frame.data, vec![0xFF, 0xFE, 0xFD]);
    }
}
