//! Formatting helpers for presenting rows
//!
//! These are shared by renderers and never influence reconciliation.

use crate::types::{Frame, Row};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// What the time column shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// Seconds since the previous frame of the same identity
    #[default]
    Delta,
    /// Absolute frame timestamp as UTC date and time
    Absolute,
}

/// Format payload bytes as uppercase hex pairs separated by spaces
pub fn format_data(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Writing into a String cannot fail
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

/// Format the arbitration ID, padded to 3 digits (standard) or 8 (extended)
pub fn format_id(frame: &Frame) -> String {
    if frame.is_extended {
        format!("{:08X}", frame.arbitration_id)
    } else {
        format!("{:03X}", frame.arbitration_id)
    }
}

/// Short flag column: `X` extended, `R` remote, `E` error
pub fn format_flags(frame: &Frame) -> String {
    let mut flags = String::new();
    if frame.is_extended {
        flags.push('X');
    }
    if frame.is_remote_frame {
        flags.push('R');
    }
    if frame.is_error_frame {
        flags.push('E');
    }
    flags
}

/// Format the time column of a row
pub fn format_time(row: &Row, format: TimeFormat) -> String {
    match format {
        TimeFormat::Delta => format!("{:.4}", row.delta_time),
        TimeFormat::Absolute => match row.frame.wall_clock() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            None => format!("{:.4}", row.timestamp()),
        },
    }
}
