//! Remote CAN protocol codec
//!
//! Decodes the events a remote bus server sends to its clients. Two
//! encodings exist on the same connection:
//!
//! ## JSON text events
//! `{"type": <string>, "payload": <value>}` with types `message`,
//! `bus_response` and `error`.
//!
//! ## Binary frames
//! | Byte   | Type | Contents                                  |
//! |--------|------|-------------------------------------------|
//! | 0      | U8   | Message type (1 = CAN frame)              |
//! | 1 - 8  | F64  | Timestamp in seconds (big-endian)         |
//! | 9 - 12 | U32  | Arbitration ID (big-endian)               |
//! | 13     | U8   | DLC                                       |
//! | 14     | U8   | Flags: 0x1 extended, 0x2 remote, 0x4 error|
//! | 15 ..  | U8[] | Data                                      |

use crate::monitor::SourceEvent;
use crate::types::{Frame, MonitorError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde_json::{json, Value};
use std::io::Cursor;

/// Binary message type for CAN frames
pub const BINARY_MESSAGE_TYPE: u8 = 1;

/// Size of the binary header including the message type byte
pub const BINARY_HEADER_LEN: usize = 15;

const FLAG_EXTENDED: u8 = 0x1;
const FLAG_REMOTE: u8 = 0x2;
const FLAG_ERROR: u8 = 0x4;

/// A decoded server event
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// A CAN frame
    Message(Frame),
    /// Reply to the client's bus request
    BusResponse { channel_info: String },
    /// Error reported by the server
    Error(String),
    /// Any other event type (e.g. periodic task acknowledgements)
    Other(String),
}

impl RemoteEvent {
    /// Map to the monitor's event source signal
    ///
    /// `endpoint` is appended to the server's channel info, giving e.g.
    /// `"virtual channel 0 on ws://localhost:54701/"`. Unknown event types
    /// have no counterpart and map to `None`.
    pub fn into_source_event(self, endpoint: &str) -> Option<SourceEvent> {
        match self {
            RemoteEvent::Message(frame) => Some(SourceEvent::Frame(frame)),
            RemoteEvent::BusResponse { channel_info } => Some(SourceEvent::Connected {
                channel_info: format!("{} on {}", channel_info, endpoint),
            }),
            RemoteEvent::Error(error) => Some(SourceEvent::Error(error)),
            RemoteEvent::Other(event_type) => {
                log::debug!("Ignoring remote event of type '{}'", event_type);
                None
            }
        }
    }
}

/// Decode a JSON text event
pub fn decode_text(text: &str) -> Result<RemoteEvent> {
    let mut event: Value = serde_json::from_str(text)?;
    let object = event
        .as_object_mut()
        .ok_or_else(|| MonitorError::Protocol("Message is not a dictionary".to_string()))?;

    let event_type = match object.get("type") {
        Some(Value::String(event_type)) => event_type.clone(),
        Some(_) => {
            return Err(MonitorError::Protocol(
                "Message 'type' must be a string".to_string(),
            ))
        }
        None => {
            return Err(MonitorError::Protocol(
                "Message must contain a 'type' key".to_string(),
            ))
        }
    };
    let payload = object.remove("payload").unwrap_or(Value::Null);

    match event_type.as_str() {
        "message" => Ok(RemoteEvent::Message(serde_json::from_value(payload)?)),
        "bus_response" => {
            let channel_info = payload
                .get("channel_info")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    MonitorError::Protocol("bus_response without channel_info".to_string())
                })?;
            Ok(RemoteEvent::BusResponse {
                channel_info: channel_info.to_string(),
            })
        }
        "error" => Ok(RemoteEvent::Error(match payload {
            Value::String(error) => error,
            other => other.to_string(),
        })),
        _ => Ok(RemoteEvent::Other(event_type)),
    }
}

/// Decode a binary event
///
/// Returns `Ok(None)` for message types other than CAN frames.
pub fn decode_binary(buf: &[u8]) -> Result<Option<Frame>> {
    let Some(&message_type) = buf.first() else {
        return Err(MonitorError::Protocol("Empty binary message".to_string()));
    };
    if message_type != BINARY_MESSAGE_TYPE {
        log::trace!("Skipping binary message type {}", message_type);
        return Ok(None);
    }
    if buf.len() < BINARY_HEADER_LEN {
        return Err(MonitorError::Protocol(format!(
            "Binary frame too short: {} bytes, need at least {}",
            buf.len(),
            BINARY_HEADER_LEN
        )));
    }

    let mut cursor = Cursor::new(&buf[1..BINARY_HEADER_LEN]);
    let timestamp = cursor.read_f64::<BigEndian>()?;
    let arbitration_id = cursor.read_u32::<BigEndian>()?;
    let dlc = cursor.read_u8()?;
    let flags = cursor.read_u8()?;

    Ok(Some(Frame {
        timestamp,
        arbitration_id,
        is_extended: flags & FLAG_EXTENDED != 0,
        is_remote_frame: flags & FLAG_REMOTE != 0,
        is_error_frame: flags & FLAG_ERROR != 0,
        dlc: Some(dlc),
        data: buf[BINARY_HEADER_LEN..].to_vec(),
    }))
}

/// Encode a frame as a JSON `message` event
pub fn encode_json(frame: &Frame) -> Result<String> {
    let event = json!({
        "type": "message",
        "payload": {
            "timestamp": frame.timestamp,
            "arbitration_id": frame.arbitration_id,
            "extended_id": frame.is_extended,
            "is_remote_frame": frame.is_remote_frame,
            "is_error_frame": frame.is_error_frame,
            "dlc": frame.effective_dlc(),
            "data": frame.data,
        }
    });
    Ok(serde_json::to_string(&event)?)
}

/// Encode a frame as a binary event
pub fn encode_binary(frame: &Frame) -> Result<Vec<u8>> {
    let mut flags = 0u8;
    if frame.is_extended {
        flags |= FLAG_EXTENDED;
    }
    if frame.is_remote_frame {
        flags |= FLAG_REMOTE;
    }
    if frame.is_error_frame {
        flags |= FLAG_ERROR;
    }
    let dlc = u8::try_from(frame.effective_dlc())
        .map_err(|_| MonitorError::Protocol(format!("DLC {} out of range", frame.effective_dlc())))?;

    let mut buf = Vec::with_capacity(BINARY_HEADER_LEN + frame.data.len());
    buf.write_u8(BINARY_MESSAGE_TYPE)?;
    buf.write_f64::<BigEndian>(frame.timestamp)?;
    buf.write_u32::<BigEndian>(frame.arbitration_id)?;
    buf.write_u8(dlc)?;
    buf.write_u8(flags)?;
    buf.extend_from_slice(&frame.data);
    Ok(buf)
}
