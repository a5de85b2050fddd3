//! Log collection: per-source followers, queues and the ordered shipper.
//!
//! ```text
//!   tail -F file        journalctl -f
//!        │                    │
//!        v                    v
//!   ┌──────────┐        ┌──────────┐
//!   │ LogTailer│  ...   │ LogTailer│   (one task per source)
//!   └────┬─────┘        └────┬─────┘
//!        │                   │
//!        v                   v
//!   ┌──────────┐        ┌──────────┐
//!   │EventQueue│        │EventQueue│   (sole producer / sole consumer)
//!   └────┬─────┘        └────┬─────┘
//!        └─────────┬─────────┘
//!                  v
//!            ┌───────────┐
//!            │ LogShipper│   (serialized ticks, token-chained appends)
//!            └───────────┘
//! ```

pub mod queue;
pub mod shipper;
pub mod source;
pub mod tailer;

use std::time::{SystemTime, UNIX_EPOCH};

/// A single collected log line.
///
/// The timestamp is ingestion time; the agent never parses timestamps out
/// of log content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp_millis: i64,
    pub message: String,
}

impl LogEvent {
    /// Builds an event from a raw line, stamping it with the current time
    /// and stripping trailing whitespace.
    #[must_use]
    pub fn now(line: &str) -> Self {
        let timestamp_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        LogEvent {
            timestamp_millis,
            message: line.trim_end().to_string(),
        }
    }
}
