//! Presence events

use chrono::{DateTime, Utc};
use std::fmt;

/// Kind of presence transition recorded in the reader event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagEventKind {
    /// The tag entered the reader field.
    Arrival,
    /// The tag left the reader field.
    Removal,
}

impl TagEventKind {
    /// Maps the one-character type marker used in event log lines.
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '+' => Some(TagEventKind::Arrival),
            '-' => Some(TagEventKind::Removal),
            _ => None,
        }
    }

    pub fn marker(&self) -> char {
        match self {
            TagEventKind::Arrival => '+',
            TagEventKind::Removal => '-',
        }
    }
}

impl fmt::Display for TagEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagEventKind::Arrival => write!(f, "arrival"),
            TagEventKind::Removal => write!(f, "removal"),
        }
    }
}

/// A single tag arrival or removal.
///
/// Timestamps are whole seconds from the device clock. A timestamp of
/// 0 marks an arrival synthesized for a tag that was already present
/// when monitoring started and whose real arrival fell outside the
/// retained log window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent {
    /// Device timestamp, seconds
    pub timestamp: u32,

    /// Arrival or removal
    pub kind: TagEventKind,

    /// Identifier of the affected tag
    pub tag_id: String,
}

impl TagEvent {
    /// Device timestamp as a UTC datetime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

impl fmt::Display for TagEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp, self.kind.marker(), self.tag_id)
    }
}
