//! # taglink-core
//!
//! Protocol logic for RFID reader modules.
//!
//! This crate provides the pure, I/O-free protocol pieces:
//! - Command and query-string encoding
//! - Access option and security key encoding
//! - JSON reply decoding
//! - Status code classification
//! - Event log parsing and presence reconciliation state

pub mod command;
pub mod error;
pub mod events;
pub mod options;
pub mod reply;
pub mod status;

pub use command::{ReaderCommand, Request};
pub use error::{Error, Result};
pub use events::{EventCursor, EventLog, ValueToken};
pub use options::{AccessFlags, AccessKey, AccessOptions};
pub use reply::CommandReply;

/// Path of the tag command endpoint
pub const TAG_ENDPOINT: &str = "rfid.json";

/// Path of the event log endpoint
pub const EVENT_ENDPOINT: &str = "events.txt";

/// Largest payload, in bytes, accepted by the inline write command
pub const INLINE_WRITE_MAX: usize = 16;

/// Width mask of the device event position counter
pub const EVENT_POS_MASK: u64 = 0x7FFFF;

/// Position jump beyond which the device is assumed to have power cycled
pub const POWER_CYCLE_JUMP: u64 = 16384;
