//! # taglink
//!
//! Client library for network-attached RFID tag reader modules.
//!
//! ## Features
//!
//! - Tag discovery, memory reads and writes, permanent block locking
//! - Classified status reporting (retryable vs hard faults)
//! - Arrival/removal event monitoring with power-cycle recovery
//! - Async/await API using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use taglink::{AccessOptions, RfidReader};
//!
//! #[tokio::main]
//! async fn main() -> taglink::Result<()> {
//!     let mut reader = RfidReader::new("192.168.1.98", 80);
//!
//!     for tag_id in reader.list_tags().await? {
//!         let (status, text) = reader
//!             .read_text(&tag_id, 4, 16, &AccessOptions::new())
//!             .await?;
//!         if status.is_success() {
//!             println!("{tag_id}: {text}");
//!         } else {
//!             eprintln!("{status}");
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod reader;

mod attr;
mod monitor;
#[cfg(test)]
mod testing;

// Re-exports
pub use error::{Error, Result};
pub use reader::RfidReader;

// Re-export types
pub use taglink_core::{AccessFlags, AccessKey, AccessOptions};
pub use taglink_transport::{HttpTransport, Transport};
pub use taglink_types::{
    StatusOutcome, TagEvent, TagEventKind, TagInfo, TagStatus, TagType,
};
