//! Type definitions for taglink

pub mod event;
pub mod status;
pub mod tag;

pub use event::{TagEvent, TagEventKind};
pub use status::{StatusOutcome, TagStatus};
pub use tag::{TagInfo, TagType};
