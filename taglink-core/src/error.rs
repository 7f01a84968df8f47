//! Error types for taglink-core

/// Result type alias for protocol decoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Protocol decoding errors
///
/// These cover locally detectable faults only. Errors reported by the
/// device itself travel as [`TagStatus`](taglink_types::TagStatus)
/// values, never as `Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reply body was not the expected JSON shape
    #[error("Malformed reply: {0}")]
    MalformedReply(#[from] serde_json::Error),

    /// Event log segment had no trailing position marker
    #[error("Event log segment has no position marker")]
    MissingPositionMarker,

    /// Position marker line did not contain a number
    #[error("Invalid event log position marker: {0:?}")]
    InvalidPositionMarker(String),

    /// Hex payload could not be decoded
    #[error("Invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl Error {
    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedReply(_)
                | Self::MissingPositionMarker
                | Self::InvalidPositionMarker(_)
        )
    }
}
