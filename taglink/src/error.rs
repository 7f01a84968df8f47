//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by reader operations.
///
/// Only local failures land here. Errors reported by the device for a
/// tag operation travel in the returned
/// [`TagStatus`](taglink_types::TagStatus) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Core(#[from] taglink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] taglink_transport::Error),
}

impl Error {
    /// Check if error is recoverable (retry might succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_recoverable(),
            Self::Transport(e) => matches!(
                e,
                taglink_transport::Error::ConnectionTimeout
                    | taglink_transport::Error::ReadTimeout
                    | taglink_transport::Error::ConnectionClosed
                    | taglink_transport::Error::Io(_)
            ),
        }
    }
}
