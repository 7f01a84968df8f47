//! Operation status reporting

use std::fmt;

/// Classified outcome of a tag operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusOutcome {
    /// The device reported code 0.
    Success,
    /// Communication-class fault; retrying the operation may succeed.
    SoftError,
    /// Protocol, security or format violation; retrying will not help.
    HardError,
    /// Fault in the host/transport layer rather than at the tag.
    LocalError,
}

impl StatusOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StatusOutcome::Success)
    }

    /// Whether retrying the same operation can plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StatusOutcome::SoftError)
    }
}

impl fmt::Display for StatusOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusOutcome::Success => "success",
            StatusOutcome::SoftError => "soft error",
            StatusOutcome::HardError => "hard error",
            StatusOutcome::LocalError => "local error",
        };
        write!(f, "{name}")
    }
}

/// Decoded status of a single tag operation.
///
/// Constructed once per command response and read-only thereafter.
/// The outcome is [`StatusOutcome::Success`] exactly when `code` is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStatus {
    /// Identifier of the tag the operation addressed (empty for
    /// reader-level commands such as reset)
    pub tag_id: String,

    /// Raw device error code
    pub code: i32,

    /// Classified outcome
    pub outcome: StatusOutcome,

    /// Human-readable description of the result
    pub message: String,

    /// Affected block index, -1 if not block-specific
    pub block: i32,

    /// First affected block, -1 if not reported
    pub first_block: i32,

    /// Last affected block, -1 if not reported
    pub last_block: i32,
}

impl TagStatus {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn is_recoverable(&self) -> bool {
        self.outcome.is_recoverable()
    }
}

impl fmt::Display for TagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag_id.is_empty() {
            write!(f, "[{}] {}", self.outcome, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.outcome, self.tag_id, self.message)
        }
    }
}
