//! Access options and security keys for tag memory commands

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Option bits accepted by block-addressed tag commands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AccessFlags: u8 {
        /// Transfer one block per radio exchange
        const FORCE_SINGLE_BLOCK = 0x01;
        /// Transfer the whole range in one radio exchange
        const FORCE_MULTI_BLOCK = 0x02;
        /// Bypass the reader's tag memory layout handling
        const RAW_ACCESS = 0x04;
        /// Skip block range validation against the announced layout
        const NO_BOUNDARY_CHECK = 0x08;
        /// Validate the command on the reader without touching the tag
        const DRY_RUN = 0x10;
    }
}

/// Security key presented with a command.
///
/// Key material is hex encoded and forwarded to the device as-is;
/// malformed keys are rejected by the device, not locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccessKey {
    /// No authentication
    #[default]
    None,
    /// MIFARE key A
    A(String),
    /// MIFARE key B
    B(String),
}

impl AccessKey {
    /// Wire code for the key type, when a key is present.
    pub fn type_code(&self) -> Option<u8> {
        match self {
            AccessKey::None => None,
            AccessKey::A(_) => Some(0x01),
            AccessKey::B(_) => Some(0x02),
        }
    }

    /// Hex key material, when a key is present.
    pub fn material(&self) -> Option<&str> {
        match self {
            AccessKey::None => None,
            AccessKey::A(key) | AccessKey::B(key) => Some(key),
        }
    }
}

/// Options attached to read, write, lock and bitmap commands.
///
/// Encodes as `&o=<mask>` plus, only when a key is present,
/// `&k=<2-hex-digit type>:<hex key>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessOptions {
    /// Behavior flags, OR-ed into the option mask
    pub flags: AccessFlags,

    /// Authentication key presented to the tag
    pub key: AccessKey,
}

impl AccessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: AccessFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_key(mut self, key: AccessKey) -> Self {
        self.key = key;
        self
    }

    /// Encodes the query-string fragment appended to tag commands.
    pub fn query_fragment(&self) -> String {
        let mut fragment = format!("&o={}", self.flags.bits());
        if let (Some(code), Some(material)) = (self.key.type_code(), self.key.material()) {
            fragment.push_str(&format!("&k={code:02x}:{material}"));
        }
        fragment
    }
}

impl fmt::Display for AccessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query_fragment())
    }
}
