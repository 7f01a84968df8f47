//! Tag descriptors and family codes

use std::fmt;

/// RFID tag family, as reported by the reader firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    /// ISO 15693 vicinity tag
    Iso15693,
    /// Generic ISO 14443 proximity tag
    Iso14443,
    /// MIFARE Ultralight
    MifareUltralight,
    /// MIFARE Classic 1K
    MifareClassic1K,
    /// MIFARE Classic 4K
    MifareClassic4K,
    /// MIFARE DESFire
    MifareDesfire,
    /// NTAG 213
    Ntag213,
    /// NTAG 215
    Ntag215,
    /// NTAG 216
    Ntag216,
    /// NTAG 424 DNA
    Ntag424Dna,
    /// Family code not known to this library
    Unknown,
}

impl TagType {
    /// Maps a numeric family code from a tag info response.
    ///
    /// Codes outside the known table map to [`TagType::Unknown`];
    /// that is a valid outcome, not an error.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => TagType::Iso15693,
            2 => TagType::Iso14443,
            3 => TagType::MifareUltralight,
            4 => TagType::MifareClassic1K,
            5 => TagType::MifareClassic4K,
            6 => TagType::MifareDesfire,
            7 => TagType::Ntag213,
            8 => TagType::Ntag215,
            9 => TagType::Ntag216,
            10 => TagType::Ntag424Dna,
            _ => TagType::Unknown,
        }
    }

    /// Numeric family code (0 for unknown families).
    pub fn code(&self) -> i32 {
        match self {
            TagType::Iso15693 => 1,
            TagType::Iso14443 => 2,
            TagType::MifareUltralight => 3,
            TagType::MifareClassic1K => 4,
            TagType::MifareClassic4K => 5,
            TagType::MifareDesfire => 6,
            TagType::Ntag213 => 7,
            TagType::Ntag215 => 8,
            TagType::Ntag216 => 9,
            TagType::Ntag424Dna => 10,
            TagType::Unknown => 0,
        }
    }

    /// Human-readable family name.
    pub fn label(&self) -> &'static str {
        match self {
            TagType::Iso15693 => "ISO 15693",
            TagType::Iso14443 => "ISO 14443",
            TagType::MifareUltralight => "MIFARE Ultralight",
            TagType::MifareClassic1K => "MIFARE Classic 1K",
            TagType::MifareClassic4K => "MIFARE Classic 4K",
            TagType::MifareDesfire => "MIFARE DESFire",
            TagType::Ntag213 => "NTAG 213",
            TagType::Ntag215 => "NTAG 215",
            TagType::Ntag216 => "NTAG 216",
            TagType::Ntag424Dna => "NTAG 424 DNA",
            TagType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tag metadata returned by a tag info request.
///
/// Immutable once constructed; a fresh descriptor is built for every
/// info request. Fields absent from a partial response are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Device-assigned tag identifier
    pub tag_id: String,

    /// Tag family
    pub tag_type: TagType,

    /// Total memory size in bytes
    pub memory_size: u32,

    /// Usable memory size in bytes
    pub usable_size: u32,

    /// Block size in bytes
    pub block_size: u32,

    /// First usable block index
    pub first_block: u32,

    /// Last usable block index
    pub last_block: u32,
}

impl TagInfo {
    /// Human-readable family name for this tag.
    pub fn type_label(&self) -> &'static str {
        self.tag_type.label()
    }
}

impl fmt::Display for TagInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tag[{}, {}, {} bytes, blocks {}..{}]",
            self.tag_id, self.tag_type, self.memory_size, self.first_block, self.last_block
        )
    }
}
