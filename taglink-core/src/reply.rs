//! Reader reply decoding

use serde::Deserialize;
use taglink_types::{TagInfo, TagType};

use crate::error::Result;

fn neg_one() -> i32 {
    -1
}

/// JSON body returned by tag commands.
///
/// Which fields are present depends on the command; absent numeric
/// fields take the wire defaults (`err` 0, block fields -1, sizes 0)
/// so that one reply shape covers every command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandReply {
    /// Device status code, 0 on success
    #[serde(default)]
    pub err: i32,

    /// Block the error occurred on, -1 if not block-specific
    #[serde(rename = "errBlk", default = "neg_one")]
    pub err_blk: i32,

    /// First affected block, -1 if not reported
    #[serde(default = "neg_one")]
    pub fab: i32,

    /// Last affected block, -1 if not reported
    #[serde(default = "neg_one")]
    pub lab: i32,

    /// Numeric tag family code
    #[serde(rename = "type", default)]
    pub tag_type: i32,

    /// Total memory size in bytes
    #[serde(default)]
    pub size: i32,

    /// Usable memory size in bytes
    #[serde(default)]
    pub usable: i32,

    /// Block size in bytes
    #[serde(default)]
    pub blksize: i32,

    /// First usable block index
    #[serde(default)]
    pub fblk: i32,

    /// Last usable block index
    #[serde(default)]
    pub lblk: i32,

    /// Hex payload of a read reply
    #[serde(default)]
    pub res: String,

    /// Hex bitmap of a lock-state or special-block reply
    #[serde(default)]
    pub bitmap: String,
}

impl CommandReply {
    /// Decodes a reply body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedReply`](crate::Error::MalformedReply)
    /// when the body is not a JSON object of the expected shape.
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Builds the tag descriptor carried by an info reply.
    ///
    /// Never fails; fields the reply did not carry stay zero, so a
    /// descriptor is available even for error replies.
    pub fn tag_info(&self, tag_id: &str) -> TagInfo {
        TagInfo {
            tag_id: tag_id.to_owned(),
            tag_type: TagType::from_code(self.tag_type),
            memory_size: self.size.max(0) as u32,
            usable_size: self.usable.max(0) as u32,
            block_size: self.blksize.max(0) as u32,
            first_block: self.fblk.max(0) as u32,
            last_block: self.lblk.max(0) as u32,
        }
    }

    /// Decodes the hex payload of a read reply.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        Ok(hex::decode(self.res.trim())?)
    }

    /// Decodes the bitmap field into `count` per-block booleans.
    ///
    /// Block *i* maps to bit *i mod 8* of byte *i / 8*; bits beyond
    /// the transmitted bytes read as false.
    pub fn bitmap_bits(&self, count: usize) -> Result<Vec<bool>> {
        let bytes = hex::decode(self.bitmap.trim())?;
        Ok((0..count)
            .map(|i| bytes.get(i / 8).is_some_and(|b| (b >> (i % 8)) & 1 == 1))
            .collect())
    }
}

/// Decodes a tag list reply body.
///
/// The body is a bare JSON array of tag identifiers. Bodies too short
/// to contain a list decode as an empty list, not an error.
pub fn parse_tag_list(body: &str) -> Result<Vec<String>> {
    let trimmed = body.trim();
    if trimmed.len() <= 3 {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}
