//! Reader command and query-string encoding

use std::fmt;

use crate::error::Result;
use crate::options::AccessOptions;

/// Commands understood by the reader's tag endpoint.
///
/// Each command becomes the `a=` parameter of a query against
/// [`TAG_ENDPOINT`](crate::TAG_ENDPOINT).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReaderCommand {
    /// Clear reader state
    Reset,
    /// List identifiers of tags currently in the field
    ListTags,
    /// Fetch metadata for one tag
    TagInfo,
    /// Permanently lock a block range
    Lock,
    /// Fetch the lock-state bitmap for a block range
    CheckLocked,
    /// Fetch the special-block bitmap for a block range
    CheckSpecial,
    /// Read a block range as hex
    Read,
    /// Inline write of a hex payload
    Write,
}

impl ReaderCommand {
    /// Wire name used as the `a=` query parameter.
    pub fn op(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::ListTags => "list",
            Self::TagInfo => "info",
            Self::Lock => "lock",
            Self::CheckLocked => "chkl",
            Self::CheckSpecial => "chks",
            Self::Read => "read",
            Self::Write => "writ",
        }
    }

    /// Check if this command addresses a specific tag
    pub fn targets_tag(self) -> bool {
        !matches!(self, Self::Reset | Self::ListTags)
    }

    /// Check if this command addresses a block range and accepts
    /// access options
    pub fn targets_blocks(self) -> bool {
        matches!(
            self,
            Self::Lock | Self::CheckLocked | Self::CheckSpecial | Self::Read | Self::Write
        )
    }
}

impl fmt::Display for ReaderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op())
    }
}

/// Builder for one request against the tag endpoint.
///
/// Parameters are emitted in the fixed wire order `a, t, b, n, w`
/// followed by the options fragment.
///
/// # Examples
///
/// ```
/// use taglink_core::{ReaderCommand, Request};
///
/// let query = Request::new(ReaderCommand::TagInfo)
///     .tag("4a0052fa93e12b")
///     .to_query();
/// assert_eq!(query, "rfid.json?a=info&t=4a0052fa93e12b");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    command: ReaderCommand,
    tag_id: Option<String>,
    first_block: Option<u32>,
    count: Option<u32>,
    payload: Option<String>,
    options: Option<AccessOptions>,
}

impl Request {
    pub fn new(command: ReaderCommand) -> Self {
        Self {
            command,
            tag_id: None,
            first_block: None,
            count: None,
            payload: None,
            options: None,
        }
    }

    /// Sets the `t=` tag identifier parameter.
    pub fn tag(mut self, tag_id: &str) -> Self {
        self.tag_id = Some(tag_id.to_owned());
        self
    }

    /// Sets the `b=` first block parameter.
    pub fn block(mut self, first_block: u32) -> Self {
        self.first_block = Some(first_block);
        self
    }

    /// Sets the `n=` block or byte count parameter.
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the `w=` inline payload, hex encoding the bytes.
    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = Some(hex::encode(data));
        self
    }

    /// Sets the `w=` inline payload from an already hex-encoded string.
    pub fn payload_hex(mut self, hex_payload: &str) -> Self {
        self.payload = Some(hex_payload.to_owned());
        self
    }

    /// Attaches access options, emitted as the trailing fragment.
    pub fn options(mut self, options: &AccessOptions) -> Self {
        self.options = Some(options.clone());
        self
    }

    /// Encodes the full query path for a fetch.
    pub fn to_query(&self) -> String {
        let mut query = format!("{}?a={}", crate::TAG_ENDPOINT, self.command.op());
        if let Some(tag_id) = &self.tag_id {
            query.push_str("&t=");
            query.push_str(tag_id);
        }
        if let Some(first_block) = self.first_block {
            query.push_str("&b=");
            query.push_str(&first_block.to_string());
        }
        if let Some(count) = self.count {
            query.push_str("&n=");
            query.push_str(&count.to_string());
        }
        if let Some(payload) = &self.payload {
            query.push_str("&w=");
            query.push_str(payload);
        }
        if let Some(options) = &self.options {
            query.push_str(&options.query_fragment());
        }
        query
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query())
    }
}

/// Encodes the upload target name for a bulk write.
///
/// Writes larger than [`INLINE_WRITE_MAX`](crate::INLINE_WRITE_MAX)
/// bytes are submitted as an upload whose name carries the addressing
/// fields; the payload travels as the raw upload body.
pub fn upload_target(
    tag_id: &str,
    first_block: u32,
    byte_count: usize,
    options: &AccessOptions,
) -> String {
    format!(
        "Rfid:t={tag_id}&b={first_block}&n={byte_count}{}",
        options.query_fragment()
    )
}

/// Decodes a caller-supplied hex payload into raw bytes.
pub fn decode_payload(hex_payload: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(hex_payload)?)
}
