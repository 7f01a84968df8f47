//! High-level reader client

use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use taglink_core::{
    command, reply, status, AccessOptions, CommandReply, ReaderCommand, Request, INLINE_WRITE_MAX,
};
use taglink_transport::{HttpTransport, Transport};
use taglink_types::{TagEvent, TagInfo, TagStatus};

use crate::attr::AttrCache;
use crate::error::Result;
use crate::monitor::Monitor;

/// Client for one network-attached RFID reader module.
///
/// One instance owns one transport and runs one device exchange at a
/// time. Command methods return the classified [`TagStatus`] alongside
/// any payload, so callers can distinguish retryable tag trouble from
/// hard faults without inspecting raw codes.
///
/// # Examples
///
/// ```no_run
/// use taglink::RfidReader;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut reader = RfidReader::new("192.168.1.98", 80);
///     for tag_id in reader.list_tags().await? {
///         let (status, info) = reader.get_tag_info(&tag_id).await?;
///         if status.is_success() {
///             println!("{info}");
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct RfidReader {
    transport: Box<dyn Transport>,
    monitor: Monitor,
    attrs: AttrCache,
    last_token: Option<String>,
}

impl RfidReader {
    /// Creates a client talking HTTP to `host:port`.
    pub fn new(host: &str, port: u16) -> Self {
        Self::from_transport(HttpTransport::new(host, port))
    }

    /// Creates a client over an already configured transport.
    ///
    /// This is the way to set custom timeouts on the default HTTP
    /// transport, or to substitute another [`Transport`] entirely.
    pub fn from_transport(transport: impl Transport + 'static) -> Self {
        let transport = Box::new(transport);
        debug!("reader client for {}", transport.remote_addr());
        Self {
            transport,
            monitor: Monitor::new(),
            attrs: AttrCache::new(),
            last_token: None,
        }
    }

    /// Address of the reader this client talks to.
    pub fn remote_addr(&self) -> String {
        self.transport.remote_addr()
    }

    /// Clears reader state, including its tag presence tracking.
    pub async fn reset(&mut self) -> Result<TagStatus> {
        let (status, _) = self.run("", &Request::new(ReaderCommand::Reset)).await?;
        Ok(status)
    }

    /// Lists identifiers of the tags currently in the field.
    pub async fn list_tags(&mut self) -> Result<Vec<String>> {
        let query = Request::new(ReaderCommand::ListTags).to_query();
        let body = self.transport.fetch(&query).await?;
        Ok(reply::parse_tag_list(&String::from_utf8_lossy(&body))?)
    }

    /// Fetches the memory geometry of one tag.
    ///
    /// The descriptor is returned even when the status reports an
    /// error; its fields are zero then.
    pub async fn get_tag_info(&mut self, tag_id: &str) -> Result<(TagStatus, TagInfo)> {
        let request = Request::new(ReaderCommand::TagInfo).tag(tag_id);
        let (status, reply) = self.run(tag_id, &request).await?;
        Ok((status, reply.tag_info(tag_id)))
    }

    /// Permanently locks `block_count` blocks starting at `first_block`.
    pub async fn lock_blocks(
        &mut self,
        tag_id: &str,
        first_block: u32,
        block_count: u32,
        options: &AccessOptions,
    ) -> Result<TagStatus> {
        let request = Request::new(ReaderCommand::Lock)
            .tag(tag_id)
            .block(first_block)
            .count(block_count)
            .options(options);
        let (status, _) = self.run(tag_id, &request).await?;
        Ok(status)
    }

    /// Fetches per-block lock state for a block range.
    pub async fn get_lock_state(
        &mut self,
        tag_id: &str,
        first_block: u32,
        block_count: u32,
        options: &AccessOptions,
    ) -> Result<(TagStatus, Vec<bool>)> {
        self.fetch_bitmap(ReaderCommand::CheckLocked, tag_id, first_block, block_count, options)
            .await
    }

    /// Fetches per-block special-region markers for a block range.
    pub async fn get_special_blocks(
        &mut self,
        tag_id: &str,
        first_block: u32,
        block_count: u32,
        options: &AccessOptions,
    ) -> Result<(TagStatus, Vec<bool>)> {
        self.fetch_bitmap(ReaderCommand::CheckSpecial, tag_id, first_block, block_count, options)
            .await
    }

    /// Reads `byte_count` bytes starting at `first_block`, returning
    /// the payload as lowercase hex. The payload is empty when the
    /// status is not a success.
    pub async fn read_hex(
        &mut self,
        tag_id: &str,
        first_block: u32,
        byte_count: u32,
        options: &AccessOptions,
    ) -> Result<(TagStatus, String)> {
        let request = Request::new(ReaderCommand::Read)
            .tag(tag_id)
            .block(first_block)
            .count(byte_count)
            .options(options);
        let (status, reply) = self.run(tag_id, &request).await?;
        let payload = if status.is_success() {
            reply.res.trim().to_owned()
        } else {
            String::new()
        };
        Ok((status, payload))
    }

    /// Reads `byte_count` bytes starting at `first_block`.
    pub async fn read_bytes(
        &mut self,
        tag_id: &str,
        first_block: u32,
        byte_count: u32,
        options: &AccessOptions,
    ) -> Result<(TagStatus, Vec<u8>)> {
        let (status, payload) = self.read_hex(tag_id, first_block, byte_count, options).await?;
        Ok((status, command::decode_payload(&payload)?))
    }

    /// Reads `byte_count` bytes starting at `first_block` as a shared
    /// buffer.
    pub async fn read_binary(
        &mut self,
        tag_id: &str,
        first_block: u32,
        byte_count: u32,
        options: &AccessOptions,
    ) -> Result<(TagStatus, Bytes)> {
        let (status, data) = self.read_bytes(tag_id, first_block, byte_count, options).await?;
        Ok((status, Bytes::from(data)))
    }

    /// Reads `byte_count` bytes starting at `first_block` as text.
    /// Bytes that are not valid UTF-8 decode as replacement characters.
    pub async fn read_text(
        &mut self,
        tag_id: &str,
        first_block: u32,
        byte_count: u32,
        options: &AccessOptions,
    ) -> Result<(TagStatus, String)> {
        let (status, data) = self.read_bytes(tag_id, first_block, byte_count, options).await?;
        Ok((status, String::from_utf8_lossy(&data).into_owned()))
    }

    /// Writes `data` starting at `first_block`.
    ///
    /// Payloads up to [`INLINE_WRITE_MAX`] bytes travel inline in the
    /// command query; larger ones are submitted as an upload.
    pub async fn write_bytes(
        &mut self,
        tag_id: &str,
        first_block: u32,
        data: &[u8],
        options: &AccessOptions,
    ) -> Result<TagStatus> {
        if data.len() > INLINE_WRITE_MAX {
            return self.write_upload(tag_id, first_block, data, options).await;
        }
        let request = Request::new(ReaderCommand::Write)
            .tag(tag_id)
            .block(first_block)
            .payload(data)
            .options(options);
        let (status, _) = self.run(tag_id, &request).await?;
        Ok(status)
    }

    /// Writes a shared buffer starting at `first_block`.
    pub async fn write_binary(
        &mut self,
        tag_id: &str,
        first_block: u32,
        data: &Bytes,
        options: &AccessOptions,
    ) -> Result<TagStatus> {
        self.write_bytes(tag_id, first_block, data.as_ref(), options).await
    }

    /// Writes a hex payload starting at `first_block`.
    ///
    /// Payloads short enough to travel inline are passed through
    /// unparsed and validated by the device; larger ones are decoded
    /// host-side and submitted as an upload.
    pub async fn write_hex(
        &mut self,
        tag_id: &str,
        first_block: u32,
        hex_payload: &str,
        options: &AccessOptions,
    ) -> Result<TagStatus> {
        if hex_payload.len() > 2 * INLINE_WRITE_MAX {
            let data = command::decode_payload(hex_payload)?;
            return self.write_upload(tag_id, first_block, &data, options).await;
        }
        let request = Request::new(ReaderCommand::Write)
            .tag(tag_id)
            .block(first_block)
            .payload_hex(hex_payload)
            .options(options);
        let (status, _) = self.run(tag_id, &request).await?;
        Ok(status)
    }

    /// Writes text starting at `first_block`.
    pub async fn write_text(
        &mut self,
        tag_id: &str,
        first_block: u32,
        text: &str,
        options: &AccessOptions,
    ) -> Result<TagStatus> {
        self.write_bytes(tag_id, first_block, text.as_bytes(), options).await
    }

    /// Registers the presence event callback and re-enters the
    /// first-poll state, so the next poll reports everything already
    /// in the field.
    pub fn register_event_callback<F>(&self, callback: F)
    where
        F: FnMut(TagEvent) + Send + 'static,
    {
        self.monitor.register(callback);
    }

    /// Removes the presence event callback. Polling continues to track
    /// the device position but delivers nothing.
    pub fn unregister_event_callback(&self) {
        self.monitor.unregister();
    }

    /// Runs one event reconciliation cycle against a notification
    /// token obtained out of band.
    pub async fn process_event_notification(&mut self, token: &str) -> Result<()> {
        self.monitor.process(&mut *self.transport, token).await
    }

    /// Polls the advertised notification token and reconciles events
    /// when it moved. An unchanged token is skipped, except on the
    /// first poll after a callback registration.
    pub async fn pump_events(&mut self) -> Result<()> {
        let value = self.attrs.get(&mut *self.transport, "advertisedValue").await?;
        let token = token_text(value);
        let first_poll = self.monitor.is_subscribed() && self.monitor.is_first_poll();
        if !first_poll && self.last_token.as_deref() == Some(token.as_str()) {
            return Ok(());
        }
        self.monitor.process(&mut *self.transport, &token).await?;
        self.last_token = Some(token);
        Ok(())
    }

    /// Number of tags the reader currently sees.
    pub async fn n_tags(&mut self) -> Result<u32> {
        let value = self.attrs.get(&mut *self.transport, "nTags").await?;
        Ok(value.as_u64().unwrap_or(0) as u32)
    }

    /// Field polling period of the reader, in milliseconds.
    pub async fn refresh_rate(&mut self) -> Result<u32> {
        let value = self.attrs.get(&mut *self.transport, "refreshRate").await?;
        Ok(value.as_u64().unwrap_or(0) as u32)
    }

    /// Changes the field polling period of the reader.
    pub async fn set_refresh_rate(&mut self, milliseconds: u32) -> Result<()> {
        self.attrs
            .set(&mut *self.transport, "refreshRate", &milliseconds.to_string())
            .await
    }

    /// Raw notification token the reader currently advertises.
    pub async fn advertised_value(&mut self) -> Result<String> {
        let value = self.attrs.get(&mut *self.transport, "advertisedValue").await?;
        Ok(token_text(value))
    }

    /// Changes how long cached reader attributes stay valid.
    pub fn set_cache_validity(&self, validity: Duration) {
        self.attrs.set_validity(validity);
    }

    async fn run(&mut self, tag_id: &str, request: &Request) -> Result<(TagStatus, CommandReply)> {
        let body = self.transport.fetch(&request.to_query()).await?;
        let reply = CommandReply::parse(&String::from_utf8_lossy(&body))?;
        let status = status::from_reply(tag_id, &reply);
        if !status.is_success() {
            debug!("{status}");
        }
        Ok((status, reply))
    }

    async fn fetch_bitmap(
        &mut self,
        command: ReaderCommand,
        tag_id: &str,
        first_block: u32,
        block_count: u32,
        options: &AccessOptions,
    ) -> Result<(TagStatus, Vec<bool>)> {
        let request = Request::new(command)
            .tag(tag_id)
            .block(first_block)
            .count(block_count)
            .options(options);
        let (status, reply) = self.run(tag_id, &request).await?;
        let bits = if status.is_success() {
            reply.bitmap_bits(block_count as usize)?
        } else {
            Vec::new()
        };
        Ok((status, bits))
    }

    async fn write_upload(
        &mut self,
        tag_id: &str,
        first_block: u32,
        data: &[u8],
        options: &AccessOptions,
    ) -> Result<TagStatus> {
        let name = command::upload_target(tag_id, first_block, data.len(), options);
        let body = self.transport.upload(&name, data).await?;
        let reply = CommandReply::parse(&String::from_utf8_lossy(&body))?;
        let status = status::from_reply(tag_id, &reply);
        if !status.is_success() {
            debug!("{status}");
        }
        Ok(status)
    }
}

fn token_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
