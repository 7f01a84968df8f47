//! HTTP transport

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::{error::*, Transport};

/// HTTP transport for reader modules
///
/// Readers answer plain HTTP on their configuration port. Every
/// exchange opens a fresh connection, sends one request with
/// `Connection: close` and reads the reply to end of stream, so no
/// connection state survives between calls.
pub struct HttpTransport {
    host: String,
    port: u16,
    socket_addr: Option<SocketAddr>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpTransport {
    /// Create new HTTP transport
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket_addr: None,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.socket_addr {
            return Ok(addr);
        }

        let addr_str = format!("{}:{}", self.host, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;

        self.socket_addr = Some(*addr);
        Ok(*addr)
    }

    /// Run one request/response exchange on a fresh connection.
    async fn exchange(&mut self, request: &[u8]) -> Result<Bytes> {
        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        trace!("Sending {} bytes", request.len());

        stream.write_all(request).await?;
        stream.flush().await?;

        let mut response = Vec::with_capacity(1024);
        timeout(self.read_timeout, stream.read_to_end(&mut response))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;

        if response.is_empty() {
            return Err(Error::ConnectionClosed);
        }

        trace!("Received {} bytes", response.len());

        extract_body(Bytes::from(response))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&mut self, path: &str) -> Result<Bytes> {
        let request = format!(
            "GET /{path} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.host
        );
        self.exchange(request.as_bytes()).await
    }

    async fn upload(&mut self, name: &str, data: &[u8]) -> Result<Bytes> {
        let boundary = pick_boundary(data);
        let mut body = Vec::with_capacity(data.len() + 256);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"api\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
        body.extend_from_slice(b"Content-Transfer-Encoding: binary\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let mut request = format!(
            "POST /upload.html HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Type: multipart/form-data; boundary={boundary}\r\nContent-Length: {}\r\n\r\n",
            self.host,
            body.len()
        )
        .into_bytes();
        request.extend_from_slice(&body);

        self.exchange(&request).await
    }

    fn remote_addr(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port))
    }
}

/// Strips the HTTP header from a raw response, checking the status.
///
/// Some reader firmwares answer local endpoints with a bare body and
/// no status line; those pass through unchanged.
fn extract_body(raw: Bytes) -> Result<Bytes> {
    if !raw.starts_with(b"HTTP/") {
        return Ok(raw);
    }

    let header_end = find_header_end(&raw)
        .ok_or_else(|| Error::MalformedResponse("missing header terminator".into()))?;
    let header = std::str::from_utf8(&raw[..header_end.0])
        .map_err(|_| Error::MalformedResponse("non-UTF-8 header".into()))?;

    let status_line = header.lines().next().unwrap_or("");
    let code: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::MalformedResponse(format!("bad status line: {status_line:?}")))?;

    if !(200..300).contains(&code) {
        return Err(Error::HttpStatus { code });
    }

    Ok(raw.slice(header_end.0 + header_end.1..))
}

/// Finds the header/body boundary, returning its offset and length.
fn find_header_end(raw: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some((pos, 4));
    }
    raw.windows(2).position(|w| w == b"\n\n").map(|pos| (pos, 2))
}

/// Picks a multipart boundary that does not occur in the payload.
fn pick_boundary(data: &[u8]) -> String {
    let mut n = 0u32;
    loop {
        let candidate = format!("Zz{n:06x}zZ");
        let collides = data
            .windows(candidate.len())
            .any(|w| w == candidate.as_bytes());
        if !collides {
            return candidate;
        }
        n += 1;
    }
}
