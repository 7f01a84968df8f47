//! Transport layer for RFID reader modules
//!
//! Provides request/response communication with readers over HTTP.

pub mod error;
pub mod http;

pub use error::{Error, Result};
pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;

/// Transport trait for reader request/response exchanges
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a path with a GET-style request, returning the reply body
    async fn fetch(&mut self, path: &str) -> Result<Bytes>;

    /// Submit a bulk payload under the given upload name, returning
    /// the reply body
    async fn upload(&mut self, name: &str, data: &[u8]) -> Result<Bytes>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
