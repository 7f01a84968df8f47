//! Cached remote attributes

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

use taglink_core::TAG_ENDPOINT;
use taglink_transport::Transport;

use crate::error::Result;

/// Cache over the reader's JSON attribute map.
///
/// The reader exposes scalar settings (tag count, refresh rate, the
/// advertised notification token) as one JSON object. Reads within
/// the validity window are answered from cache; any attribute write
/// invalidates it. One generic accessor replaces per-attribute
/// boilerplate.
pub(crate) struct AttrCache {
    state: Mutex<AttrState>,
}

struct AttrState {
    values: HashMap<String, Value>,
    loaded_at: Option<Instant>,
    validity: Duration,
}

impl AttrCache {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(AttrState {
                values: HashMap::new(),
                loaded_at: None,
                validity: Duration::from_millis(5),
            }),
        }
    }

    /// Changes how long a loaded attribute map stays valid.
    pub(crate) fn set_validity(&self, validity: Duration) {
        self.state.lock().validity = validity;
    }

    /// Reads one attribute, refreshing the map when the cache is
    /// stale. Attributes absent from the map read as `Value::Null`.
    pub(crate) async fn get(&self, transport: &mut dyn Transport, name: &str) -> Result<Value> {
        if let Some(value) = self.cached(name) {
            trace!("attribute {} answered from cache", name);
            return Ok(value);
        }

        let body = transport.fetch(TAG_ENDPOINT).await?;
        let values: HashMap<String, Value> =
            serde_json::from_slice(&body).map_err(taglink_core::Error::from)?;

        let mut state = self.state.lock();
        state.values = values;
        state.loaded_at = Some(Instant::now());
        Ok(state.values.get(name).cloned().unwrap_or(Value::Null))
    }

    /// Writes one attribute and invalidates the cache.
    pub(crate) async fn set(
        &self,
        transport: &mut dyn Transport,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let query = format!("{TAG_ENDPOINT}?{name}={value}");
        transport.fetch(&query).await?;
        self.invalidate();
        Ok(())
    }

    pub(crate) fn invalidate(&self) {
        self.state.lock().loaded_at = None;
    }

    fn cached(&self, name: &str) -> Option<Value> {
        let state = self.state.lock();
        let loaded_at = state.loaded_at?;
        if loaded_at.elapsed() <= state.validity {
            Some(state.values.get(name).cloned().unwrap_or(Value::Null))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockReader;

    #[tokio::test]
    async fn test_reads_within_validity_hit_cache() {
        let mut mock = MockReader::new();
        let cache = AttrCache::new();
        cache.set_validity(Duration::from_secs(60));

        let first = cache.get(&mut mock, "nTags").await.unwrap();
        let second = cache.get(&mut mock, "refreshRate").await.unwrap();

        assert_eq!(first, Value::from(2));
        assert_eq!(second, Value::from(20));
        assert_eq!(mock.attr_map_fetches(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() {
        let mut mock = MockReader::new();
        let cache = AttrCache::new();
        cache.set_validity(Duration::ZERO);

        cache.get(&mut mock, "nTags").await.unwrap();
        cache.get(&mut mock, "nTags").await.unwrap();
        assert_eq!(mock.attr_map_fetches(), 2);
    }

    #[tokio::test]
    async fn test_write_invalidates_cache() {
        let mut mock = MockReader::new();
        let cache = AttrCache::new();
        cache.set_validity(Duration::from_secs(60));

        cache.get(&mut mock, "refreshRate").await.unwrap();
        cache.set(&mut mock, "refreshRate", "50").await.unwrap();
        let rate = cache.get(&mut mock, "refreshRate").await.unwrap();

        assert_eq!(rate, Value::from(50));
        assert!(mock.requests().iter().any(|r| r == "rfid.json?refreshRate=50"));
        assert_eq!(mock.attr_map_fetches(), 2);
    }

    #[tokio::test]
    async fn test_absent_attribute_reads_null() {
        let mut mock = MockReader::new();
        let cache = AttrCache::new();
        assert_eq!(cache.get(&mut mock, "noSuchAttr").await.unwrap(), Value::Null);
    }
}
