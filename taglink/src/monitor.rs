//! Presence event monitoring

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use taglink_core::events::{parse_event_line, synthesize_presence};
use taglink_core::{reply, EventCursor, EventLog, ReaderCommand, Request, ValueToken, EVENT_ENDPOINT};
use taglink_transport::Transport;
use taglink_types::TagEvent;

use crate::error::Result;

type EventCallback = Box<dyn FnMut(TagEvent) + Send>;

/// Shared presence monitoring state for one reader.
///
/// Holds the reconciliation cursor and the registered callback behind
/// per-instance locks. Locks are never held across an await point, so
/// a long device exchange cannot stall registration calls.
#[derive(Clone)]
pub(crate) struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    cursor: Mutex<EventCursor>,
    callback: Mutex<Option<EventCallback>>,
}

impl Monitor {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                cursor: Mutex::new(EventCursor::new()),
                callback: Mutex::new(None),
            }),
        }
    }

    /// Installs the callback and enters the first-poll state.
    pub(crate) fn register<F>(&self, callback: F)
    where
        F: FnMut(TagEvent) + Send + 'static,
    {
        *self.inner.callback.lock() = Some(Box::new(callback));
        self.inner.cursor.lock().arm();
        info!("Presence event callback registered");
    }

    /// Removes the callback; polling becomes bookkeeping-only.
    pub(crate) fn unregister(&self) {
        *self.inner.callback.lock() = None;
        debug!("Presence event callback unregistered");
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        self.inner.callback.lock().is_some()
    }

    pub(crate) fn is_first_poll(&self) -> bool {
        self.inner.cursor.lock().is_first_poll()
    }

    /// Runs one reconciliation cycle against an advertised token.
    ///
    /// Fetch or parse failures abort the cycle before the cursor
    /// advances, so the next poll retries the same log window; the
    /// timestamp guard keeps the retry from redelivering events.
    pub(crate) async fn process(&self, transport: &mut dyn Transport, raw_token: &str) -> Result<()> {
        let token = ValueToken::parse(raw_token);

        let (log_pos, first_poll) = {
            let mut cursor = self.inner.cursor.lock();
            cursor.observe(token);
            (cursor.log_pos(), cursor.is_first_poll())
        };

        // Position bookkeeping happens even without a subscriber.
        if !self.is_subscribed() {
            return Ok(());
        }

        let body = transport
            .fetch(&format!("{EVENT_ENDPOINT}?pos={log_pos}"))
            .await?;
        let log = EventLog::parse(&String::from_utf8_lossy(&body))?;

        let mut pending = if first_poll {
            if token.tag_count == 0 {
                Vec::new()
            } else {
                let list_query = Request::new(ReaderCommand::ListTags).to_query();
                let list_body = transport.fetch(&list_query).await?;
                let present = reply::parse_tag_list(&String::from_utf8_lossy(&list_body))?;
                synthesize_presence(&log.lines, &present)
            }
        } else {
            log.lines
                .iter()
                .filter_map(|line| parse_event_line(line))
                .collect()
        };

        // Stable sort: callbacks fire in non-decreasing timestamp
        // order regardless of log storage order.
        pending.sort_by_key(|event| event.timestamp);

        let deliverable: Vec<TagEvent> = {
            let mut cursor = self.inner.cursor.lock();
            cursor.store_marker(log.marker);
            if first_poll {
                cursor.finish_first_poll();
            }
            pending
                .into_iter()
                .filter(|event| cursor.accept(event.timestamp))
                .collect()
        };

        trace!(count = deliverable.len(), "delivering presence events");

        let mut callback = self.inner.callback.lock();
        if let Some(callback) = callback.as_mut() {
            for event in deliverable {
                callback(event);
            }
        }
        Ok(())
    }
}
