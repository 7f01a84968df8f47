//! Event log parsing and presence reconciliation state

use taglink_types::{TagEvent, TagEventKind};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::{EVENT_POS_MASK, POWER_CYCLE_JUMP};

/// Advertised notification token, decoded into its two wire fields.
///
/// The device packs `position * 1000 + tag_count` into one integer.
/// This is a stable wire contract of the event channel, kept as two
/// explicit fields on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueToken {
    /// Device event log position
    pub position: u64,

    /// Number of tags currently in the field
    pub tag_count: u32,
}

impl ValueToken {
    /// Parses an advertised token.
    ///
    /// Only the leading digits count; anything unparsable decodes as
    /// 0, matching the device contract for an empty advertisement.
    pub fn parse(raw: &str) -> Self {
        let digits_end = raw
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len());
        let value: u64 = raw[..digits_end].parse().unwrap_or(0);
        Self {
            position: value / 1000,
            tag_count: (value % 1000) as u32,
        }
    }
}

/// Parsed body of an event log fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLog {
    /// Candidate event lines in log storage order, marker excluded
    pub lines: Vec<String>,

    /// New cursor value from the trailing `@` marker
    pub marker: u64,
}

impl EventLog {
    /// Splits an event log body into candidate lines and the position
    /// marker. When several `@` lines are present the last one wins.
    ///
    /// # Errors
    ///
    /// A body without a parsable marker line cannot be reconciled and
    /// is reported as an error; the caller must not advance its
    /// cursor in that case.
    pub fn parse(body: &str) -> Result<Self> {
        let mut lines = Vec::new();
        let mut marker_line: Option<&str> = None;
        for line in body.lines() {
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix('@') {
                marker_line = Some(rest);
            } else {
                lines.push(line.to_owned());
            }
        }
        let Some(raw_marker) = marker_line else {
            return Err(Error::MissingPositionMarker);
        };
        let marker = raw_marker
            .trim()
            .parse()
            .map_err(|_| Error::InvalidPositionMarker(raw_marker.to_owned()))?;
        trace!(lines = lines.len(), marker, "parsed event log segment");
        Ok(Self { lines, marker })
    }
}

/// Parses one event log line.
///
/// Lines have the fixed shape `TTTTTTTT:K=tagid` with an 8-hex-digit
/// timestamp and a one-character kind marker. Malformed lines yield
/// `None` and are skipped by callers, never errored.
pub fn parse_event_line(line: &str) -> Option<TagEvent> {
    // Log lines are ASCII; anything else is noise.
    if line.len() < 12 || !line.is_ascii() {
        return None;
    }
    let bytes = line.as_bytes();
    if bytes[8] != b':' || bytes[10] != b'=' {
        return None;
    }
    let timestamp = u32::from_str_radix(&line[..8], 16).ok()?;
    let kind = TagEventKind::from_marker(bytes[9] as char)?;
    Some(TagEvent {
        timestamp,
        kind,
        tag_id: line[11..].to_owned(),
    })
}

/// First-subscription presence reconstruction.
///
/// Scans the log window backward, matching the most recent arrival
/// line of each tag currently in the field. Matched tags get their
/// logged timestamp; tags whose arrival predates the window are
/// synthesized at timestamp 0. Returned order is unspecified.
pub fn synthesize_presence(lines: &[String], present: &[String]) -> Vec<TagEvent> {
    let mut matched = vec![false; present.len()];
    let mut events = Vec::with_capacity(present.len());
    for line in lines.iter().rev() {
        let Some(event) = parse_event_line(line) else {
            continue;
        };
        if event.kind != TagEventKind::Arrival {
            continue;
        }
        let slot = present
            .iter()
            .enumerate()
            .find(|(i, id)| !matched[*i] && **id == event.tag_id);
        if let Some((i, _)) = slot {
            matched[i] = true;
            events.push(event);
        }
    }
    for (i, tag_id) in present.iter().enumerate() {
        if !matched[i] {
            events.push(TagEvent {
                timestamp: 0,
                kind: TagEventKind::Arrival,
                tag_id: tag_id.clone(),
            });
        }
    }
    events
}

/// Presence reconciliation state, one per reader instance.
///
/// Tracks the log read cursor, the advertised-position bookkeeping
/// used for power-cycle detection, and the timestamp guard that
/// suppresses redelivery across overlapping fetch windows. Never
/// persisted across restarts.
#[derive(Debug, Default)]
pub struct EventCursor {
    log_pos: u64,
    prev_token_pos: u64,
    last_tag_count: u32,
    last_stamp: u32,
    first_poll: bool,
}

impl EventCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log position the next fetch should start from.
    pub fn log_pos(&self) -> u64 {
        self.log_pos
    }

    /// Number of tags the last observed token advertised.
    pub fn last_tag_count(&self) -> u32 {
        self.last_tag_count
    }

    /// Whether the next poll is the first one after (re)subscription.
    pub fn is_first_poll(&self) -> bool {
        self.first_poll
    }

    /// Enters the first-poll state and resets the delivery guard.
    /// Called when a callback is (re)registered.
    pub fn arm(&mut self) {
        self.first_poll = true;
        self.last_stamp = 0;
    }

    /// Leaves the first-poll state after a successful first cycle.
    pub fn finish_first_poll(&mut self) {
        self.first_poll = false;
    }

    /// Records an advertised token, returning true when the position
    /// jump signals a device power cycle. The log cursor resets to 0
    /// in that case since the old position is meaningless.
    pub fn observe(&mut self, token: ValueToken) -> bool {
        let delta = token.position.wrapping_sub(self.prev_token_pos) & EVENT_POS_MASK;
        self.prev_token_pos = token.position;
        self.last_tag_count = token.tag_count;
        if delta > POWER_CYCLE_JUMP {
            debug!(delta, "event position jump, resetting log cursor");
            self.log_pos = 0;
            true
        } else {
            false
        }
    }

    /// Stores the marker of a successfully fetched log segment.
    pub fn store_marker(&mut self, marker: u64) {
        self.log_pos = marker;
    }

    /// Timestamp guard: whether an event at `stamp` may be delivered.
    /// Advances the guard on acceptance, so an already delivered
    /// window is not redelivered by an overlapping or retried fetch.
    pub fn accept(&mut self, stamp: u32) -> bool {
        if stamp >= self.last_stamp {
            self.last_stamp = stamp;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_parsing() {
        let token = ValueToken::parse("1404010");
        assert_eq!(token.position, 1404);
        assert_eq!(token.tag_count, 10);

        let token = ValueToken::parse("405621");
        assert_eq!(token.position, 405);
        assert_eq!(token.tag_count, 621);
    }

    #[test]
    fn test_token_ignores_trailing_garbage() {
        let token = ValueToken::parse("123abc");
        assert_eq!(token.position, 0);
        assert_eq!(token.tag_count, 123);
    }

    #[test]
    fn test_unparsable_token_decodes_as_zero() {
        assert_eq!(ValueToken::parse(""), ValueToken { position: 0, tag_count: 0 });
        assert_eq!(ValueToken::parse("x"), ValueToken { position: 0, tag_count: 0 });
    }

    #[test]
    fn test_event_line_parsing() {
        let event = parse_event_line("0000791a:+=4a0052fa93e12b").unwrap();
        assert_eq!(event.timestamp, 0x791a);
        assert_eq!(event.kind, TagEventKind::Arrival);
        assert_eq!(event.tag_id, "4a0052fa93e12b");

        let event = parse_event_line("00007a00:-=04b1c2").unwrap();
        assert_eq!(event.kind, TagEventKind::Removal);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        assert_eq!(parse_event_line(""), None);
        assert_eq!(parse_event_line("0000791a:+="), None);
        assert_eq!(parse_event_line("0000791a++=aa"), None);
        assert_eq!(parse_event_line("0000791a:+-aa"), None);
        assert_eq!(parse_event_line("zzzz791a:+=aa"), None);
        assert_eq!(parse_event_line("0000791a:~=aa"), None);
        assert_eq!(parse_event_line("0000791à:+=aa"), None);
    }

    #[test]
    fn test_event_log_parsing() {
        let body = "0000791a:+=4a0052fa\n00007a00:-=4a0052fa\n@12345\n";
        let log = EventLog::parse(body).unwrap();
        assert_eq!(log.lines.len(), 2);
        assert_eq!(log.marker, 12345);
    }

    #[test]
    fn test_marker_only_body() {
        let log = EventLog::parse("@777").unwrap();
        assert!(log.lines.is_empty());
        assert_eq!(log.marker, 777);
    }

    #[test]
    fn test_last_marker_wins() {
        let log = EventLog::parse("@100\n0000791a:+=aa\n@200\n").unwrap();
        assert_eq!(log.marker, 200);
        assert_eq!(log.lines.len(), 1);
    }

    #[test]
    fn test_missing_marker_is_an_error() {
        let err = EventLog::parse("0000791a:+=aa\n").unwrap_err();
        assert!(matches!(err, Error::MissingPositionMarker));
    }

    #[test]
    fn test_bad_marker_is_an_error() {
        let err = EventLog::parse("@xyz\n").unwrap_err();
        assert!(matches!(err, Error::InvalidPositionMarker(_)));
    }

    #[test]
    fn test_power_cycle_resets_cursor() {
        let mut cursor = EventCursor::new();
        cursor.observe(ValueToken { position: 100, tag_count: 1 });
        cursor.store_marker(500);

        // Small advance keeps the cursor.
        assert!(!cursor.observe(ValueToken { position: 105, tag_count: 1 }));
        assert_eq!(cursor.log_pos(), 500);

        // A jump beyond the threshold resets it.
        assert!(cursor.observe(ValueToken { position: 105 + 20000, tag_count: 1 }));
        assert_eq!(cursor.log_pos(), 0);
    }

    #[test]
    fn test_position_wraparound_is_absorbed() {
        let mut cursor = EventCursor::new();
        cursor.observe(ValueToken { position: 0x7FFF0, tag_count: 0 });
        cursor.store_marker(42);
        assert!(!cursor.observe(ValueToken { position: 5, tag_count: 0 }));
        assert_eq!(cursor.log_pos(), 42);
    }

    #[test]
    fn test_observe_records_tag_count() {
        let mut cursor = EventCursor::new();
        cursor.observe(ValueToken { position: 1, tag_count: 3 });
        assert_eq!(cursor.last_tag_count(), 3);
    }

    #[test]
    fn test_timestamp_guard() {
        let mut cursor = EventCursor::new();
        assert!(cursor.accept(10));
        assert!(!cursor.accept(9));
        assert!(cursor.accept(10));
        assert!(cursor.accept(11));
        assert!(!cursor.accept(10));
    }

    #[test]
    fn test_arm_resets_guard_and_enters_first_poll() {
        let mut cursor = EventCursor::new();
        assert!(!cursor.is_first_poll());
        assert!(cursor.accept(50));
        cursor.arm();
        assert!(cursor.is_first_poll());
        assert!(cursor.accept(1));
        cursor.finish_first_poll();
        assert!(!cursor.is_first_poll());
    }

    #[test]
    fn test_synthesize_matches_most_recent_arrival() {
        let lines = vec![
            "00000064:+=aaaa".to_owned(),
            "000000c8:-=aaaa".to_owned(),
            "0000012c:+=aaaa".to_owned(),
        ];
        let present = vec!["aaaa".to_owned()];
        let events = synthesize_presence(&lines, &present);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 0x12c);
        assert_eq!(events[0].kind, TagEventKind::Arrival);
    }

    #[test]
    fn test_synthesize_unmatched_tags_at_timestamp_zero() {
        let lines = vec![
            "00000064:+=aaaa".to_owned(),
            "000000c8:+=bbbb".to_owned(),
        ];
        let present = vec!["aaaa".to_owned(), "bbbb".to_owned(), "cccc".to_owned()];
        let mut events = synthesize_presence(&lines, &present);
        events.sort_by_key(|e| e.timestamp);

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].tag_id, "cccc");
        assert_eq!(events[0].timestamp, 0);
        assert_eq!(events[1].tag_id, "aaaa");
        assert_eq!(events[1].timestamp, 0x64);
        assert_eq!(events[2].tag_id, "bbbb");
        assert_eq!(events[2].timestamp, 0xc8);
        assert!(events.iter().all(|e| e.kind == TagEventKind::Arrival));
    }

    #[test]
    fn test_synthesize_ignores_removals_and_absent_tags() {
        let lines = vec![
            "00000064:-=aaaa".to_owned(),
            "000000c8:+=dddd".to_owned(),
        ];
        let present = vec!["aaaa".to_owned()];
        let events = synthesize_presence(&lines, &present);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tag_id, "aaaa");
        assert_eq!(events[0].timestamp, 0);
    }
}
