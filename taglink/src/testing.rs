//! Scripted in-memory reader used by the unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use taglink_transport::error::{Error as TransportError, Result as TransportResult};
use taglink_transport::Transport;

const BLOCK: usize = 4;
const TAG_BYTES: usize = 180;

struct TagState {
    memory: Vec<u8>,
    locked: HashSet<u32>,
    special: HashSet<u32>,
}

impl TagState {
    fn new() -> Self {
        Self {
            memory: vec![0; TAG_BYTES],
            locked: HashSet::new(),
            special: HashSet::new(),
        }
    }
}

/// Fake reader speaking the device's HTTP query contract.
///
/// Interprets tag commands against in-memory tag state, serves the
/// attribute map, and replays scripted event log bodies, so tests can
/// drive the full client stack without a device on the network. State
/// is shared across clones; tests keep a clone as a probe after moving
/// the original into the client.
#[derive(Clone)]
pub(crate) struct MockReader {
    inner: Arc<Mutex<MockState>>,
}

struct MockState {
    tags: HashMap<String, TagState>,
    present: Vec<String>,
    attrs: Map<String, Value>,
    // `None` entries script a failed fetch at that point in the sequence.
    event_bodies: VecDeque<Option<String>>,
    requests: Vec<String>,
    uploads: Vec<String>,
    attr_map_fetches: usize,
}

impl MockReader {
    pub(crate) fn new() -> Self {
        let mut tags = HashMap::new();
        tags.insert("04b1c2d3e4".to_owned(), TagState::new());

        let mut attrs = Map::new();
        attrs.insert("nTags".to_owned(), Value::from(2));
        attrs.insert("refreshRate".to_owned(), Value::from(20));
        attrs.insert("advertisedValue".to_owned(), Value::from("0"));

        Self {
            inner: Arc::new(Mutex::new(MockState {
                tags,
                present: vec!["04b1c2d3e4".to_owned()],
                attrs,
                event_bodies: VecDeque::new(),
                requests: Vec::new(),
                uploads: Vec::new(),
                attr_map_fetches: 0,
            })),
        }
    }

    pub(crate) fn add_tag(&self, tag_id: &str) {
        let mut state = self.inner.lock();
        state.tags.insert(tag_id.to_owned(), TagState::new());
        state.present.push(tag_id.to_owned());
    }

    pub(crate) fn set_present_tags(&self, tag_ids: &[&str]) {
        self.inner.lock().present = tag_ids.iter().map(|id| (*id).to_owned()).collect();
    }

    pub(crate) fn set_locked(&self, tag_id: &str, blocks: &[u32]) {
        let mut state = self.inner.lock();
        let tag = state.tags.get_mut(tag_id).unwrap();
        tag.locked.extend(blocks.iter().copied());
    }

    pub(crate) fn set_special(&self, tag_id: &str, blocks: &[u32]) {
        let mut state = self.inner.lock();
        let tag = state.tags.get_mut(tag_id).unwrap();
        tag.special.extend(blocks.iter().copied());
    }

    pub(crate) fn set_attr(&self, name: &str, value: Value) {
        self.inner.lock().attrs.insert(name.to_owned(), value);
    }

    pub(crate) fn push_event_body(&self, body: &str) {
        self.inner.lock().event_bodies.push_back(Some(body.to_owned()));
    }

    pub(crate) fn fail_next_fetch(&self) {
        self.inner.lock().event_bodies.push_back(None);
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.inner.lock().requests.clone()
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        self.inner.lock().uploads.clone()
    }

    pub(crate) fn attr_map_fetches(&self) -> usize {
        self.inner.lock().attr_map_fetches
    }
}

impl MockState {
    fn dispatch(&mut self, path: &str) -> String {
        if path == "rfid.json" {
            self.attr_map_fetches += 1;
            return Value::Object(self.attrs.clone()).to_string();
        }
        if let Some(query) = path.strip_prefix("rfid.json?") {
            let params = query_params(query);
            if params.contains_key("a") {
                return self.handle_command(&params);
            }
            for (name, value) in &params {
                let parsed = value
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(value.as_str()));
                self.attrs.insert(name.clone(), parsed);
            }
            return "{}".to_owned();
        }
        if path.starts_with("events.txt") {
            return self
                .event_bodies
                .pop_front()
                .flatten()
                .unwrap_or_else(|| "@0\n".to_owned());
        }
        panic!("mock reader got unexpected path: {path}");
    }

    fn handle_command(&mut self, params: &HashMap<String, String>) -> String {
        let op = params["a"].as_str();
        match op {
            "reset" => r#"{"err":0}"#.to_owned(),
            "list" => Value::from(self.present.clone()).to_string(),
            "info" => {
                if self.tag(params).is_some() {
                    r#"{"err":0,"type":7,"size":180,"usable":144,"blksize":4,"fblk":4,"lblk":39}"#
                        .to_owned()
                } else {
                    r#"{"err":1002}"#.to_owned()
                }
            }
            "read" => {
                let (block, count) = block_and_count(params);
                let Some(tag) = self.tag(params) else {
                    return r#"{"err":1002}"#.to_owned();
                };
                let start = block as usize * BLOCK;
                let end = start + count as usize;
                if end > tag.memory.len() {
                    return out_of_range(&tag.memory);
                }
                format!(r#"{{"err":0,"res":"{}"}}"#, hex::encode(&tag.memory[start..end]))
            }
            "writ" => {
                let block = number(params, "b");
                let payload = hex::decode(&params["w"]).unwrap();
                self.write_at(params, block, &payload)
            }
            "lock" => {
                let (block, count) = block_and_count(params);
                let Some(tag) = self.tag_mut(params) else {
                    return r#"{"err":1002}"#.to_owned();
                };
                tag.locked.extend(block..block + count);
                r#"{"err":0}"#.to_owned()
            }
            "chkl" | "chks" => {
                let (block, count) = block_and_count(params);
                let Some(tag) = self.tag(params) else {
                    return r#"{"err":1002}"#.to_owned();
                };
                let set = if op == "chkl" { &tag.locked } else { &tag.special };
                let mut bytes = vec![0u8; (count as usize).div_ceil(8)];
                for i in 0..count {
                    if set.contains(&(block + i)) {
                        bytes[i as usize / 8] |= 1 << (i % 8);
                    }
                }
                format!(r#"{{"err":0,"bitmap":"{}"}}"#, hex::encode(bytes))
            }
            other => panic!("mock reader got unexpected command: {other}"),
        }
    }

    fn write_at(&mut self, params: &HashMap<String, String>, block: u32, payload: &[u8]) -> String {
        let Some(tag) = self.tag_mut(params) else {
            return r#"{"err":1002}"#.to_owned();
        };
        let start = block as usize * BLOCK;
        let end = start + payload.len();
        if end > tag.memory.len() {
            return out_of_range(&tag.memory);
        }
        let last = block + (payload.len().div_ceil(BLOCK) as u32).max(1) - 1;
        for blk in block..=last {
            if tag.locked.contains(&blk) {
                return format!(r#"{{"err":18,"errBlk":{blk}}}"#);
            }
        }
        tag.memory[start..end].copy_from_slice(payload);
        r#"{"err":0}"#.to_owned()
    }

    fn tag(&self, params: &HashMap<String, String>) -> Option<&TagState> {
        self.tags.get(params.get("t")?)
    }

    fn tag_mut(&mut self, params: &HashMap<String, String>) -> Option<&mut TagState> {
        self.tags.get_mut(params.get("t")?)
    }
}

fn query_params(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

fn number(params: &HashMap<String, String>, name: &str) -> u32 {
    params.get(name).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn block_and_count(params: &HashMap<String, String>) -> (u32, u32) {
    (number(params, "b"), number(params, "n"))
}

fn out_of_range(memory: &[u8]) -> String {
    format!(r#"{{"err":23,"errBlk":{}}}"#, memory.len() / BLOCK)
}

#[async_trait]
impl Transport for MockReader {
    async fn fetch(&mut self, path: &str) -> TransportResult<Bytes> {
        let mut state = self.inner.lock();
        state.requests.push(path.to_owned());
        if path.starts_with("events.txt") && matches!(state.event_bodies.front(), Some(None)) {
            state.event_bodies.pop_front();
            return Err(TransportError::ReadTimeout);
        }
        let body = state.dispatch(path);
        Ok(Bytes::from(body))
    }

    async fn upload(&mut self, name: &str, data: &[u8]) -> TransportResult<Bytes> {
        let mut state = self.inner.lock();
        state.uploads.push(name.to_owned());
        let Some(query) = name.strip_prefix("Rfid:") else {
            panic!("mock reader got unexpected upload name: {name}");
        };
        let params = query_params(query);
        let block = number(&params, "b");
        let reply = state.write_at(&params, block, data);
        Ok(Bytes::from(reply))
    }

    fn remote_addr(&self) -> String {
        "mock:80".to_owned()
    }
}
