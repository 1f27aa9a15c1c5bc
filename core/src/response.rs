//! Response accumulated from engine callbacks.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::engine::{TransferEngine, TransferSink};
use crate::headers::HeaderName;
use crate::info::{DoubleInfo, InfoSnapshot, IntInfo, StringInfo};
use crate::parser::{consume_line, LineEvent, ReadState};

/// The result of one transfer.
///
/// Created empty at the start of every perform; header pairs and body bytes
/// are appended as the engine delivers them. Engine info is captured into a
/// snapshot when the transfer ends.
#[derive(Debug, Clone)]
pub struct Response {
    id: Uuid,
    headers: Vec<(HeaderName, String)>,
    body: Vec<u8>,
    read_state: ReadState,
    info: InfoSnapshot,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            headers: Vec::new(),
            body: Vec::new(),
            read_state: ReadState::Status,
            info: InfoSnapshot::default(),
        }
    }

    pub(crate) fn capture_info<E: TransferEngine + ?Sized>(&mut self, engine: &E) {
        self.info = InfoSnapshot::capture(engine);
    }

    /// Identifier of the transfer that produced this response.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn read_state(&self) -> ReadState {
        self.read_state
    }

    pub fn info_str(&self, key: StringInfo) -> Option<&str> {
        self.info.string(key)
    }

    pub fn info_int(&self, key: IntInfo) -> Option<i64> {
        self.info.int(key)
    }

    pub fn info_f64(&self, key: DoubleInfo) -> Option<f64> {
        self.info.double(key)
    }

    /// Effective URL, after any redirects. Empty if the engine did not say.
    pub fn url(&self) -> &str {
        self.info_str(StringInfo::Url).unwrap_or("")
    }

    /// HTTP response code, or 0 if none was received.
    pub fn response_code(&self) -> i64 {
        self.info_int(IntInfo::ResponseCode).unwrap_or(0)
    }

    /// All header pairs in the order they were received.
    pub fn headers(&self) -> &[(HeaderName, String)] {
        &self.headers
    }

    /// First value for `name`, compared case-insensitively.
    pub fn header(&self, name: impl Into<HeaderName>) -> Option<&str> {
        let name = name.into();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in received order.
    pub fn header_all(&self, name: impl Into<HeaderName>) -> Vec<&str> {
        let name = name.into();
        self.headers
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as a JSON object. Anything else yields an empty map.
    pub fn body_json(&self) -> Map<String, Value> {
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl TransferSink for Response {
    fn header_chunk(&mut self, line: &[u8]) {
        match consume_line(line, &mut self.read_state) {
            LineEvent::Header(name, value) => self.headers.push((name, value)),
            LineEvent::Body(bytes) => self.body.extend_from_slice(bytes),
            LineEvent::Dropped => {
                tracing::trace!(transfer = %self.id, "dropping header line without colon");
            }
            LineEvent::Status | LineEvent::EndOfHeaders => {}
        }
    }

    fn body_chunk(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
}
