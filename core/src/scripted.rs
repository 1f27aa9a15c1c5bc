//! An in-memory engine that replays a canned response.
//!
//! Useful wherever a real network engine is unavailable: unit tests,
//! examples, and hosts that want to exercise the request pipeline offline.
//! The first step delivers the status line and header block; each further
//! step delivers one body chunk. Options are recorded rather than acted on,
//! `FailOnError` included. Setting an option after a transfer has started
//! rewinds the script, so a reused request replays the same response.

use std::collections::HashMap;

use crate::engine::{code, EngineCode, EngineOption, OptionValue, StepStatus, TransferEngine, TransferSink};
use crate::info::{DoubleInfo, InfoKey, InfoValue, IntInfo, StringInfo};

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    chunk_size: usize,
    failure: Option<EngineCode>,
    rejected: HashMap<EngineOption, EngineCode>,
    overrides: HashMap<InfoKey, InfoValue>,

    options: Vec<(EngineOption, OptionValue)>,
    steps: usize,
    finished: Option<StepStatus>,
    header_bytes: usize,
    body_bytes: usize,
    resets: usize,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    /// An engine answering `200 OK` with no headers and no body.
    pub fn new() -> Self {
        Self {
            status: 200,
            reason: "OK".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            chunk_size: usize::MAX,
            failure: None,
            rejected: HashMap::new(),
            overrides: HashMap::new(),
            options: Vec::new(),
            steps: 0,
            finished: None,
            header_bytes: 0,
            body_bytes: 0,
            resets: 0,
        }
    }

    pub fn status(mut self, status: u16, reason: impl Into<String>) -> Self {
        self.status = status;
        self.reason = reason.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Deliver the body `size` bytes per step.
    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Fail with `code` once everything has been delivered.
    pub fn fail_with(mut self, code: EngineCode) -> Self {
        self.failure = Some(code);
        self
    }

    /// Refuse `option` with `code` whenever it is set.
    pub fn reject(mut self, option: EngineOption, code: EngineCode) -> Self {
        self.rejected.insert(option, code);
        self
    }

    /// Answer `key` with `value` instead of the derived value.
    pub fn info_value(mut self, key: InfoKey, value: InfoValue) -> Self {
        self.overrides.insert(key, value);
        self
    }

    /// Every accepted `set_option` call since the last reset, in order.
    pub fn options(&self) -> &[(EngineOption, OptionValue)] {
        &self.options
    }

    /// The most recent value set for `option`.
    pub fn option(&self, option: EngineOption) -> Option<&OptionValue> {
        self.options
            .iter()
            .rev()
            .find(|(key, _)| *key == option)
            .map(|(_, value)| value)
    }

    pub fn set_count(&self, option: EngineOption) -> usize {
        self.options.iter().filter(|(key, _)| *key == option).count()
    }

    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    fn rewind(&mut self) {
        self.steps = 0;
        self.finished = None;
        self.header_bytes = 0;
        self.body_bytes = 0;
    }

    fn chunk_count(&self) -> usize {
        self.body.len().div_ceil(self.chunk_size)
    }

    fn deliver_head(&mut self, sink: &mut dyn TransferSink) {
        let status_line = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        self.header_bytes += status_line.len();
        sink.header_chunk(status_line.as_bytes());
        for (name, value) in &self.headers {
            let line = format!("{name}: {value}\r\n");
            self.header_bytes += line.len();
            sink.header_chunk(line.as_bytes());
        }
        self.header_bytes += 2;
        sink.header_chunk(b"\r\n");
    }

    fn last_url(&self) -> Option<String> {
        match self.option(EngineOption::Url) {
            Some(OptionValue::Str(url)) => Some(url.clone()),
            _ => None,
        }
    }

    fn header_value(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

impl TransferEngine for ScriptedEngine {
    fn set_option(&mut self, option: EngineOption, value: OptionValue) -> EngineCode {
        if let Some(code) = self.rejected.get(&option) {
            return *code;
        }
        if self.steps > 0 {
            self.rewind();
        }
        self.options.push((option, value));
        code::OK
    }

    fn step(&mut self, sink: &mut dyn TransferSink) -> StepStatus {
        if let Some(status) = self.finished {
            return status;
        }
        let index = self.steps;
        self.steps += 1;

        if index == 0 {
            self.deliver_head(sink);
        } else {
            let start = (index - 1).saturating_mul(self.chunk_size);
            let end = start.saturating_add(self.chunk_size).min(self.body.len());
            if start < end {
                sink.body_chunk(&self.body[start..end]);
                self.body_bytes += end - start;
            }
        }

        if index < self.chunk_count() {
            return StepStatus::Pending;
        }
        let status = match self.failure {
            Some(code) => StepStatus::Error(code),
            None => StepStatus::Done,
        };
        self.finished = Some(status);
        status
    }

    fn run_to_completion(&mut self, sink: &mut dyn TransferSink) -> EngineCode {
        loop {
            match self.step(sink) {
                StepStatus::Pending => continue,
                StepStatus::Done => return code::OK,
                StepStatus::Error(code) => return code,
            }
        }
    }

    fn info(&self, key: InfoKey) -> Option<InfoValue> {
        if let Some(value) = self.overrides.get(&key) {
            return Some(value.clone());
        }
        // Nothing is known before the header block has gone out.
        if self.steps == 0 {
            return None;
        }
        match key {
            InfoKey::Int(IntInfo::ResponseCode) => Some(InfoValue::Int(i64::from(self.status))),
            InfoKey::Int(IntInfo::HeaderSize) => Some(InfoValue::Int(self.header_bytes as i64)),
            InfoKey::Str(StringInfo::Url) => self.last_url().map(InfoValue::Str),
            InfoKey::Str(StringInfo::ContentType) => {
                self.header_value("Content-Type").map(InfoValue::Str)
            }
            InfoKey::Double(DoubleInfo::SizeDownload) => {
                Some(InfoValue::Double(self.body_bytes as f64))
            }
            _ => None,
        }
    }

    /// Forgets options and progress; the scripted response is kept.
    fn reset(&mut self) {
        self.options.clear();
        self.rewind();
        self.resets += 1;
    }
}
