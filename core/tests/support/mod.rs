//! Shared helpers for tests that talk to the live mock server.
//!
//! `UreqEngine` is a small HTTP-only engine over ureq. It performs the whole
//! exchange on its first step, then replays the result the way a streaming
//! engine would: status line, header lines and the blank line first, then
//! the body a chunk per step.

#![allow(dead_code)]

use std::time::Duration;

use ureq::ResponseExt;
use xfer_core::{
    code, DoubleInfo, EngineCode, EngineOption, InfoKey, InfoValue, IntInfo, OptionValue,
    StepStatus, StringInfo, TransferEngine, TransferSink,
};

/// Start the mock server on a random port and return its base URL.
pub fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// A port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/hello")
}

struct Fetched {
    head: Vec<String>,
    body: Vec<u8>,
}

#[derive(Default)]
pub struct UreqEngine {
    url: Option<String>,
    method: Option<String>,
    header_lines: Vec<String>,
    body: Option<Vec<u8>>,
    timeout: Option<u64>,
    follow_location: bool,
    chunk_size: usize,

    fetched: Option<Fetched>,
    status: Option<u16>,
    effective_url: Option<String>,
    content_type: Option<String>,
    header_size: usize,
    delivered: usize,
    steps: usize,
    finished: Option<StepStatus>,
}

impl UreqEngine {
    pub fn new() -> Self {
        Self {
            chunk_size: usize::MAX,
            ..Self::default()
        }
    }

    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    fn rewind(&mut self) {
        self.fetched = None;
        self.status = None;
        self.effective_url = None;
        self.content_type = None;
        self.header_size = 0;
        self.delivered = 0;
        self.steps = 0;
        self.finished = None;
    }

    fn method(&self) -> &str {
        match (&self.method, &self.body) {
            (Some(method), _) => method,
            (None, Some(_)) => "POST",
            (None, None) => "GET",
        }
    }

    fn fetch(&mut self) -> Result<Fetched, EngineCode> {
        let url = self.url.clone().ok_or(code::URL_MALFORMAT)?;
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(if self.follow_location { 10 } else { 0 })
            .timeout_global(self.timeout.map(Duration::from_secs))
            .build()
            .new_agent();

        let body = self.body.clone().unwrap_or_default();
        let result = match self.method() {
            "GET" => with_headers(agent.get(&url), &self.header_lines).call(),
            "HEAD" => with_headers(agent.head(&url), &self.header_lines).call(),
            "DELETE" => with_headers(agent.delete(&url), &self.header_lines).call(),
            "POST" => with_headers(agent.post(&url), &self.header_lines).send(&body[..]),
            "PUT" => with_headers(agent.put(&url), &self.header_lines).send(&body[..]),
            _ => return Err(code::UNSUPPORTED_PROTOCOL),
        };
        let mut response = result.map_err(|err| match err {
            ureq::Error::Io(_) => code::COULDNT_CONNECT,
            _ => code::RECV_ERROR,
        })?;

        let status = response.status();
        let mut head = vec![format!(
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )];
        for (name, value) in response.headers() {
            head.push(format!(
                "{}: {}\r\n",
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        head.push("\r\n".to_string());

        self.status = Some(status.as_u16());
        self.effective_url = Some(response.get_uri().to_string());
        self.content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = if self.method() == "HEAD" {
            Vec::new()
        } else {
            response.body_mut().read_to_vec().map_err(|_| code::RECV_ERROR)?
        };
        Ok(Fetched { head, body })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, lines: &[String]) -> ureq::RequestBuilder<B> {
    for line in lines {
        // "Name:" suppresses a header; ureq has nothing to suppress.
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim_start();
            if !value.is_empty() {
                builder = builder.header(name, value);
            }
        }
    }
    builder
}

impl TransferEngine for UreqEngine {
    fn set_option(&mut self, option: EngineOption, value: OptionValue) -> EngineCode {
        self.rewind();
        match (option, value) {
            (EngineOption::Url, OptionValue::Str(url)) => self.url = Some(url),
            (EngineOption::HttpHeader, OptionValue::List(lines)) => self.header_lines = lines,
            (EngineOption::PostFields, OptionValue::Bytes(bytes)) => self.body = Some(bytes),
            (EngineOption::Post, OptionValue::Long(1)) => self.method = Some("POST".to_string()),
            (EngineOption::HttpGet, OptionValue::Long(1)) => self.method = Some("GET".to_string()),
            (EngineOption::NoBody, OptionValue::Long(1)) => self.method = Some("HEAD".to_string()),
            (EngineOption::CustomRequest, OptionValue::Str(verb)) => self.method = Some(verb),
            (EngineOption::Timeout, OptionValue::Long(secs)) => self.timeout = Some(secs as u64),
            (EngineOption::FollowLocation, OptionValue::Long(on)) => self.follow_location = on != 0,
            // Enforced by the driver.
            (EngineOption::FailOnError, _) => {}
            _ => return code::UNKNOWN_OPTION,
        }
        code::OK
    }

    fn step(&mut self, sink: &mut dyn TransferSink) -> StepStatus {
        if let Some(status) = self.finished {
            return status;
        }
        let index = self.steps;
        self.steps += 1;

        if index == 0 {
            match self.fetch() {
                Ok(fetched) => self.fetched = Some(fetched),
                Err(code) => {
                    self.finished = Some(StepStatus::Error(code));
                    return StepStatus::Error(code);
                }
            }
        }
        let Some(fetched) = &self.fetched else {
            return StepStatus::Error(code::FAILED_INIT);
        };

        if index == 0 {
            for line in &fetched.head {
                self.header_size += line.len();
                sink.header_chunk(line.as_bytes());
            }
        } else {
            let start = self.delivered;
            let end = start.saturating_add(self.chunk_size).min(fetched.body.len());
            sink.body_chunk(&fetched.body[start..end]);
            self.delivered = end;
        }

        if self.delivered < fetched.body.len() {
            return StepStatus::Pending;
        }
        self.finished = Some(StepStatus::Done);
        StepStatus::Done
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
        match key {
            InfoKey::Int(IntInfo::ResponseCode) => self.status.map(|s| InfoValue::Int(i64::from(s))),
            InfoKey::Int(IntInfo::HeaderSize) => Some(InfoValue::Int(self.header_size as i64)),
            InfoKey::Str(StringInfo::Url) => {
                self.effective_url.clone().or_else(|| self.url.clone()).map(InfoValue::Str)
            }
            InfoKey::Str(StringInfo::ContentType) => self.content_type.clone().map(InfoValue::Str),
            InfoKey::Double(DoubleInfo::SizeDownload) => Some(InfoValue::Double(self.delivered as f64)),
            _ => None,
        }
    }

    fn reset(&mut self) {
        *self = UreqEngine::new().chunked(self.chunk_size);
    }
}
