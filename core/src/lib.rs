//! Request/response core for a multi-protocol transfer client.
//!
//! # Overview
//! A `Request` holds an ordered list of declarative `RequestOption`s and an
//! injected `TransferEngine` that does the actual network work. Performing
//! the request applies the options to the engine, feeds the engine's header
//! and body callbacks into a fresh `Response`, and returns it (or a
//! `TransferError` carrying it).
//!
//! # Design
//! - The core does no I/O of its own; engines are supplied by the host,
//!   either in Rust or through the C vtable in the ffi crate.
//! - Sync transfers block in `TransferEngine::run_to_completion`. Async
//!   transfers run one engine step per unit of work on a `Scheduler` and
//!   finish through a callback or a `Promise`.
//! - Header lines are parsed incrementally as they arrive; see `parser`.
//! - Transfer info is copied into the response when the transfer ends, so a
//!   response stays valid after its request is reset or dropped.
//! - `ClientConfig` supplies shared defaults from JSON or `XFER_*`
//!   environment variables.

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod headers;
pub mod info;
pub mod option;
pub mod parser;
pub mod pipeline;
pub mod promise;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod scripted;

pub use config::ClientConfig;
pub use driver::{Confirmation, DriverState};
pub use engine::{code, EngineCode, EngineOption, OptionValue, StepStatus, TransferEngine, TransferSink};
pub use error::{ConfigError, TransferError};
pub use headers::HeaderName;
pub use info::{DoubleInfo, InfoKey, InfoValue, IntInfo, StringInfo};
pub use option::{HttpMethod, PostField, PostPayload, RequestOption, TlsVersion};
pub use parser::ReadState;
pub use promise::Promise;
pub use request::Request;
pub use response::Response;
pub use scheduler::{Scheduler, Work};
pub use scripted::ScriptedEngine;
