//! The transfer engine capability.
//!
//! # Design
//! The engine does the actual network work (DNS, TCP/TLS, protocol framing)
//! for one transfer and is injected by the caller, keeping this crate free
//! of any I/O. Byte callbacks are delivered through the `TransferSink`
//! passed into every `step` / `run_to_completion` call: the sink *is* the
//! per-transfer state the engine writes into, so no opaque pointers are
//! needed to find it again.
//!
//! Codes follow the usual transfer-library convention: `0` is success,
//! anything else is an engine-specific failure.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::OnceCell;

use crate::info::{InfoKey, InfoValue};
use crate::option::PostField;

/// Numeric status reported by an engine call.
pub type EngineCode = i32;

/// Engine codes this crate produces or interprets itself.
pub mod code {
    use super::EngineCode;

    pub const OK: EngineCode = 0;
    pub const UNSUPPORTED_PROTOCOL: EngineCode = 1;
    pub const FAILED_INIT: EngineCode = 2;
    pub const URL_MALFORMAT: EngineCode = 3;
    pub const COULDNT_RESOLVE_HOST: EngineCode = 6;
    pub const COULDNT_CONNECT: EngineCode = 7;
    pub const HTTP_RETURNED_ERROR: EngineCode = 22;
    pub const OPERATION_TIMEDOUT: EngineCode = 28;
    pub const BAD_FUNCTION_ARGUMENT: EngineCode = 43;
    pub const UNKNOWN_OPTION: EngineCode = 48;
    pub const RECV_ERROR: EngineCode = 56;

    /// Generic description for a code, for engines without their own table.
    pub fn describe(code: EngineCode) -> &'static str {
        match code {
            OK => "No error",
            UNSUPPORTED_PROTOCOL => "Unsupported protocol",
            FAILED_INIT => "Failed initialization",
            URL_MALFORMAT => "URL using bad/illegal format or missing URL",
            COULDNT_RESOLVE_HOST => "Couldn't resolve host name",
            COULDNT_CONNECT => "Couldn't connect to server",
            HTTP_RETURNED_ERROR => "HTTP response code said error",
            OPERATION_TIMEDOUT => "Timeout was reached",
            BAD_FUNCTION_ARGUMENT => "A function was given a bad argument",
            UNKNOWN_OPTION => "An unknown option was passed in",
            RECV_ERROR => "Failure when receiving data from the peer",
            _ => "Unknown error",
        }
    }
}

/// Engine-level option keys.
///
/// The discriminants are stable and are what C engines receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EngineOption {
    Url = 0,
    Port = 1,
    FailOnError = 2,
    UserPwd = 3,
    Proxy = 4,
    ProxyUserPwd = 5,
    ProxyPort = 6,
    Timeout = 7,
    ConnectTimeout = 8,
    LowSpeedLimit = 9,
    LowSpeedTime = 10,
    Range = 11,
    ResumeFrom = 12,
    Cookie = 13,
    CookieFile = 14,
    CookieJar = 15,
    FollowLocation = 16,
    MaxRedirs = 17,
    MaxConnects = 18,
    AutoReferer = 19,
    KrbLevel = 20,
    HttpHeader = 21,
    SslCert = 22,
    SslCertType = 23,
    SslKey = 24,
    SslKeyPasswd = 25,
    SslKeyType = 26,
    SslVersion = 27,
    SslVerifyPeer = 28,
    SslVerifyHost = 29,
    CaInfo = 30,
    CaPath = 31,
    SslCipherList = 32,
    PinnedPublicKey = 33,
    Quote = 34,
    PostQuote = 35,
    FtpPort = 36,
    FtpResponseTimeout = 37,
    SshPublicKeyFile = 38,
    SshPrivateKeyFile = 39,
    HttpGet = 40,
    Post = 41,
    NoBody = 42,
    CustomRequest = 43,
    PostFields = 44,
    HttpPost = 45,
    MailFrom = 46,
    MailRcpt = 47,
}

/// Typed value for an engine option. Booleans are sent as `Long(0 | 1)`.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Long(i64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<String>),
    /// A complete multipart form, fields in send order.
    Form(Vec<PostField>),
}

impl OptionValue {
    pub fn flag(on: bool) -> Self {
        OptionValue::Long(i64::from(on))
    }
}

/// Result of one non-blocking engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// More work remains; call `step` again later.
    Pending,
    /// The transfer completed successfully.
    Done,
    /// The transfer failed with the given engine code.
    Error(EngineCode),
}

/// Receiver for the bytes an engine produces during a step.
pub trait TransferSink {
    /// One physical response header line, including its trailing CRLF.
    fn header_chunk(&mut self, line: &[u8]);

    /// A chunk of response body bytes.
    fn body_chunk(&mut self, chunk: &[u8]);
}

/// One underlying transfer handle.
///
/// Dropping the engine releases its resources.
pub trait TransferEngine: Send + 'static {
    /// Process-wide library initialization. Runs once per process for each
    /// engine type, before the first `Request` using that type is created.
    fn global_init()
    where
        Self: Sized,
    {
    }

    fn set_option(&mut self, option: EngineOption, value: OptionValue) -> EngineCode;

    /// Perform one bounded unit of work, writing any received bytes to `sink`.
    fn step(&mut self, sink: &mut dyn TransferSink) -> StepStatus;

    /// Block until the transfer finishes.
    fn run_to_completion(&mut self, sink: &mut dyn TransferSink) -> EngineCode;

    fn info(&self, key: InfoKey) -> Option<InfoValue>;

    fn describe_error(&self, code: EngineCode) -> String {
        code::describe(code).to_string()
    }

    /// Clear every option and any in-flight transfer state.
    fn reset(&mut self);
}

static INITIALIZED: OnceCell<Mutex<HashSet<TypeId>>> = OnceCell::new();

/// Run `E::global_init` the first time a request for `E` is created.
///
/// Each engine type is initialized once. The lock is held across the call,
/// so a concurrent first request waits until initialization has finished.
pub(crate) fn ensure_global_init<E: TransferEngine>() {
    let initialized = INITIALIZED.get_or_init(|| Mutex::new(HashSet::new()));
    let mut initialized = initialized.lock().unwrap_or_else(PoisonError::into_inner);
    if initialized.insert(TypeId::of::<E>()) {
        tracing::debug!(engine = std::any::type_name::<E>(), "initializing transfer engine");
        E::global_init();
    }
}
