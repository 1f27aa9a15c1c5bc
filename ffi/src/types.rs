//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Requests and responses cross the boundary as opaque handles. Options are
//! identified by small integer ids grouped by payload type, so C callers
//! never build a tagged union; each id group converts into the matching
//! `RequestOption` here, keeping `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use xfer_core::{
    HttpMethod, Request, RequestOption, Response, TlsVersion, TransferError,
};

use crate::engine::FfiEngine;

/// Opaque handle to a request driving a C engine.
pub struct FfiRequest {
    pub(crate) inner: Request<FfiEngine>,
}

/// Opaque handle to a finished transfer's response.
pub struct FfiResponse {
    pub(crate) inner: Response,
}

/// Allocate a C string, dropping interior NULs.
pub(crate) fn into_c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

// ---------------------------------------------------------------------------
// Option ids
// ---------------------------------------------------------------------------

/// Options carrying a string.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XferStrOption {
    Url = 0,
    UserPwd = 1,
    Proxy = 2,
    ProxyUserPwd = 3,
    Range = 4,
    Cookie = 5,
    CookieFile = 6,
    CookieJar = 7,
    KrbLevel = 8,
    SslCert = 9,
    SslCertType = 10,
    SslKey = 11,
    SslKeyPwd = 12,
    SslKeyType = 13,
    SslCaInfo = 14,
    SslCaPath = 15,
    SslPinnedPublicKey = 16,
    FtpPort = 17,
    SshPublicKey = 18,
    SshPrivateKey = 19,
    /// Any verb; non-standard ones are sent as a custom request.
    HttpMethod = 20,
    PostString = 21,
    MailFrom = 22,
    MailRcpt = 23,
}

impl XferStrOption {
    pub(crate) fn from_raw(id: u32) -> Option<Self> {
        const ALL: [XferStrOption; 24] = [
            XferStrOption::Url,
            XferStrOption::UserPwd,
            XferStrOption::Proxy,
            XferStrOption::ProxyUserPwd,
            XferStrOption::Range,
            XferStrOption::Cookie,
            XferStrOption::CookieFile,
            XferStrOption::CookieJar,
            XferStrOption::KrbLevel,
            XferStrOption::SslCert,
            XferStrOption::SslCertType,
            XferStrOption::SslKey,
            XferStrOption::SslKeyPwd,
            XferStrOption::SslKeyType,
            XferStrOption::SslCaInfo,
            XferStrOption::SslCaPath,
            XferStrOption::SslPinnedPublicKey,
            XferStrOption::FtpPort,
            XferStrOption::SshPublicKey,
            XferStrOption::SshPrivateKey,
            XferStrOption::HttpMethod,
            XferStrOption::PostString,
            XferStrOption::MailFrom,
            XferStrOption::MailRcpt,
        ];
        ALL.get(id as usize).copied()
    }

    pub(crate) fn to_request_option(self, value: String) -> RequestOption {
        match self {
            XferStrOption::Url => RequestOption::Url(value),
            XferStrOption::UserPwd => RequestOption::UserPwd(value),
            XferStrOption::Proxy => RequestOption::Proxy(value),
            XferStrOption::ProxyUserPwd => RequestOption::ProxyUserPwd(value),
            XferStrOption::Range => RequestOption::Range(value),
            XferStrOption::Cookie => RequestOption::Cookie(value),
            XferStrOption::CookieFile => RequestOption::CookieFile(value),
            XferStrOption::CookieJar => RequestOption::CookieJar(value),
            XferStrOption::KrbLevel => RequestOption::KrbLevel(value),
            XferStrOption::SslCert => RequestOption::SslCert(value),
            XferStrOption::SslCertType => RequestOption::SslCertType(value),
            XferStrOption::SslKey => RequestOption::SslKey(value),
            XferStrOption::SslKeyPwd => RequestOption::SslKeyPwd(value),
            XferStrOption::SslKeyType => RequestOption::SslKeyType(value),
            XferStrOption::SslCaInfo => RequestOption::SslCaInfo(value),
            XferStrOption::SslCaPath => RequestOption::SslCaPath(value),
            XferStrOption::SslPinnedPublicKey => RequestOption::SslPinnedPublicKey(value),
            XferStrOption::FtpPort => RequestOption::FtpPort(value),
            XferStrOption::SshPublicKey => RequestOption::SshPublicKey(value),
            XferStrOption::SshPrivateKey => RequestOption::SshPrivateKey(value),
            XferStrOption::HttpMethod => RequestOption::HttpMethod(HttpMethod::parse(&value)),
            XferStrOption::PostString => RequestOption::PostString(value),
            XferStrOption::MailFrom => RequestOption::MailFrom(value),
            XferStrOption::MailRcpt => RequestOption::MailRcpt(value),
        }
    }
}

/// Options carrying an integer. `SslVersion` takes 0 (default) through 5
/// (TLS 1.3).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XferLongOption {
    Port = 0,
    ProxyPort = 1,
    Timeout = 2,
    ConnectTimeout = 3,
    LowSpeedLimit = 4,
    LowSpeedTime = 5,
    ResumeFrom = 6,
    MaxRedirects = 7,
    MaxConnects = 8,
    FtpResponseTimeout = 9,
    SslVersion = 10,
}

impl XferLongOption {
    pub(crate) fn from_raw(id: u32) -> Option<Self> {
        use XferLongOption::*;
        const ALL: [XferLongOption; 11] = [
            Port, ProxyPort, Timeout, ConnectTimeout, LowSpeedLimit, LowSpeedTime, ResumeFrom,
            MaxRedirects, MaxConnects, FtpResponseTimeout, SslVersion,
        ];
        ALL.get(id as usize).copied()
    }

    /// `None` when the value is out of range for the option.
    pub(crate) fn to_request_option(self, value: i64) -> Option<RequestOption> {
        let option = match self {
            XferLongOption::Port => RequestOption::Port(value),
            XferLongOption::ProxyPort => RequestOption::ProxyPort(value),
            XferLongOption::Timeout => RequestOption::Timeout(value),
            XferLongOption::ConnectTimeout => RequestOption::ConnectTimeout(value),
            XferLongOption::LowSpeedLimit => RequestOption::LowSpeedLimit(value),
            XferLongOption::LowSpeedTime => RequestOption::LowSpeedTime(value),
            XferLongOption::ResumeFrom => RequestOption::ResumeFrom(value),
            XferLongOption::MaxRedirects => RequestOption::MaxRedirects(value),
            XferLongOption::MaxConnects => RequestOption::MaxConnects(value),
            XferLongOption::FtpResponseTimeout => RequestOption::FtpResponseTimeout(value),
            XferLongOption::SslVersion => RequestOption::SslVersion(match value {
                0 => TlsVersion::Default,
                1 => TlsVersion::TlsV1,
                2 => TlsVersion::TlsV1_0,
                3 => TlsVersion::TlsV1_1,
                4 => TlsVersion::TlsV1_2,
                5 => TlsVersion::TlsV1_3,
                _ => return None,
            }),
        };
        Some(option)
    }
}

/// Options carrying a flag.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XferBoolOption {
    /// Only `true` has an effect.
    FailOnError = 0,
    FollowLocation = 1,
    AutoReferer = 2,
    SslVerifyPeer = 3,
    SslVerifyHost = 4,
}

impl XferBoolOption {
    pub(crate) fn from_raw(id: u32) -> Option<Self> {
        use XferBoolOption::*;
        const ALL: [XferBoolOption; 5] =
            [FailOnError, FollowLocation, AutoReferer, SslVerifyPeer, SslVerifyHost];
        ALL.get(id as usize).copied()
    }

    pub(crate) fn to_request_option(self, on: bool) -> Option<RequestOption> {
        match self {
            XferBoolOption::FailOnError => on.then_some(RequestOption::FailOnError),
            XferBoolOption::FollowLocation => Some(RequestOption::FollowLocation(on)),
            XferBoolOption::AutoReferer => Some(RequestOption::AutoReferer(on)),
            XferBoolOption::SslVerifyPeer => Some(RequestOption::SslVerifyPeer(on)),
            XferBoolOption::SslVerifyHost => Some(RequestOption::SslVerifyHost(on)),
        }
    }
}

/// Options carrying a list of strings.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XferListOption {
    SslCiphers = 0,
    FtpPreCommands = 1,
    FtpPostCommands = 2,
}

impl XferListOption {
    pub(crate) fn from_raw(id: u32) -> Option<Self> {
        use XferListOption::*;
        [SslCiphers, FtpPreCommands, FtpPostCommands]
            .get(id as usize)
            .copied()
    }

    pub(crate) fn to_request_option(self, items: Vec<String>) -> RequestOption {
        match self {
            XferListOption::SslCiphers => RequestOption::SslCiphers(items),
            XferListOption::FtpPreCommands => RequestOption::FtpPreCommands(items),
            XferListOption::FtpPostCommands => RequestOption::FtpPostCommands(items),
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned by setters and in `XferResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XferErrorCode {
    Ok = 0,
    /// The engine failed, or the status was >= 400 with `FailOnError`.
    Engine = 1,
    /// The engine rejected an option.
    Apply = 2,
    NullArg = 3,
    /// Unknown option id, out-of-range value or invalid UTF-8.
    InvalidArg = 4,
    Panic = 5,
    Interrupted = 6,
    /// The async runtime could not be started.
    Runtime = 7,
}

/// Outcome of a transfer.
///
/// On success `error_code` is `Ok` and `error_message` is null. On `Engine`
/// and `Apply` failures `response` still holds the partial response and
/// `engine_code` the engine's numeric code. `http_status` is 0 when no
/// response is attached.
#[repr(C)]
pub struct XferResult {
    pub error_code: XferErrorCode,
    pub error_message: *mut c_char,
    pub engine_code: i32,
    pub http_status: i64,
    pub response: *mut FfiResponse,
}

impl XferResult {
    pub(crate) fn from_outcome(outcome: Result<Response, TransferError>) -> *mut Self {
        let result = match outcome {
            Ok(response) => XferResult {
                error_code: XferErrorCode::Ok,
                error_message: std::ptr::null_mut(),
                engine_code: 0,
                http_status: response.response_code(),
                response: Box::into_raw(Box::new(FfiResponse { inner: response })),
            },
            Err(err) => {
                let error_code = match &err {
                    TransferError::Engine { .. } => XferErrorCode::Engine,
                    TransferError::Apply { .. } => XferErrorCode::Apply,
                    TransferError::Interrupted => XferErrorCode::Interrupted,
                };
                let error_message = into_c_string(&err.to_string());
                let engine_code = err.code().unwrap_or(0);
                match err.into_response() {
                    Some(response) => XferResult {
                        error_code,
                        error_message,
                        engine_code,
                        http_status: response.response_code(),
                        response: Box::into_raw(Box::new(FfiResponse { inner: response })),
                    },
                    None => XferResult {
                        error_code,
                        error_message,
                        engine_code,
                        http_status: 0,
                        response: std::ptr::null_mut(),
                    },
                }
            }
        };
        Box::into_raw(Box::new(result))
    }

    fn failure(error_code: XferErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(XferResult {
            error_code,
            error_message: into_c_string(msg),
            engine_code: 0,
            http_status: 0,
            response: std::ptr::null_mut(),
        }))
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(XferErrorCode::NullArg, &format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(XferErrorCode::Panic, msg)
    }
}
