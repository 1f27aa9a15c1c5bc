//! Declarative request options.
//!
//! # Design
//! `RequestOption` is a closed set: every variant is translated by a single
//! exhaustive `match` in `pipeline`, so adding a variant fails to compile
//! until the translation handles it. Options are plain values; a `Request`
//! only ever appends them or replaces the whole list on `reset`.

use std::fmt;
use std::path::PathBuf;

use crate::headers::HeaderName;

/// HTTP verb set explicitly on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Trace,
    Connect,
    Patch,
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Custom(verb) => verb,
        }
    }

    /// Parse a verb, falling back to `Custom` for anything non-standard.
    pub fn parse(verb: &str) -> Self {
        match verb.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            "TRACE" => HttpMethod::Trace,
            "CONNECT" => HttpMethod::Connect,
            "PATCH" => HttpMethod::Patch,
            _ => HttpMethod::Custom(verb.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS protocol version requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Default,
    TlsV1,
    TlsV1_0,
    TlsV1_1,
    TlsV1_2,
    TlsV1_3,
}

impl TlsVersion {
    /// Engine-level numeric value for the version.
    pub fn engine_value(self) -> i64 {
        match self {
            TlsVersion::Default => 0,
            TlsVersion::TlsV1 => 1,
            TlsVersion::TlsV1_0 => 4,
            TlsVersion::TlsV1_1 => 5,
            TlsVersion::TlsV1_2 => 6,
            TlsVersion::TlsV1_3 => 7,
        }
    }
}

/// Content of a multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostPayload {
    /// Inline field value.
    Value(String),
    /// Path of a file the engine reads at transfer time.
    File(PathBuf),
}

/// One named part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostField {
    pub name: String,
    pub payload: PostPayload,
    pub mime_type: Option<String>,
}

impl PostField {
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: PostPayload::Value(value.into()),
            mime_type: None,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            payload: PostPayload::File(path.into()),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn is_file(&self) -> bool {
        matches!(self.payload, PostPayload::File(_))
    }
}

/// A single declarative configuration instruction attached to a `Request`.
///
/// Integer payloads are seconds for timeouts, bytes per second for
/// `LowSpeedLimit`, and byte offsets for `ResumeFrom`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOption {
    Url(String),
    Port(i64),
    /// Treat HTTP status codes >= 400 as transfer failures.
    FailOnError,

    UserPwd(String),

    Proxy(String),
    ProxyUserPwd(String),
    ProxyPort(i64),

    Timeout(i64),
    ConnectTimeout(i64),
    LowSpeedLimit(i64),
    LowSpeedTime(i64),

    Range(String),
    ResumeFrom(i64),

    Cookie(String),
    CookieFile(String),
    CookieJar(String),

    FollowLocation(bool),
    MaxRedirects(i64),

    MaxConnects(i64),
    AutoReferer(bool),
    KrbLevel(String),

    /// Append a header line. Duplicates are sent as-is.
    AddHeader(HeaderName, String),
    AddHeaders(Vec<(HeaderName, String)>),
    /// Set a header, dropping earlier lines for the same name.
    ReplaceHeader(HeaderName, String),
    /// Suppress a header, including one the engine would add itself.
    RemoveHeader(HeaderName),

    SslCert(String),
    SslCertType(String),
    SslKey(String),
    SslKeyPwd(String),
    SslKeyType(String),
    SslVersion(TlsVersion),
    SslVerifyPeer(bool),
    SslVerifyHost(bool),
    SslCaInfo(String),
    SslCaPath(String),
    SslCiphers(Vec<String>),
    SslPinnedPublicKey(String),

    FtpPreCommands(Vec<String>),
    FtpPostCommands(Vec<String>),
    FtpPort(String),
    FtpResponseTimeout(i64),

    SshPublicKey(String),
    SshPrivateKey(String),

    HttpMethod(HttpMethod),
    PostField(PostField),
    PostData(Vec<u8>),
    PostString(String),

    MailFrom(String),
    MailRcpt(String),
}

impl RequestOption {
    /// Variant name, used in logs and apply failures.
    pub fn name(&self) -> &'static str {
        match self {
            RequestOption::Url(_) => "url",
            RequestOption::Port(_) => "port",
            RequestOption::FailOnError => "failOnError",
            RequestOption::UserPwd(_) => "userPwd",
            RequestOption::Proxy(_) => "proxy",
            RequestOption::ProxyUserPwd(_) => "proxyUserPwd",
            RequestOption::ProxyPort(_) => "proxyPort",
            RequestOption::Timeout(_) => "timeout",
            RequestOption::ConnectTimeout(_) => "connectTimeout",
            RequestOption::LowSpeedLimit(_) => "lowSpeedLimit",
            RequestOption::LowSpeedTime(_) => "lowSpeedTime",
            RequestOption::Range(_) => "range",
            RequestOption::ResumeFrom(_) => "resumeFrom",
            RequestOption::Cookie(_) => "cookie",
            RequestOption::CookieFile(_) => "cookieFile",
            RequestOption::CookieJar(_) => "cookieJar",
            RequestOption::FollowLocation(_) => "followLocation",
            RequestOption::MaxRedirects(_) => "maxRedirects",
            RequestOption::MaxConnects(_) => "maxConnects",
            RequestOption::AutoReferer(_) => "autoReferer",
            RequestOption::KrbLevel(_) => "krbLevel",
            RequestOption::AddHeader(..) => "addHeader",
            RequestOption::AddHeaders(_) => "addHeaders",
            RequestOption::ReplaceHeader(..) => "replaceHeader",
            RequestOption::RemoveHeader(_) => "removeHeader",
            RequestOption::SslCert(_) => "sslCert",
            RequestOption::SslCertType(_) => "sslCertType",
            RequestOption::SslKey(_) => "sslKey",
            RequestOption::SslKeyPwd(_) => "sslKeyPwd",
            RequestOption::SslKeyType(_) => "sslKeyType",
            RequestOption::SslVersion(_) => "sslVersion",
            RequestOption::SslVerifyPeer(_) => "sslVerifyPeer",
            RequestOption::SslVerifyHost(_) => "sslVerifyHost",
            RequestOption::SslCaInfo(_) => "sslCAInfo",
            RequestOption::SslCaPath(_) => "sslCAPath",
            RequestOption::SslCiphers(_) => "sslCiphers",
            RequestOption::SslPinnedPublicKey(_) => "sslPinnedPublicKey",
            RequestOption::FtpPreCommands(_) => "ftpPreCommands",
            RequestOption::FtpPostCommands(_) => "ftpPostCommands",
            RequestOption::FtpPort(_) => "ftpPort",
            RequestOption::FtpResponseTimeout(_) => "ftpResponseTimeout",
            RequestOption::SshPublicKey(_) => "sshPublicKey",
            RequestOption::SshPrivateKey(_) => "sshPrivateKey",
            RequestOption::HttpMethod(_) => "httpMethod",
            RequestOption::PostField(_) => "postField",
            RequestOption::PostData(_) => "postData",
            RequestOption::PostString(_) => "postString",
            RequestOption::MailFrom(_) => "mailFrom",
            RequestOption::MailRcpt(_) => "mailRcpt",
        }
    }
}
