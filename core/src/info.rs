//! Typed transfer info keys and the per-response snapshot.
//!
//! # Design
//! The engine answers info queries only while it still holds the transfer.
//! A `Response` therefore copies every key into an `InfoSnapshot` when the
//! transfer ends, which keeps the response valid after its `Request` is
//! reset or reused.

use std::collections::HashMap;

use crate::engine::TransferEngine;

/// Info keys with string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StringInfo {
    Url = 0,
    FtpEntryPath = 1,
    RedirectUrl = 2,
    LocalIp = 3,
    PrimaryIp = 4,
    ContentType = 5,
}

impl StringInfo {
    pub const ALL: [StringInfo; 6] = [
        StringInfo::Url,
        StringInfo::FtpEntryPath,
        StringInfo::RedirectUrl,
        StringInfo::LocalIp,
        StringInfo::PrimaryIp,
        StringInfo::ContentType,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|key| *key as u32 == id)
    }
}

/// Info keys with integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum IntInfo {
    ResponseCode = 0,
    HeaderSize = 1,
    RequestSize = 2,
    SslVerifyResult = 3,
    FileTime = 4,
    RedirectCount = 5,
    HttpConnectCode = 6,
    HttpAuthAvail = 7,
    ProxyAuthAvail = 8,
    OsErrno = 9,
    NumConnects = 10,
    ConditionUnmet = 11,
    PrimaryPort = 12,
    LocalPort = 13,
}

impl IntInfo {
    pub const ALL: [IntInfo; 14] = [
        IntInfo::ResponseCode,
        IntInfo::HeaderSize,
        IntInfo::RequestSize,
        IntInfo::SslVerifyResult,
        IntInfo::FileTime,
        IntInfo::RedirectCount,
        IntInfo::HttpConnectCode,
        IntInfo::HttpAuthAvail,
        IntInfo::ProxyAuthAvail,
        IntInfo::OsErrno,
        IntInfo::NumConnects,
        IntInfo::ConditionUnmet,
        IntInfo::PrimaryPort,
        IntInfo::LocalPort,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|key| *key as u32 == id)
    }
}

/// Info keys with floating-point values: timings in seconds, sizes in
/// bytes, speeds in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DoubleInfo {
    TotalTime = 0,
    NameLookupTime = 1,
    ConnectTime = 2,
    PreTransferTime = 3,
    SizeUpload = 4,
    SizeDownload = 5,
    SpeedDownload = 6,
    SpeedUpload = 7,
    ContentLengthDownload = 8,
    ContentLengthUpload = 9,
    StartTransferTime = 10,
    RedirectTime = 11,
    AppConnectTime = 12,
}

impl DoubleInfo {
    pub const ALL: [DoubleInfo; 13] = [
        DoubleInfo::TotalTime,
        DoubleInfo::NameLookupTime,
        DoubleInfo::ConnectTime,
        DoubleInfo::PreTransferTime,
        DoubleInfo::SizeUpload,
        DoubleInfo::SizeDownload,
        DoubleInfo::SpeedDownload,
        DoubleInfo::SpeedUpload,
        DoubleInfo::ContentLengthDownload,
        DoubleInfo::ContentLengthUpload,
        DoubleInfo::StartTransferTime,
        DoubleInfo::RedirectTime,
        DoubleInfo::AppConnectTime,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|key| *key as u32 == id)
    }
}

/// Any info key, as passed to `TransferEngine::info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoKey {
    Str(StringInfo),
    Int(IntInfo),
    Double(DoubleInfo),
}

/// A typed info value returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Str(String),
    Int(i64),
    Double(f64),
}

/// Every info value the engine reported at the end of a transfer.
#[derive(Debug, Clone, Default)]
pub struct InfoSnapshot {
    strings: HashMap<StringInfo, String>,
    ints: HashMap<IntInfo, i64>,
    doubles: HashMap<DoubleInfo, f64>,
}

impl InfoSnapshot {
    /// Query every key. Values of the wrong type for their key are ignored.
    pub fn capture<E: TransferEngine + ?Sized>(engine: &E) -> Self {
        let mut snapshot = InfoSnapshot::default();
        for key in StringInfo::ALL {
            if let Some(InfoValue::Str(value)) = engine.info(InfoKey::Str(key)) {
                snapshot.strings.insert(key, value);
            }
        }
        for key in IntInfo::ALL {
            if let Some(InfoValue::Int(value)) = engine.info(InfoKey::Int(key)) {
                snapshot.ints.insert(key, value);
            }
        }
        for key in DoubleInfo::ALL {
            if let Some(InfoValue::Double(value)) = engine.info(InfoKey::Double(key)) {
                snapshot.doubles.insert(key, value);
            }
        }
        snapshot
    }

    pub fn string(&self, key: StringInfo) -> Option<&str> {
        self.strings.get(&key).map(String::as_str)
    }

    pub fn int(&self, key: IntInfo) -> Option<i64> {
        self.ints.get(&key).copied()
    }

    pub fn double(&self, key: DoubleInfo) -> Option<f64> {
        self.doubles.get(&key).copied()
    }
}
