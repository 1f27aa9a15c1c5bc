//! Error types for transfers and configuration.
//!
//! # Design
//! A failed transfer always carries the response as it stood when the
//! failure was detected, so callers can still inspect the status code,
//! headers and partial body. Body JSON decoding never errors; see
//! `Response::body_json`.

use thiserror::Error;

use crate::engine::EngineCode;
use crate::response::Response;

/// Errors returned by `Request::perform` and delivered to async completions.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The engine reported a failure, or the HTTP status was >= 400 with
    /// `FailOnError` set.
    #[error("transfer failed ({code}): {description}")]
    Engine {
        code: EngineCode,
        description: String,
        response: Box<Response>,
    },

    /// The engine rejected an option while the request was being set up.
    #[error("option {option} rejected ({code}): {description}")]
    Apply {
        option: &'static str,
        code: EngineCode,
        description: String,
        response: Box<Response>,
    },

    /// The step chain was dropped by its scheduler before finishing.
    #[error("transfer interrupted before completion")]
    Interrupted,
}

impl TransferError {
    /// Engine code for the failure, if it came from the engine.
    pub fn code(&self) -> Option<EngineCode> {
        match self {
            TransferError::Engine { code, .. } | TransferError::Apply { code, .. } => Some(*code),
            TransferError::Interrupted => None,
        }
    }

    /// The response snapshot at failure time.
    pub fn response(&self) -> Option<&Response> {
        match self {
            TransferError::Engine { response, .. } | TransferError::Apply { response, .. } => {
                Some(response.as_ref())
            }
            TransferError::Interrupted => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            TransferError::Engine { response, .. } | TransferError::Apply { response, .. } => {
                Some(*response)
            }
            TransferError::Interrupted => None,
        }
    }
}

/// Errors loading a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {name}")]
    InvalidVar { name: String, value: String },
}
