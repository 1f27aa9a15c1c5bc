//! Shared client defaults, loaded from JSON or the environment.
//!
//! A `ClientConfig` turns into a list of leading options; anything a caller
//! adds to the request afterwards is applied later and wins.

use serde::Deserialize;

use crate::engine::TransferEngine;
use crate::error::ConfigError;
use crate::headers::HeaderName;
use crate::option::RequestOption;
use crate::request::Request;

pub const ENV_TIMEOUT: &str = "XFER_TIMEOUT";
pub const ENV_CONNECT_TIMEOUT: &str = "XFER_CONNECT_TIMEOUT";
pub const ENV_FOLLOW_LOCATION: &str = "XFER_FOLLOW_LOCATION";
pub const ENV_MAX_REDIRECTS: &str = "XFER_MAX_REDIRECTS";
pub const ENV_PROXY: &str = "XFER_PROXY";
pub const ENV_USER_AGENT: &str = "XFER_USER_AGENT";
pub const ENV_FAIL_ON_ERROR: &str = "XFER_FAIL_ON_ERROR";
pub const ENV_VERIFY_PEER: &str = "XFER_VERIFY_PEER";

/// Defaults applied to every request built from this config.
/// Timeouts are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub timeout: Option<i64>,
    pub connect_timeout: Option<i64>,
    pub follow_location: Option<bool>,
    pub max_redirects: Option<i64>,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub fail_on_error: bool,
    pub verify_peer: Option<bool>,
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the `XFER_*` variables of the current process.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build from `(name, value)` pairs; unrelated names are ignored and
    /// empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = ClientConfig::default();
        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref().trim());
            if value.is_empty() {
                continue;
            }
            match name {
                ENV_TIMEOUT => config.timeout = Some(parse_int(name, value)?),
                ENV_CONNECT_TIMEOUT => config.connect_timeout = Some(parse_int(name, value)?),
                ENV_FOLLOW_LOCATION => config.follow_location = Some(parse_bool(name, value)?),
                ENV_MAX_REDIRECTS => config.max_redirects = Some(parse_int(name, value)?),
                ENV_PROXY => config.proxy = Some(value.to_string()),
                ENV_USER_AGENT => config.user_agent = Some(value.to_string()),
                ENV_FAIL_ON_ERROR => config.fail_on_error = parse_bool(name, value)?,
                ENV_VERIFY_PEER => config.verify_peer = Some(parse_bool(name, value)?),
                _ => {}
            }
        }
        Ok(config)
    }

    pub fn options(&self) -> Vec<RequestOption> {
        let mut options = Vec::new();
        if let Some(secs) = self.timeout {
            options.push(RequestOption::Timeout(secs));
        }
        if let Some(secs) = self.connect_timeout {
            options.push(RequestOption::ConnectTimeout(secs));
        }
        if let Some(follow) = self.follow_location {
            options.push(RequestOption::FollowLocation(follow));
        }
        if let Some(max) = self.max_redirects {
            options.push(RequestOption::MaxRedirects(max));
        }
        if let Some(proxy) = &self.proxy {
            options.push(RequestOption::Proxy(proxy.clone()));
        }
        if let Some(agent) = &self.user_agent {
            options.push(RequestOption::ReplaceHeader(HeaderName::UserAgent, agent.clone()));
        }
        if self.fail_on_error {
            options.push(RequestOption::FailOnError);
        }
        if let Some(verify) = self.verify_peer {
            options.push(RequestOption::SslVerifyPeer(verify));
        }
        options
    }

    /// A request for `url` with this config's options applied first.
    pub fn request<E: TransferEngine>(&self, url: impl Into<String>, engine: E) -> Request<E> {
        Request::with_options(url, self.options(), engine)
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse().map_err(|_| invalid(name, value))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidVar {
        name: name.to_string(),
        value: value.to_string(),
    }
}
