//! Client configuration.
//!
//! # Design
//! `Endpoint` says where calls go; `ClientConfig` says how the transport
//! behaves. Both are plain values with documented defaults, deserializable
//! from any serde format with missing fields taking their default, and are
//! captured once when the client is built.
//!
//! Durations are milliseconds. `None` means "no limit" where a limit applies.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Protocol, host, port and optional path prefix a client is bound to.
///
/// Defaults to `http://localhost:80` without a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub prefix: Option<String>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 80,
            prefix: None,
        }
    }
}

impl Endpoint {
    /// The prefix with exactly one leading `/` and no trailing `/`, or an
    /// empty string when there is no prefix.
    pub fn clean_prefix(&self) -> String {
        clean_prefix(self.prefix.as_deref())
    }

    /// `{protocol}://{host}:{port}{clean_prefix}`
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol,
            self.host,
            self.port,
            self.clean_prefix()
        )
    }
}

pub(crate) fn clean_prefix(prefix: Option<&str>) -> String {
    match prefix.map(|p| p.trim_matches('/')) {
        Some(trimmed) if !trimmed.is_empty() => format!("/{trimmed}"),
        _ => String::new(),
    }
}

/// Transport policy applied when the client is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connect_timeout_ms: u64,
    /// Total time allowed for one request, including reading the body.
    pub request_timeout_ms: u64,
    /// Upper bound on calls in flight at once.
    pub max_connections: Option<usize>,
    /// Upper bound on idle pooled connections per host.
    pub max_connections_per_host: Option<usize>,
    /// Re-sends of a request whose connection could not be established.
    pub max_request_retry: u32,
    /// Not supported by the transport; a warning is logged when set.
    pub connection_ttl_ms: Option<u64>,
    pub pooled_connection_idle_timeout_ms: u64,
    pub allow_pooling_connections: bool,
    pub accept_any_certificate: bool,
    pub verify_hostname: bool,
    /// PEM files with additional trust anchors.
    pub root_certificates: Vec<PathBuf>,
    /// Not supported by the transport; a warning is logged when set.
    pub ssl_session_cache_size: Option<usize>,
    /// Not supported by the transport; a warning is logged when set.
    pub ssl_session_timeout_ms: Option<u64>,
    pub follow_redirect: bool,
    pub max_redirects: usize,
    /// Charset used to decode responses that do not declare one.
    pub response_charset: String,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 60_000,
            max_connections: None,
            max_connections_per_host: None,
            max_request_retry: 5,
            connection_ttl_ms: None,
            pooled_connection_idle_timeout_ms: 60_000,
            allow_pooling_connections: true,
            accept_any_certificate: false,
            verify_hostname: true,
            root_certificates: Vec::new(),
            ssl_session_cache_size: None,
            ssl_session_timeout_ms: None,
            follow_redirect: false,
            max_redirects: 5,
            response_charset: "UTF-8".to_string(),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn pooled_connection_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.pooled_connection_idle_timeout_ms)
    }

    /// Names of the settings that the transport cannot honour.
    pub(crate) fn unsupported_settings(&self) -> Vec<&'static str> {
        let mut unsupported = Vec::new();
        if self.connection_ttl_ms.is_some() {
            unsupported.push("connection_ttl_ms");
        }
        if self.ssl_session_cache_size.is_some() {
            unsupported.push("ssl_session_cache_size");
        }
        if self.ssl_session_timeout_ms.is_some() {
            unsupported.push("ssl_session_timeout_ms");
        }
        unsupported
    }
}
