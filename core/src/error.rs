//! Error types for the runtime.
//!
//! # Design
//! Construction problems (`Config`, `Runtime`) are returned from
//! `HttpClientBuilder::build`. Everything that can go wrong during a call is
//! delivered through that call's `ResponseFuture`, never returned from the
//! submission itself. Non-2xx statuses are not errors: they come back as a
//! `Response` without a typed body.

use std::io;
use std::path::PathBuf;

/// Errors produced by `HttpClient` and its helpers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// No tokio runtime was available to run calls on.
    #[error("no tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    /// The request descriptor could not be turned into a transport request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A file referenced by a binary payload or multipart part could not be read.
    #[error("failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Connection, TLS, timeout or redirect failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// Local I/O failure while consuming a response.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("failed to deserialize response body into {type_name}: {source}")]
    Deserialization {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A request payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The client was closed before the call was issued.
    #[error("client is closed")]
    Closed,

    /// The task executing the call ended without producing a result.
    #[error("call was aborted before completing")]
    Aborted,
}

impl ClientError {
    /// True when the transport gave up because a timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Transport(e) | ClientError::BodyRead(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// True when no connection could be established.
    pub fn is_connect(&self) -> bool {
        matches!(self, ClientError::Transport(e) if e.is_connect())
    }
}
