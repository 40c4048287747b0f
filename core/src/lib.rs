//! Runtime support for generated REST API clients.
//!
//! # Overview
//! Generated code describes each call as a `RequestDescriptor` (method,
//! relative path, headers, query and form parameters, multipart parts or a
//! binary payload) and hands it to an `HttpClient`, together with an optional
//! pre-serialized JSON body. The client executes the call asynchronously and
//! resolves to a `Response` holding the status, headers, decoded text and,
//! for 2xx statuses, the transformed body.
//!
//! # Design
//! - `HttpClient` is built once per endpoint and shared; configuration is
//!   captured at build time and the transport is pooled.
//! - Calls never fail synchronously. Every error arrives through the
//!   returned `ResponseFuture`.
//! - Non-2xx statuses are ordinary responses without a typed body, so
//!   generated code can inspect error payloads.
//! - `temporal` provides the wire codecs for date and time-of-day values
//!   used by generated models.

pub mod charset;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod json;
pub mod request;
pub mod response;
pub mod temporal;
mod transform;

pub use client::{HttpClient, HttpClientBuilder, ResponseFuture};
pub use config::{ClientConfig, Endpoint};
pub use error::ClientError;
pub use http::{HeaderMap, HttpMethod, HttpParam};
pub use json::{parse_body_to_object, write_body_to_string};
pub use request::{BinaryRequest, BodyPart, PartContent, RequestDescriptor};
pub use response::{BinaryData, Response};
pub use temporal::{DateOnly, DateTimeOnly, TemporalParseError, TimeOnly};
