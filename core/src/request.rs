//! The request descriptor generated code hands to `HttpClient`.
//!
//! # Design
//! A `RequestDescriptor` is assembled with consuming setters and then handed
//! over by value: it describes exactly one call and is consumed by it, which
//! matters for `BinaryRequest::Stream` since a reader can only be drained once.
//! Alternative body sources are sum types (`BinaryRequest`, `PartContent`)
//! matched exhaustively by the client when the transport request is built.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::http::{HeaderMap, HttpMethod, HttpParam};

/// A non-JSON request body.
pub enum BinaryRequest {
    /// Streamed from a file on disk.
    File(PathBuf),
    /// Streamed from an async reader. `length` becomes `Content-Length` when known.
    Stream {
        reader: Box<dyn AsyncRead + Send + Sync + Unpin>,
        length: Option<u64>,
    },
    Bytes(Bytes),
    Text(String),
}

impl BinaryRequest {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        BinaryRequest::File(path.into())
    }

    pub fn stream<R>(reader: R, length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        BinaryRequest::Stream {
            reader: Box::new(reader),
            length,
        }
    }

    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        BinaryRequest::Bytes(bytes.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        BinaryRequest::Text(text.into())
    }
}

impl fmt::Debug for BinaryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryRequest::File(path) => f.debug_tuple("File").field(path).finish(),
            BinaryRequest::Stream { length, .. } => f
                .debug_struct("Stream")
                .field("length", length)
                .finish_non_exhaustive(),
            BinaryRequest::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            BinaryRequest::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

/// Where the content of a multipart part comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    Text(String),
    File(PathBuf),
    Bytes(Bytes),
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    name: String,
    content: PartContent,
    file_name: Option<String>,
    content_type: Option<String>,
    charset: Option<String>,
    content_id: Option<String>,
    transfer_encoding: Option<String>,
}

impl BodyPart {
    fn new(name: impl Into<String>, content: PartContent) -> Self {
        Self {
            name: name.into(),
            content,
            file_name: None,
            content_type: None,
            charset: None,
            content_id: None,
            transfer_encoding: None,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, PartContent::Text(value.into()))
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(name, PartContent::File(path.into()))
    }

    pub fn bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self::new(name, PartContent::Bytes(bytes.into()))
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn with_transfer_encoding(mut self, transfer_encoding: impl Into<String>) -> Self {
        self.transfer_encoding = Some(transfer_encoding.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &PartContent {
        &self.content
    }

    /// Path of the backing file, for file parts.
    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            PartContent::File(path) => Some(path.as_path()),
            PartContent::Text(_) | PartContent::Bytes(_) => None,
        }
    }

    /// The explicit file name, or the file's own name for file parts.
    pub fn file_name(&self) -> Option<&str> {
        match (&self.file_name, &self.content) {
            (Some(name), _) => Some(name.as_str()),
            (None, PartContent::File(path)) => path.file_name().and_then(|n| n.to_str()),
            (None, _) => None,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Content type with the charset parameter appended when one is set.
    /// A charset without an explicit type implies `text/plain` for text parts
    /// and `application/octet-stream` for file and byte parts.
    pub fn effective_content_type(&self) -> Option<String> {
        let base = match (&self.content_type, &self.content) {
            (Some(content_type), _) => content_type.as_str(),
            (None, _) if self.charset.is_none() => return None,
            (None, PartContent::Text(_)) => "text/plain",
            (None, PartContent::File(_) | PartContent::Bytes(_)) => "application/octet-stream",
        };
        Some(match &self.charset {
            Some(charset) => format!("{base}; charset={charset}"),
            None => base.to_string(),
        })
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    pub fn transfer_encoding(&self) -> Option<&str> {
        self.transfer_encoding.as_deref()
    }
}

/// Everything needed to perform one HTTP call, independent of the transport.
#[derive(Debug)]
pub struct RequestDescriptor {
    method: HttpMethod,
    relative_path: String,
    headers: HeaderMap,
    query_params: Vec<(String, HttpParam)>,
    form_params: Vec<(String, HttpParam)>,
    multipart: Vec<BodyPart>,
    binary: Option<BinaryRequest>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, relative_path: impl Into<String>) -> Self {
        Self {
            method,
            relative_path: relative_path.into(),
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            form_params: Vec::new(),
            multipart: Vec::new(),
            binary: None,
        }
    }

    pub fn get(relative_path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, relative_path)
    }

    pub fn post(relative_path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, relative_path)
    }

    pub fn put(relative_path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, relative_path)
    }

    pub fn delete(relative_path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, relative_path)
    }

    /// Set a header, replacing earlier values of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Add another value to a header.
    pub fn append_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        self.headers.set_all(headers);
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, param: HttpParam) -> Self {
        self.query_params.push((name.into(), param));
        self
    }

    pub fn form_param(mut self, name: impl Into<String>, param: HttpParam) -> Self {
        self.form_params.push((name.into(), param));
        self
    }

    pub fn part(mut self, part: BodyPart) -> Self {
        self.multipart.push(part);
        self
    }

    pub fn binary(mut self, binary: BinaryRequest) -> Self {
        self.binary = Some(binary);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query_params(&self) -> &[(String, HttpParam)] {
        &self.query_params
    }

    pub fn form_params(&self) -> &[(String, HttpParam)] {
        &self.form_params
    }

    pub fn multipart_params(&self) -> &[BodyPart] {
        &self.multipart
    }

    pub fn binary_request(&self) -> Option<&BinaryRequest> {
        self.binary.as_ref()
    }

    pub(crate) fn into_parts(self) -> DescriptorParts {
        DescriptorParts {
            method: self.method,
            relative_path: self.relative_path,
            headers: self.headers,
            query_params: self.query_params,
            form_params: self.form_params,
            multipart: self.multipart,
            binary: self.binary,
        }
    }
}

/// Owned fields of a consumed descriptor.
pub(crate) struct DescriptorParts {
    pub method: HttpMethod,
    pub relative_path: String,
    pub headers: HeaderMap,
    pub query_params: Vec<(String, HttpParam)>,
    pub form_params: Vec<(String, HttpParam)>,
    pub multipart: Vec<BodyPart>,
    pub binary: Option<BinaryRequest>,
}
