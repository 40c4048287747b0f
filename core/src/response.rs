//! Responses handed back to generated code.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use tokio::io::AsyncWriteExt;

use crate::charset;
use crate::error::ClientError;
use crate::http::HeaderMap;

/// Outcome of one call.
///
/// `string_body` is the decoded response text when it was read; `body` is the
/// transformed body and is only present for 2xx statuses.
#[derive(Debug, Clone)]
pub struct Response<T> {
    string_body: Option<String>,
    body: Option<T>,
    status: u16,
    headers: HeaderMap,
}

impl<T> Response<T> {
    pub fn new(string_body: Option<String>, body: Option<T>, status: u16, headers: HeaderMap) -> Self {
        Self {
            string_body,
            body,
            status,
            headers,
        }
    }

    pub fn string_body(&self) -> Option<&str> {
        self.string_body.as_deref()
    }

    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Transform the typed body, keeping everything else.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            string_body: self.string_body,
            body: self.body.map(f),
            status: self.status,
            headers: self.headers,
        }
    }
}

/// Unread body of a successful response.
///
/// Nothing is read from the connection until one of the consuming methods is
/// called.
pub struct BinaryData {
    response: reqwest::Response,
    default_charset: String,
}

impl BinaryData {
    pub(crate) fn new(response: reqwest::Response, default_charset: String) -> Self {
        Self {
            response,
            default_charset,
        }
    }

    /// Value of the `Content-Length` header, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        self.response.bytes().await.map_err(ClientError::BodyRead)
    }

    /// Decode the body using the response charset.
    pub async fn text(self) -> Result<String, ClientError> {
        let headers = HeaderMap::from(self.response.headers());
        let charset = charset::resolve_charset(&headers, &self.default_charset);
        let bytes = self.bytes().await?;
        let (text, _, _) = charset::encoding_for(&charset).decode(&bytes);
        Ok(text.into_owned())
    }

    /// The body as a stream of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, ClientError>> {
        self.response.bytes_stream().map_err(ClientError::BodyRead)
    }

    /// Write the body to `path`, creating or truncating it. Returns the number
    /// of bytes written.
    pub async fn write_to_file(mut self, path: impl AsRef<Path>) -> Result<u64, ClientError> {
        let mut file = tokio::fs::File::create(path.as_ref()).await?;
        let mut written = 0u64;
        while let Some(chunk) = self.response.chunk().await.map_err(ClientError::BodyRead)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

impl fmt::Debug for BinaryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryData")
            .field("status", &self.response.status().as_u16())
            .field("content_length", &self.content_length())
            .finish_non_exhaustive()
    }
}
