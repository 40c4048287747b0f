//! Turning transport responses into `Response` values.
//!
//! Only 2xx statuses produce a typed or binary body; any other status keeps
//! the decoded text for diagnostics. Each transformer owns its inputs so it
//! can run inside the spawned call task.

use serde::de::DeserializeOwned;

use crate::charset;
use crate::error::ClientError;
use crate::http::HeaderMap;
use crate::json;
use crate::response::{BinaryData, Response};

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Read the whole body and decode it with the declared or default charset.
async fn read_text(
    response: reqwest::Response,
    headers: &HeaderMap,
    default_charset: &str,
) -> Result<String, ClientError> {
    let charset = charset::resolve_charset(headers, default_charset);
    let bytes = response.bytes().await.map_err(ClientError::BodyRead)?;
    let (text, _, had_errors) = charset::encoding_for(&charset).decode(&bytes);
    if had_errors {
        tracing::debug!(%charset, "response body contained malformed sequences");
    }
    Ok(text.into_owned())
}

pub(crate) async fn to_string_response(
    response: reqwest::Response,
    default_charset: String,
) -> Result<Response<String>, ClientError> {
    let status = response.status().as_u16();
    let headers = HeaderMap::from(response.headers());
    let text = read_text(response, &headers, &default_charset).await?;
    Ok(Response::new(Some(text.clone()), Some(text), status, headers))
}

pub(crate) async fn to_binary_response(
    response: reqwest::Response,
    default_charset: String,
) -> Result<Response<BinaryData>, ClientError> {
    let status = response.status().as_u16();
    let headers = HeaderMap::from(response.headers());
    if is_success(status) {
        let data = BinaryData::new(response, default_charset);
        return Ok(Response::new(None, Some(data), status, headers));
    }
    let text = read_text(response, &headers, &default_charset).await?;
    Ok(Response::new(Some(text), None, status, headers))
}

pub(crate) async fn to_typed_response<R: DeserializeOwned>(
    response: reqwest::Response,
    default_charset: String,
) -> Result<Response<R>, ClientError> {
    let status = response.status().as_u16();
    let headers = HeaderMap::from(response.headers());
    let text = read_text(response, &headers, &default_charset).await?;
    // Every 2xx status is assumed to carry the same response type.
    let body = if is_success(status) {
        Some(json::parse_body_to_object(&text)?)
    } else {
        None
    };
    Ok(Response::new(Some(text), body, status, headers))
}
