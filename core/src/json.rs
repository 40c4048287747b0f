//! JSON encoding of request bodies and decoding of response bodies.
//!
//! The target type of a decode is the type parameter; its name is kept in
//! errors so a failed decode says what it was decoding into.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

/// Decode a response body. A blank body decodes as JSON `null`, so `()` and
/// `Option<T>` targets accept empty responses.
pub fn parse_body_to_object<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|source| ClientError::Deserialization {
        type_name: std::any::type_name::<T>(),
        source,
    })
}

/// Encode a request body.
pub fn write_body_to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value).map_err(ClientError::Serialization)
}
