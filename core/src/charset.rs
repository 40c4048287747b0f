//! Response charset detection.
//!
//! Labels are resolved with the WHATWG encoding registry (`encoding_rs`), so
//! aliases such as `utf8` or `latin1` map to their canonical names. The
//! registry folds `ISO-8859-1`, `latin1` and `US-ASCII` into `windows-1252`,
//! which decodes bytes 0x80..=0x9F as printable characters rather than C1
//! controls. Labels outside the registry, such as `UTF-32`, are treated as
//! unknown and the default charset applies.

use encoding_rs::{Encoding, UTF_8};

use crate::http::HeaderMap;

/// Charset declared by the `Content-Type` headers, or `default`.
///
/// Every `Content-Type` value is split on `;` and each segment mentioning
/// `charset` is tried in order. The first label that resolves wins; labels that
/// do not resolve are skipped.
pub fn resolve_charset(headers: &HeaderMap, default: &str) -> String {
    headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .flat_map(|(_, values)| values.iter())
        .flat_map(|value| value.split(';'))
        .find_map(charset_from_segment)
        .map(|encoding| encoding.name().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn charset_from_segment(segment: &str) -> Option<&'static Encoding> {
    let lower = segment.to_ascii_lowercase();
    let index = lower.find("charset")?;
    let label = lower[index + "charset".len()..]
        .replace('=', " ")
        .trim()
        .trim_matches('"')
        .to_string();
    Encoding::for_label(label.as_bytes())
}

/// Decoder for a charset name, UTF-8 when the name is unknown.
pub fn encoding_for(name: &str) -> &'static Encoding {
    Encoding::for_label(name.as_bytes()).unwrap_or(UTF_8)
}

/// Whether `name` is a charset label the decoder understands.
pub fn is_known_charset(name: &str) -> bool {
    Encoding::for_label(name.as_bytes()).is_some()
}
