//! Transport-independent HTTP vocabulary: methods, parameters and headers.
//!
//! # Design
//! These types describe a call as plain data so generated code never touches
//! the transport directly. `HttpParam` separates "one value" from "a repeated
//! set of values" up front; `expand_params` is the single place that turns
//! either shape into wire entries, for query strings and forms alike.
//!
//! `HeaderMap` keeps header names with the casing they were inserted with but
//! compares them case-insensitively, so a generated `Accept` header replaces a
//! default `accept` header instead of duplicating it.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Trace => reqwest::Method::TRACE,
            HttpMethod::Connect => reqwest::Method::CONNECT,
        }
    }
}

/// A query or form parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpParam {
    /// At most one value. `None` contributes nothing to the request.
    Single(Option<String>),
    /// Every value becomes its own entry under the same key, in order.
    Repeated(Vec<String>),
}

impl HttpParam {
    pub fn single(value: impl ToString) -> Self {
        HttpParam::Single(Some(value.to_string()))
    }

    pub fn optional<V: ToString>(value: Option<V>) -> Self {
        HttpParam::Single(value.map(|v| v.to_string()))
    }

    pub fn repeated<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        HttpParam::Repeated(values.into_iter().map(|v| v.to_string()).collect())
    }

    /// The values this parameter puts on the wire.
    pub fn values(&self) -> &[String] {
        match self {
            HttpParam::Single(Some(value)) => std::slice::from_ref(value),
            HttpParam::Single(None) => &[],
            HttpParam::Repeated(values) => values,
        }
    }
}

/// Flatten named parameters into key/value entries, preserving order.
pub fn expand_params(params: &[(String, HttpParam)]) -> Vec<(String, String)> {
    params
        .iter()
        .flat_map(|(key, param)| {
            param
                .values()
                .iter()
                .map(move |value| (key.clone(), value.clone()))
        })
        .collect()
}

/// Ordered, case-insensitive multi-map of header names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set_values(name, vec![value.into()]);
    }

    /// Replace every value of `name` with `values`. The stored name takes the
    /// casing of `name`.
    pub fn set_values(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index] = (name, values),
            None => self.entries.push((name, values)),
        }
    }

    /// Add `value` to the values of `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Apply every header of `other` on top of this map: names present in
    /// both take the values of `other`, the rest are kept or added.
    pub fn set_all(&mut self, other: &HeaderMap) {
        for (name, values) in &other.entries {
            self.set_values(name.clone(), values.clone());
        }
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.position(name)
            .map(|index| self.entries[index].1.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name)
            .map(|index| self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl From<&reqwest::header::HeaderMap> for HeaderMap {
    fn from(headers: &reqwest::header::HeaderMap) -> Self {
        headers
            .iter()
            .map(|(name, value)| {
                let value = match value.to_str() {
                    Ok(text) => text.to_string(),
                    Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
                };
                (name.as_str().to_string(), value)
            })
            .collect()
    }
}
