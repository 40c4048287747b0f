//! Asynchronous HTTP client that executes request descriptors.
//!
//! # Design
//! `HttpClient` holds the endpoint, the transport policy and a pooled
//! `reqwest::Client`, all fixed when the client is built. Each `call_to_*`
//! method returns a `ResponseFuture` straight away: building the transport
//! request, sending it and transforming the response all happen in a task on
//! the captured runtime, and the outcome is delivered through a oneshot
//! channel. A call therefore never fails synchronously; every error, including
//! an invalid descriptor or a closed client, arrives through its future.
//!
//! A descriptor can describe several bodies at once. Exactly one is sent, by
//! precedence: multipart parts, then form parameters, then the binary payload,
//! then the serialized string body.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{stream, Stream};
use reqwest::header::{HeaderValue, CONTENT_LENGTH};
use reqwest::multipart;
use reqwest::redirect;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Semaphore};

use crate::charset;
use crate::config::{ClientConfig, Endpoint};
use crate::error::ClientError;
use crate::http::{expand_params, HeaderMap};
use crate::request::{BinaryRequest, BodyPart, PartContent, RequestDescriptor};
use crate::response::{BinaryData, Response};
use crate::transform;

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Pending result of one call. Resolves exactly once.
#[must_use = "futures do nothing unless polled"]
pub struct ResponseFuture<T> {
    receiver: oneshot::Receiver<Result<Response<T>, ClientError>>,
}

impl<T> ResponseFuture<T> {
    fn failed(error: ClientError) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(Err(error));
        Self { receiver }
    }
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<Response<T>, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ClientError::Aborted)))
    }
}

/// Builder for `HttpClient`. Unset values fall back to `Endpoint::default()`
/// and `ClientConfig::default()`.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    endpoint: Endpoint,
    config: ClientConfig,
    default_headers: HeaderMap,
    runtime: Option<Handle>,
}

impl HttpClientBuilder {
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.endpoint.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.endpoint.port = port;
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.endpoint.protocol = protocol.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.endpoint.prefix = Some(prefix.into());
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Header sent with every call unless the descriptor sets the same name.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.set(name, value);
        self
    }

    pub fn default_headers(mut self, headers: &HeaderMap) -> Self {
        self.default_headers.set_all(headers);
        self
    }

    /// Runtime that executes calls. Defaults to the runtime `build` is called on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<HttpClient, ClientError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()?,
        };
        if !charset::is_known_charset(&self.config.response_charset) {
            return Err(ClientError::Config(format!(
                "unknown response charset {:?}",
                self.config.response_charset
            )));
        }
        if self.config.max_connections == Some(0) {
            return Err(ClientError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        let unsupported = self.config.unsupported_settings();
        if !unsupported.is_empty() {
            tracing::warn!(settings = ?unsupported, "transport ignores these settings");
        }

        let transport = build_transport(&self.config)?;
        let dispatch = Dispatch {
            base_url: self.endpoint.base_url(),
            default_headers: self.default_headers,
            response_charset: self.config.response_charset.clone(),
            max_request_retry: self.config.max_request_retry,
            limiter: self
                .config
                .max_connections
                .map(|permits| Arc::new(Semaphore::new(permits))),
        };
        tracing::debug!(base_url = %dispatch.base_url, "client built");

        Ok(HttpClient {
            endpoint: self.endpoint,
            config: self.config,
            dispatch: Arc::new(dispatch),
            transport: Mutex::new(Some(transport)),
            runtime,
        })
    }
}

fn build_transport(config: &ClientConfig) -> Result<reqwest::Client, ClientError> {
    let redirect_policy = if config.follow_redirect {
        redirect::Policy::limited(config.max_redirects)
    } else {
        redirect::Policy::none()
    };
    let mut builder = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .pool_idle_timeout(config.pooled_connection_idle_timeout())
        .redirect(redirect_policy)
        .danger_accept_invalid_certs(config.accept_any_certificate)
        .danger_accept_invalid_hostnames(!config.verify_hostname);

    if !config.allow_pooling_connections {
        builder = builder.pool_max_idle_per_host(0);
    } else if let Some(per_host) = config.max_connections_per_host {
        builder = builder.pool_max_idle_per_host(per_host);
    }
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.as_str());
    }
    for path in &config.root_certificates {
        let pem = std::fs::read(path).map_err(|e| {
            ClientError::Config(format!("cannot read root certificate {}: {e}", path.display()))
        })?;
        let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
            ClientError::Config(format!("invalid root certificate {}: {e}", path.display()))
        })?;
        builder = builder.add_root_certificate(certificate);
    }

    builder
        .build()
        .map_err(|e| ClientError::Config(e.to_string()))
}

/// Client bound to one endpoint. Safe to share between tasks.
#[derive(Debug)]
pub struct HttpClient {
    endpoint: Endpoint,
    config: ClientConfig,
    dispatch: Arc<Dispatch>,
    transport: Mutex<Option<reqwest::Client>>,
    runtime: Handle,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Call and decode the body as text.
    pub fn call_to_string_response(
        &self,
        descriptor: RequestDescriptor,
        body: Option<String>,
    ) -> ResponseFuture<String> {
        self.call(descriptor, body, transform::to_string_response)
    }

    /// Call and hand back the unread body on success.
    pub fn call_to_binary_response(
        &self,
        descriptor: RequestDescriptor,
        body: Option<String>,
    ) -> ResponseFuture<BinaryData> {
        self.call(descriptor, body, transform::to_binary_response)
    }

    /// Call and deserialize a successful body into `R`.
    pub fn call_to_type_response<R>(
        &self,
        descriptor: RequestDescriptor,
        body: Option<String>,
    ) -> ResponseFuture<R>
    where
        R: DeserializeOwned + Send + 'static,
    {
        self.call(descriptor, body, transform::to_typed_response::<R>)
    }

    fn call<T, F, Fut>(
        &self,
        descriptor: RequestDescriptor,
        body: Option<String>,
        transform: F,
    ) -> ResponseFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(reqwest::Response, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Response<T>, ClientError>> + Send + 'static,
    {
        let Some(transport) = self.transport() else {
            return ResponseFuture::failed(ClientError::Closed);
        };
        let dispatch = Arc::clone(&self.dispatch);
        let (sender, receiver) = oneshot::channel();
        self.runtime.spawn(async move {
            let result = dispatch
                .execute(&transport, descriptor, body, transform)
                .await;
            if let Err(error) = &result {
                tracing::debug!(%error, "call failed");
            }
            // The caller may have dropped its future; nobody is left to tell.
            let _ = sender.send(result);
        });
        ResponseFuture { receiver }
    }

    fn transport(&self) -> Option<reqwest::Client> {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Release the transport. Calls already in flight finish; later calls
    /// resolve to `ClientError::Closed`.
    pub fn close(&self) {
        let previous = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(limiter) = &self.dispatch.limiter {
            limiter.close();
        }
        if previous.is_some() {
            tracing::info!(base_url = %self.dispatch.base_url, "client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn host(&self) -> &str {
        &self.endpoint.host
    }

    pub fn port(&self) -> u16 {
        self.endpoint.port
    }

    pub fn protocol(&self) -> &str {
        &self.endpoint.protocol
    }

    pub fn prefix(&self) -> Option<&str> {
        self.endpoint.prefix.as_deref()
    }

    pub fn clean_prefix(&self) -> String {
        self.endpoint.clean_prefix()
    }

    pub fn base_url(&self) -> &str {
        &self.dispatch.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.dispatch.default_headers
    }
}

/// Per-client state shared with call tasks.
#[derive(Debug)]
struct Dispatch {
    base_url: String,
    default_headers: HeaderMap,
    response_charset: String,
    max_request_retry: u32,
    limiter: Option<Arc<Semaphore>>,
}

impl Dispatch {
    async fn execute<T, F, Fut>(
        &self,
        transport: &reqwest::Client,
        descriptor: RequestDescriptor,
        body: Option<String>,
        transform: F,
    ) -> Result<Response<T>, ClientError>
    where
        F: FnOnce(reqwest::Response, String) -> Fut,
        Fut: Future<Output = Result<Response<T>, ClientError>>,
    {
        let _permit = match &self.limiter {
            Some(limiter) => Some(
                Arc::clone(limiter)
                    .acquire_owned()
                    .await
                    .map_err(|_| ClientError::Closed)?,
            ),
            None => None,
        };
        let request = self.build_request(transport, descriptor, body).await?;
        tracing::debug!(method = %request.method(), url = %request.url(), "executing request");

        let response = send_with_retry(request, self.max_request_retry, |request| {
            transport.execute(request)
        })
        .await
        .map_err(ClientError::Transport)?;
        tracing::debug!(status = response.status().as_u16(), url = %response.url(), "response received");

        transform(response, self.response_charset.clone()).await
    }

    async fn build_request(
        &self,
        transport: &reqwest::Client,
        descriptor: RequestDescriptor,
        body: Option<String>,
    ) -> Result<reqwest::Request, ClientError> {
        let parts = descriptor.into_parts();
        let url = format!(
            "{}/{}",
            self.base_url,
            parts.relative_path.trim_start_matches('/')
        );
        let url = reqwest::Url::parse(&url)
            .map_err(|e| ClientError::InvalidRequest(format!("{url}: {e}")))?;
        let mut builder = transport.request(parts.method.into(), url);

        let form = expand_params(&parts.form_params);
        let request_body = select_body(parts.multipart, form, parts.binary, body);

        let mut headers = self.default_headers.clone();
        headers.set_all(&parts.headers);
        if request_body.sets_content_type() {
            // The transport writes its own, with the multipart boundary.
            headers.remove("content-type");
        }
        for (name, values) in headers.iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }

        let query = expand_params(&parts.query_params);
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        builder = match request_body {
            RequestBody::Multipart(body_parts) => builder.multipart(multipart_form(body_parts).await?),
            RequestBody::Form(entries) => builder.form(&entries),
            RequestBody::Binary(binary) => {
                let (body, length) = binary_body(binary).await?;
                match length {
                    Some(length) => builder.header(CONTENT_LENGTH, length).body(body),
                    None => builder.body(body),
                }
            }
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Empty => builder,
        };

        builder
            .build()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }
}

/// The single body a request is sent with.
#[derive(Debug)]
enum RequestBody {
    Multipart(Vec<BodyPart>),
    Form(Vec<(String, String)>),
    Binary(BinaryRequest),
    Text(String),
    Empty,
}

impl RequestBody {
    fn sets_content_type(&self) -> bool {
        matches!(self, RequestBody::Multipart(_) | RequestBody::Form(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            RequestBody::Multipart(_) => "multipart",
            RequestBody::Form(_) => "form",
            RequestBody::Binary(_) => "binary",
            RequestBody::Text(_) => "text",
            RequestBody::Empty => "empty",
        }
    }
}

fn select_body(
    multipart: Vec<BodyPart>,
    form: Vec<(String, String)>,
    binary: Option<BinaryRequest>,
    text: Option<String>,
) -> RequestBody {
    let provided = [
        !multipart.is_empty(),
        !form.is_empty(),
        binary.is_some(),
        text.is_some(),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    let selected = if !multipart.is_empty() {
        RequestBody::Multipart(multipart)
    } else if !form.is_empty() {
        RequestBody::Form(form)
    } else if let Some(binary) = binary {
        RequestBody::Binary(binary)
    } else if let Some(text) = text {
        RequestBody::Text(text)
    } else {
        RequestBody::Empty
    };

    if provided > 1 {
        tracing::warn!(
            provided,
            selected = selected.kind(),
            "request describes more than one body; lower precedence bodies are dropped"
        );
    }
    selected
}

async fn binary_body(binary: BinaryRequest) -> Result<(reqwest::Body, Option<u64>), ClientError> {
    match binary {
        BinaryRequest::File(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .map_err(|source| ClientError::File {
                    path: path.clone(),
                    source,
                })?;
            let length = file
                .metadata()
                .await
                .map_err(|source| ClientError::File { path, source })?
                .len();
            Ok((reqwest::Body::wrap_stream(reader_stream(file)), Some(length)))
        }
        BinaryRequest::Stream { reader, length } => {
            Ok((reqwest::Body::wrap_stream(reader_stream(reader)), length))
        }
        BinaryRequest::Bytes(bytes) => Ok((reqwest::Body::from(bytes), None)),
        BinaryRequest::Text(text) => Ok((reqwest::Body::from(text), None)),
    }
}

fn reader_stream<R>(reader: R) -> impl Stream<Item = io::Result<Bytes>> + Send + Sync + 'static
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
{
    stream::try_unfold(reader, |mut reader| async move {
        let mut buffer = vec![0u8; STREAM_CHUNK_SIZE];
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            return Ok(None);
        }
        buffer.truncate(read);
        Ok(Some((Bytes::from(buffer), reader)))
    })
}

async fn multipart_form(body_parts: Vec<BodyPart>) -> Result<multipart::Form, ClientError> {
    let mut form = multipart::Form::new();
    for part in body_parts {
        let transport_part = multipart_part(&part).await?;
        form = form.part(part.name().to_string(), transport_part);
    }
    Ok(form)
}

async fn multipart_part(part: &BodyPart) -> Result<multipart::Part, ClientError> {
    let mut transport_part = match part.content() {
        PartContent::Text(value) => multipart::Part::text(value.clone()),
        PartContent::File(path) => {
            let contents = tokio::fs::read(path)
                .await
                .map_err(|source| ClientError::File {
                    path: path.clone(),
                    source,
                })?;
            multipart::Part::bytes(contents)
        }
        PartContent::Bytes(bytes) => multipart::Part::bytes(bytes.to_vec()),
    };

    if let Some(file_name) = part.file_name() {
        transport_part = transport_part.file_name(file_name.to_string());
    }
    if let Some(content_type) = part.effective_content_type() {
        transport_part = transport_part.mime_str(&content_type).map_err(|e| {
            ClientError::InvalidRequest(format!("part {:?}: {e}", part.name()))
        })?;
    }

    let mut headers = reqwest::header::HeaderMap::new();
    if let Some(content_id) = part.content_id() {
        headers.insert("content-id", part_header(part, content_id)?);
    }
    if let Some(transfer_encoding) = part.transfer_encoding() {
        headers.insert("content-transfer-encoding", part_header(part, transfer_encoding)?);
    }
    if !headers.is_empty() {
        transport_part = transport_part.headers(headers);
    }
    Ok(transport_part)
}

fn part_header(part: &BodyPart, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidRequest(format!("part {:?}: {e}", part.name())))
}

/// Send `request`, re-sending it while the connection cannot be established.
/// Requests with a streaming body cannot be cloned and are sent once.
async fn send_with_retry<F, Fut>(
    request: reqwest::Request,
    max_retries: u32,
    mut send: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: FnMut(reqwest::Request) -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let copy = if attempt < max_retries {
            request.try_clone()
        } else {
            None
        };
        let Some(copy) = copy else {
            return send(request).await;
        };
        match send(copy).await {
            Err(error) if error.is_connect() => {
                attempt += 1;
                tracing::warn!(attempt, max_retries, url = %request.url(), %error, "connect failed, retrying");
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpParam;

    fn dispatch(default_headers: HeaderMap) -> Dispatch {
        Dispatch {
            base_url: Endpoint {
                prefix: Some("/api/".to_string()),
                ..Endpoint::default()
            }
            .base_url(),
            default_headers,
            response_charset: "UTF-8".to_string(),
            max_request_retry: 0,
            limiter: None,
        }
    }

    async fn build(descriptor: RequestDescriptor, body: Option<&str>) -> reqwest::Request {
        dispatch(HeaderMap::new())
            .build_request(&reqwest::Client::new(), descriptor, body.map(str::to_string))
            .await
            .unwrap()
    }

    fn body_text(request: &reqwest::Request) -> Option<&str> {
        request
            .body()
            .and_then(|body| body.as_bytes())
            .map(|bytes| std::str::from_utf8(bytes).unwrap())
    }

    #[tokio::test]
    async fn url_joins_prefix_and_relative_path() {
        let request = build(RequestDescriptor::get("alarms/7"), None).await;
        assert_eq!(request.url().as_str(), "http://localhost/api/alarms/7");

        let request = build(RequestDescriptor::get("/alarms"), None).await;
        assert_eq!(request.url().as_str(), "http://localhost/api/alarms");
    }

    #[tokio::test]
    async fn query_expands_repeated_and_skips_absent() {
        let descriptor = RequestDescriptor::get("alarms")
            .query_param("tag", HttpParam::repeated(["a", "b"]))
            .query_param("page", HttpParam::Single(None))
            .query_param("q", HttpParam::single("x y"));
        let request = build(descriptor, None).await;
        assert_eq!(request.url().query(), Some("tag=a&tag=b&q=x+y"));
    }

    #[tokio::test]
    async fn descriptor_headers_override_defaults() {
        let defaults: HeaderMap = [("Accept", "text/plain"), ("X-Client", "restgen")]
            .into_iter()
            .collect();
        let descriptor = RequestDescriptor::get("alarms")
            .header("accept", "application/json")
            .append_header("X-Tag", "1")
            .append_header("X-Tag", "2");
        let request = dispatch(defaults)
            .build_request(&reqwest::Client::new(), descriptor, None)
            .await
            .unwrap();

        let accept: Vec<_> = request.headers().get_all("accept").iter().collect();
        assert_eq!(accept, vec!["application/json"]);
        assert_eq!(request.headers()["x-client"], "restgen");
        assert_eq!(request.headers().get_all("x-tag").iter().count(), 2);
    }

    #[tokio::test]
    async fn string_body_is_sent_as_is() {
        let request = build(RequestDescriptor::post("alarms"), Some(r#"{"label":"a"}"#)).await;
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(body_text(&request), Some(r#"{"label":"a"}"#));
    }

    #[tokio::test]
    async fn binary_payload_wins_over_string_body() {
        let descriptor = RequestDescriptor::put("blob").binary(BinaryRequest::bytes(&b"raw"[..]));
        let request = build(descriptor, Some("ignored")).await;
        assert_eq!(body_text(&request), Some("raw"));
    }

    #[tokio::test]
    async fn form_wins_over_binary_payload() {
        let descriptor = RequestDescriptor::post("form")
            .form_param("label", HttpParam::single("x"))
            .form_param("tag", HttpParam::repeated(["a", "b"]))
            .binary(BinaryRequest::text("ignored"));
        let request = build(descriptor, Some("ignored too")).await;
        assert_eq!(body_text(&request), Some("label=x&tag=a&tag=b"));
        assert_eq!(
            request.headers()["content-type"],
            "application/x-www-form-urlencoded"
        );
    }

    #[tokio::test]
    async fn absent_form_params_do_not_replace_body() {
        let descriptor = RequestDescriptor::post("form").form_param("label", HttpParam::Single(None));
        let request = build(descriptor, Some("kept")).await;
        assert_eq!(body_text(&request), Some("kept"));
    }

    #[tokio::test]
    async fn multipart_wins_over_everything() {
        let descriptor = RequestDescriptor::post("upload")
            .part(BodyPart::text("note", "hello").with_content_id("<n1>"))
            .form_param("label", HttpParam::single("x"));
        let request = build(descriptor, Some("ignored")).await;
        let content_type = request.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="), "{content_type}");
    }

    #[tokio::test]
    async fn multipart_replaces_caller_content_type() {
        let descriptor = RequestDescriptor::post("upload")
            .header("Content-Type", "multipart/form-data")
            .part(BodyPart::text("note", "hello"));
        let request = build(descriptor, None).await;

        let content_types: Vec<_> = request.headers().get_all("content-type").iter().collect();
        assert_eq!(content_types.len(), 1);
        let content_type = content_types[0].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="), "{content_type}");
    }

    #[tokio::test]
    async fn form_replaces_default_content_type() {
        let defaults: HeaderMap = [("Content-Type", "application/json")].into_iter().collect();
        let descriptor = RequestDescriptor::post("form").form_param("label", HttpParam::single("x"));
        let request = dispatch(defaults)
            .build_request(&reqwest::Client::new(), descriptor, None)
            .await
            .unwrap();

        let content_types: Vec<_> = request.headers().get_all("content-type").iter().collect();
        assert_eq!(content_types, vec!["application/x-www-form-urlencoded"]);
    }

    #[tokio::test]
    async fn string_body_keeps_caller_content_type() {
        let descriptor = RequestDescriptor::post("alarms").header("Content-Type", "application/json");
        let request = build(descriptor, Some("{}")).await;
        assert_eq!(request.headers()["content-type"], "application/json");
    }

    #[tokio::test]
    async fn file_payload_sets_content_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, vec![7u8; 1000]).unwrap();

        let request = build(RequestDescriptor::put("blob").binary(BinaryRequest::file(&path)), None).await;
        assert_eq!(request.headers()[CONTENT_LENGTH], "1000");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = dispatch(HeaderMap::new())
            .build_request(
                &reqwest::Client::new(),
                RequestDescriptor::put("blob").binary(BinaryRequest::file("/definitely/not/here.bin")),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::File { .. }));
    }

    #[tokio::test]
    async fn invalid_header_value_is_reported() {
        let err = dispatch(HeaderMap::new())
            .build_request(
                &reqwest::Client::new(),
                RequestDescriptor::get("alarms").header("X-Bad", "line\nbreak"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn reader_stream_yields_all_bytes() {
        use futures::TryStreamExt;

        let data = vec![3u8; STREAM_CHUNK_SIZE + 10];
        let chunks: Vec<Bytes> = reader_stream(std::io::Cursor::new(data.clone()))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.concat(), data);
    }

    async fn refused_url() -> reqwest::Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        reqwest::Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
    }

    #[tokio::test]
    async fn connect_failures_are_resent_up_to_the_limit() {
        let transport = reqwest::Client::new();
        let request = transport.get(refused_url().await).build().unwrap();

        let mut attempts = 0;
        let err = send_with_retry(request, 3, |request| {
            attempts += 1;
            transport.execute(request)
        })
        .await
        .unwrap_err();
        assert!(err.is_connect());
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn retry_stops_once_the_connection_succeeds() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = format!("http://{}/api/status/200", listener.local_addr().unwrap());
        tokio::spawn(mock_server::run(listener));
        let refused = refused_url().await;

        let transport = reqwest::Client::new();
        let request = transport.get(live.as_str()).build().unwrap();
        let mut attempts = 0;
        let response = send_with_retry(request, 5, |mut request| {
            attempts += 1;
            if attempts < 3 {
                *request.url_mut() = refused.clone();
            }
            transport.execute(request)
        })
        .await
        .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn streamed_body_is_sent_once() {
        let transport = reqwest::Client::new();
        let body = reqwest::Body::wrap_stream(reader_stream(std::io::Cursor::new(b"once".to_vec())));
        let request = transport
            .post(refused_url().await)
            .body(body)
            .build()
            .unwrap();

        let mut attempts = 0;
        let err = send_with_retry(request, 5, |request| {
            attempts += 1;
            transport.execute(request)
        })
        .await
        .unwrap_err();
        assert!(err.is_connect());
        assert_eq!(attempts, 1);
    }

    #[test]
    fn build_without_runtime_fails() {
        let err = HttpClient::builder().build().unwrap_err();
        assert!(matches!(err, ClientError::Runtime(_)));
    }

    #[tokio::test]
    async fn unknown_response_charset_fails_fast() {
        let config = ClientConfig {
            response_charset: "no-such-charset".to_string(),
            ..ClientConfig::default()
        };
        let err = HttpClient::builder().config(config).build().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn zero_max_connections_fails_fast() {
        let config = ClientConfig {
            max_connections: Some(0),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpClient::builder().config(config).build(),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreadable_root_certificate_fails_fast() {
        let config = ClientConfig {
            root_certificates: vec!["/definitely/not/here.pem".into()],
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpClient::builder().config(config).build(),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn builder_defaults() {
        let client = HttpClient::builder()
            .default_header("X-Client", "restgen")
            .build()
            .unwrap();
        assert_eq!(client.host(), "localhost");
        assert_eq!(client.port(), 80);
        assert_eq!(client.protocol(), "http");
        assert_eq!(client.prefix(), None);
        assert_eq!(client.clean_prefix(), "");
        assert_eq!(client.base_url(), "http://localhost:80");
        assert_eq!(client.default_headers().get("x-client"), Some("restgen"));
        assert_eq!(client.config(), &ClientConfig::default());
    }

    #[tokio::test]
    async fn calls_after_close_fail_with_closed() {
        let client = HttpClient::builder().build().unwrap();
        assert!(!client.is_closed());
        client.close();
        assert!(client.is_closed());

        let err = client
            .call_to_string_response(RequestDescriptor::get("anything"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Closed));
    }
}
