//! In-memory HTTP API used to exercise `restgen-core` over real sockets.
//!
//! Everything is mounted under `/api` so clients must be configured with a
//! path prefix. Besides a small alarm resource (typed JSON round-trips with
//! time-only fields) the server exposes diagnostic routes: `echo` reflects the
//! received request back as JSON, `upload` lists multipart parts, and a few
//! routes return fixed charsets, binary payloads, statuses and delays.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::to_bytes,
    extract::{Multipart, OriginalUri, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

const MAX_ECHO_BODY: usize = 4 * 1024 * 1024;

/// "café" encoded as ISO-8859-1.
pub const LATIN1_BODY: &[u8] = b"caf\xe9";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Alarm {
    pub id: Uuid,
    pub label: String,
    pub ring_at: String,
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct CreateAlarm {
    pub label: String,
    pub ring_at: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct UpdateAlarm {
    pub label: Option<String>,
    pub ring_at: Option<String>,
    pub enabled: Option<bool>,
}

/// The request as seen by the server, returned by the `echo` route.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EchoedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl EchoedRequest {
    /// All values received for `name`, compared case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// One part of a multipart upload, returned by the `upload` route.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content_id: Option<String>,
    pub content: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Alarm>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    let api = Router::new()
        .route("/alarms", get(list_alarms).post(create_alarm))
        .route(
            "/alarms/{id}",
            get(get_alarm).put(update_alarm).delete(delete_alarm),
        )
        .route("/echo", any(echo))
        .route("/upload", post(upload))
        .route("/latin1", get(latin1))
        .route("/download", get(download))
        .route("/status/{code}", any(status))
        .route("/slow/{millis}", get(slow))
        .route("/redirect", get(redirect))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// The bytes served by the `download` route.
pub fn download_payload() -> Vec<u8> {
    (0..=255u8).cycle().take(4096).collect()
}

async fn list_alarms(State(db): State<Db>) -> Json<Vec<Alarm>> {
    let alarms = db.read().await;
    Json(alarms.values().cloned().collect())
}

async fn create_alarm(
    State(db): State<Db>,
    Json(input): Json<CreateAlarm>,
) -> (StatusCode, Json<Alarm>) {
    let alarm = Alarm {
        id: Uuid::new_v4(),
        label: input.label,
        ring_at: input.ring_at,
        enabled: input.enabled,
    };
    tracing::debug!(id = %alarm.id, "alarm created");
    db.write().await.insert(alarm.id, alarm.clone());
    (StatusCode::CREATED, Json(alarm))
}

async fn get_alarm(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Alarm>, StatusCode> {
    let alarms = db.read().await;
    alarms.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_alarm(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAlarm>,
) -> Result<Json<Alarm>, StatusCode> {
    let mut alarms = db.write().await;
    let alarm = alarms.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(label) = input.label {
        alarm.label = label;
    }
    if let Some(ring_at) = input.ring_at {
        alarm.ring_at = ring_at;
    }
    if let Some(enabled) = input.enabled {
        alarm.enabled = enabled;
    }
    Ok(Json(alarm.clone()))
}

async fn delete_alarm(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let mut alarms = db.write().await;
    alarms
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn echo(
    OriginalUri(uri): OriginalUri,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Result<Json<EchoedRequest>, StatusCode> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_ECHO_BODY)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect();
    Ok(Json(EchoedRequest {
        method: parts.method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    }))
}

async fn upload(mut multipart: Multipart) -> Result<Json<Vec<UploadedPart>>, StatusCode> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let content_id = field
            .headers()
            .get("content-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        parts.push(UploadedPart {
            name,
            file_name,
            content_type,
            content_id,
            content: String::from_utf8_lossy(&data).into_owned(),
        });
    }
    Ok(Json(parts))
}

async fn latin1() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=ISO-8859-1")],
        LATIN1_BODY.to_vec(),
    )
}

async fn download() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        download_payload(),
    )
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn slow(Path(millis): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    "done"
}

async fn redirect() -> Redirect {
    Redirect::to("/api/echo")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_serializes_to_json() {
        let alarm = Alarm {
            id: Uuid::nil(),
            label: "Wake up".to_string(),
            ring_at: "07:30:00".to_string(),
            enabled: true,
        };
        let json = serde_json::to_value(&alarm).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["label"], "Wake up");
        assert_eq!(json["ring_at"], "07:30:00");
        assert_eq!(json["enabled"], true);
    }

    #[test]
    fn create_alarm_defaults_enabled_to_false() {
        let input: CreateAlarm =
            serde_json::from_str(r#"{"label":"Nap","ring_at":"14:00:00"}"#).unwrap();
        assert_eq!(input.label, "Nap");
        assert!(!input.enabled);
    }

    #[test]
    fn create_alarm_rejects_missing_time() {
        let result: Result<CreateAlarm, _> = serde_json::from_str(r#"{"label":"Nap"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_alarm_all_fields_optional() {
        let input: UpdateAlarm = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.label.is_none());
        assert!(input.ring_at.is_none());
        assert!(input.enabled.is_none());
    }

    #[test]
    fn echoed_request_header_lookup_ignores_case() {
        let echoed = EchoedRequest {
            method: "GET".to_string(),
            path: "/api/echo".to_string(),
            query: Vec::new(),
            headers: vec![
                ("x-trace".to_string(), "a".to_string()),
                ("X-Trace".to_string(), "b".to_string()),
            ],
            body: String::new(),
        };
        assert_eq!(echoed.header_values("X-TRACE"), vec!["a", "b"]);
        assert!(echoed.header_values("accept").is_empty());
    }

    #[test]
    fn download_payload_is_stable() {
        let payload = download_payload();
        assert_eq!(payload.len(), 4096);
        assert_eq!(payload[0], 0);
        assert_eq!(payload[255], 255);
        assert_eq!(payload[256], 0);
    }
}
