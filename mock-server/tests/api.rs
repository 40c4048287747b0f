use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Alarm, EchoedRequest, UploadedPart, LATIN1_BODY};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- alarms ---

#[tokio::test]
async fn list_alarms_empty() {
    let resp = app().oneshot(get("/api/alarms")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let alarms: Vec<Alarm> = body_json(resp).await;
    assert!(alarms.is_empty());
}

#[tokio::test]
async fn create_alarm_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/alarms",
            r#"{"label":"Wake up","ring_at":"07:30:00"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let alarm: Alarm = body_json(resp).await;
    assert_eq!(alarm.label, "Wake up");
    assert_eq!(alarm.ring_at, "07:30:00");
    assert!(!alarm.enabled);
}

#[tokio::test]
async fn get_alarm_not_found() {
    let resp = app()
        .oneshot(get("/api/alarms/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn routes_are_only_served_under_api() {
    let resp = app().oneshot(get("/alarms")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn alarm_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/alarms",
            r#"{"label":"Gym","ring_at":"06:00:00","enabled":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Alarm = body_json(resp).await;
    let id = created.id;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/api/alarms/{id}"),
            r#"{"ring_at":"06:15:00"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Alarm = body_json(resp).await;
    assert_eq!(updated.label, "Gym");
    assert_eq!(updated.ring_at, "06:15:00");
    assert!(updated.enabled);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/alarms/{id}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/api/alarms/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- diagnostics ---

#[tokio::test]
async fn echo_reflects_repeated_query_and_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/echo?tag=a&tag=b&page=2")
                .header("X-Trace", "abc")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echoed: EchoedRequest = body_json(resp).await;
    assert_eq!(echoed.method, "POST");
    assert_eq!(echoed.path, "/api/echo");
    assert_eq!(
        echoed.query,
        vec![
            ("tag".to_string(), "a".to_string()),
            ("tag".to_string(), "b".to_string()),
            ("page".to_string(), "2".to_string()),
        ]
    );
    assert_eq!(echoed.header_values("x-trace"), vec!["abc"]);
    assert_eq!(echoed.body, "payload");
}

#[tokio::test]
async fn latin1_declares_its_charset() {
    let resp = app().oneshot(get("/api/latin1")).await.unwrap();

    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "text/plain; charset=ISO-8859-1"
    );
    assert_eq!(body_bytes(resp).await.as_ref(), LATIN1_BODY);
}

#[tokio::test]
async fn status_route_returns_requested_code() {
    let resp = app().oneshot(get("/api/status/418")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_bytes(resp).await.as_ref(), b"status 418");
}

#[tokio::test]
async fn redirect_points_at_echo() {
    let resp = app().oneshot(get("/api/redirect")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[http::header::LOCATION], "/api/echo");
}

#[tokio::test]
async fn upload_lists_multipart_parts() {
    let body = concat!(
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"note\"\r\n",
        "Content-ID: <note-1>\r\n",
        "\r\n",
        "hello\r\n",
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "file body\r\n",
        "--XBOUNDARY--\r\n",
    );
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(
                    http::header::CONTENT_TYPE,
                    "multipart/form-data; boundary=XBOUNDARY",
                )
                .body(body.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let parts: Vec<UploadedPart> = body_json(resp).await;
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].name, "note");
    assert_eq!(parts[0].content_id.as_deref(), Some("<note-1>"));
    assert_eq!(parts[0].content, "hello");
    assert_eq!(parts[1].file_name.as_deref(), Some("a.txt"));
    assert_eq!(parts[1].content_type.as_deref(), Some("text/plain"));
    assert_eq!(parts[1].content, "file body");
}
