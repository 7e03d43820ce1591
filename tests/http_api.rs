//! HTTP surface integration tests
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`, so no
//! listener is bound.

use std::time::Duration;

use axum::body::{Body, BodyDataStream};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use quiz_realtime_service::config::Settings;
use quiz_realtime_service::server::{create_app, AppState};

fn test_app(settings: Settings) -> (Router, AppState) {
    let state = AppState::new(settings);
    (create_app(state.clone()), state)
}

async fn open_stream(app: &Router, code: &str) -> (StatusCode, header::HeaderMap, BodyDataStream) {
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/sessions/{}/stream", code))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    (status, headers, response.into_body().into_data_stream())
}

async fn next_frame(body: &mut BodyDataStream) -> String {
    let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .expect("frame should arrive")
        .expect("stream should be open")
        .expect("chunk should be readable");
    String::from_utf8(chunk.to_vec()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn stream_sends_connected_first_and_cleans_up_on_disconnect() {
    let (app, state) = test_app(Settings::default());

    let (status, headers, mut body) = open_stream(&app, "%20abc123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-transform");
    assert_eq!(headers[header::CONNECTION], "keep-alive");
    assert_eq!(headers["x-accel-buffering"], "no");

    let connected = next_frame(&mut body).await;
    assert!(connected.starts_with("event: connected\ndata: "));
    assert!(connected.contains(r#""sessionCode":"ABC123""#));
    assert!(connected.contains(r#""clientId":""#));
    assert!(connected.ends_with("\n\n"));

    let stats = state.broadcast_manager.get_session_stats("ABC123").unwrap();
    assert_eq!(stats.clients, 1);
    assert_eq!(stats.stats.attendee_count, 1);

    drop(body);

    assert!(state.broadcast_manager.get_session_stats("ABC123").is_none());
    assert_eq!(state.broadcast_manager.get_health_metrics().total_clients, 0);
}

#[tokio::test]
async fn stream_rejects_invalid_session_code() {
    let (app, state) = test_app(Settings::default());

    let (status, _, _) = open_stream(&app, "bad%20code").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.broadcast_manager.get_active_sessions().is_empty());
}

#[tokio::test]
async fn published_event_reaches_connected_viewer() {
    let (app, _state) = test_app(Settings::default());
    let (_, _, mut body) = open_stream(&app, "QUIZ42").await;
    next_frame(&mut body).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/sessions/quiz42/events",
            json!({
                "type": "participant_joined",
                "participantId": "p-7",
                "name": "Grace"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = json_body(response).await;
    assert_eq!(accepted["accepted"], true);
    assert_eq!(accepted["event"], "participant_joined");
    assert_eq!(accepted["sessionCode"], "QUIZ42");

    let frame = next_frame(&mut body).await;
    assert!(frame.starts_with("event: participant_joined\ndata: "));
    assert!(frame.contains(r#""participantId":"p-7""#));
    assert!(!frame.contains(r#""type""#));
}

#[tokio::test]
async fn generic_broadcast_reports_delivery() {
    let (app, _state) = test_app(Settings::default());
    let (_, _, mut first) = open_stream(&app, "ROOM1").await;
    let (_, _, mut second) = open_stream(&app, "ROOM1").await;
    next_frame(&mut first).await;
    next_frame(&mut second).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/sessions/ROOM1/broadcast",
            json!({"event": "question_opened", "payload": {"questionId": "q3"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["delivered"], 2);
    assert_eq!(outcome["failed"], 0);

    for body in [&mut first, &mut second] {
        let frame = next_frame(body).await;
        assert!(frame.starts_with("event: question_opened\ndata: {\"questionId\":\"q3\"}\nid: "));
    }
}

#[tokio::test]
async fn generic_broadcast_rejects_multiline_event_name() {
    let (app, _state) = test_app(Settings::default());

    let response = app
        .oneshot(post_json(
            "/api/v1/sessions/ROOM1/broadcast",
            json!({"event": "evil\ndata: injected", "payload": {}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = json_body(response).await;
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn publishing_requires_api_key_when_configured() {
    let mut settings = Settings::default();
    settings.api.key = Some("s3cret".to_string());
    let (app, _state) = test_app(settings);
    let event = json!({"type": "participant_deleted", "participantId": "p-1"});

    let missing = app
        .clone()
        .oneshot(post_json("/api/v1/sessions/ABC/events", event.clone()))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let mut wrong = post_json("/api/v1/sessions/ABC/events", event.clone());
    wrong.headers_mut().insert("X-API-Key", "nope".parse().unwrap());
    let wrong = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let mut valid = post_json("/api/v1/sessions/ABC/events", event);
    valid.headers_mut().insert("X-API-Key", "s3cret".parse().unwrap());
    let valid = app.oneshot(valid).await.unwrap();
    assert_eq!(valid.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn session_stats_unknown_code_is_not_found() {
    let (app, _state) = test_app(Settings::default());

    let response = app
        .oneshot(
            Request::get("/api/sessions/GHOST/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error = json_body(response).await;
    assert_eq!(error["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn session_listing_and_health_reflect_open_streams() {
    let (app, _state) = test_app(Settings::default());
    let (_, _, mut body) = open_stream(&app, "LIVE01").await;
    next_frame(&mut body).await;

    let sessions = app
        .clone()
        .oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(sessions.status(), StatusCode::OK);
    let sessions = json_body(sessions).await;
    assert_eq!(sessions["totalSessions"], 1);
    assert_eq!(sessions["sessions"][0]["sessionCode"], "LIVE01");
    assert_eq!(sessions["sessions"][0]["attendeeCount"], 1);

    let stats = app
        .clone()
        .oneshot(
            Request::get("/api/sessions/live01/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::OK);

    let health = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let health = json_body(health).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["activeSessions"], 1);
    assert_eq!(health["totalClients"], 1);
    assert!(health["uptimeSeconds"].is_u64());
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let (app, _state) = test_app(Settings::default());

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("quiz_realtime_sessions_active"));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let (app, _state) = test_app(Settings::default());

    let response = app
        .oneshot(
            Request::get("/health")
                .header(header::ORIGIN, "https://host.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
