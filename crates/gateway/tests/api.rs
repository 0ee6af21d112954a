//! API surface tests: routes, auth gating, and response shapes, exercised
//! against the real router with the in-process dev transport.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use sha2::{Digest, Sha256};
use tower::ServiceExt;

use zd_domain::config::Config;
use zd_gateway::notify::DeliveryLog;
use zd_gateway::state::AppState;
use zd_gateway::{api, bootstrap};
use zd_session::dev::DevConnector;
use zd_session::{CredentialStore, SessionManager};

fn test_state(dir: &tempfile::TempDir, api_token: Option<&str>) -> AppState {
    let mut config = Config::default();
    config.whatsapp.state_path = dir.path().to_path_buf();

    let credentials = Arc::new(CredentialStore::new(dir.path()).unwrap());
    let session = Arc::new(SessionManager::new(
        &config.whatsapp,
        credentials,
        Arc::new(DevConnector),
    ));

    AppState {
        config: Arc::new(config),
        session,
        deliveries: Arc::new(DeliveryLog::new(dir.path())),
        api_token_hash: api_token.map(|t| Sha256::digest(t.as_bytes()).to_vec()),
    }
}

fn app(state: AppState) -> axum::Router {
    api::router(state.clone()).with_state(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn post_json(path: &str, json: serde_json::Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn wait_until(what: &str, mut predicate: impl FnMut() -> bool) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

// ── Auth ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(test_state(&dir, Some("secret")));

    let response = app.oneshot(get("/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, Some("secret"));

    let response = app(state.clone())
        .oneshot(get("/v1/whatsapp/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(state.clone())
        .oneshot(
            Request::get("/v1/whatsapp/status")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(state)
        .oneshot(
            Request::get("/v1/whatsapp/status")
                .header(header::AUTHORIZATION, "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn no_token_configured_means_dev_mode() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(test_state(&dir, None));

    let response = app.oneshot(get("/v1/whatsapp/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ── Status / send / logout surfaces ─────────────────────────────────────

#[tokio::test]
async fn status_shape_while_disconnected() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(test_state(&dir, None));

    let response = app.oneshot(get("/v1/whatsapp/status")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["connected"], false);
    assert_eq!(json["qrCode"], serde_json::Value::Null);
}

#[tokio::test]
async fn send_while_disconnected_is_conflict_and_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, None);

    let response = app(state.clone())
        .oneshot(post_json(
            "/v1/whatsapp/send",
            serde_json::json!({ "phoneNumber": "(88) 99671-0011", "message": "oi" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "not connected");

    let (records, total) = state.deliveries.list(10, 0).await;
    assert_eq!(total, 1);
    assert_eq!(records[0].recipient, "5588996710011");
}

#[tokio::test]
async fn empty_message_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(test_state(&dir, None));

    let response = app
        .oneshot(post_json(
            "/v1/whatsapp/send",
            serde_json::json!({ "phoneNumber": "88996710011", "message": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_session_flow_over_the_api() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir, None);

    // Start the session.
    let response = app(state.clone())
        .oneshot(post_json("/v1/whatsapp/connect", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["started"], true);

    // A second connect is an idempotent no-op.
    let response = app(state.clone())
        .oneshot(post_json("/v1/whatsapp/connect", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["started"], false);

    // Dev transport pairs and opens on its own.
    let session = state.session.clone();
    wait_until("session open", || session.status().connected).await;

    let response = app(state.clone())
        .oneshot(post_json(
            "/v1/whatsapp/send",
            serde_json::json!({ "phoneNumber": "88 99671-0011", "message": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["messageId"], "dev-1");

    // Delivery log lists the send.
    let response = app(state.clone())
        .oneshot(get("/v1/deliveries"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["deliveries"][0]["status"], "sent");

    // Logout tears everything down.
    let response = app(state.clone())
        .oneshot(post_json("/v1/whatsapp/logout", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["success"], true);

    let response = app(state.clone())
        .oneshot(get("/v1/whatsapp/status"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["connected"], false);
    assert_eq!(json["qrCode"], serde_json::Value::Null);
}

// ── Bootstrap ───────────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_rejects_unknown_transport() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.whatsapp.state_path = dir.path().to_path_buf();
    config.whatsapp.transport = "carrier-pigeon".into();

    let err = bootstrap::build_app_state(Arc::new(config)).unwrap_err();
    assert!(err.to_string().contains("carrier-pigeon"));
}
