//! WhatsApp session API.
//!
//! - `GET  /v1/whatsapp/status`  — connection status + pairing code
//! - `POST /v1/whatsapp/send`    — send a message to a client
//! - `POST /v1/whatsapp/connect` — start the session if disconnected
//! - `POST /v1/whatsapp/logout`  — terminal teardown, erases credentials

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use zd_session::{recipient, SendError, SessionError};

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
struct StatusResponse {
    connected: bool,
    #[serde(rename = "qrCode")]
    qr_code: Option<String>,
}

#[derive(Deserialize)]
pub struct SendRequest {
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    pub message: String,
}

#[derive(Serialize)]
struct SendResponse {
    success: bool,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/whatsapp/status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.session.status();
    Json(StatusResponse {
        connected: status.connected,
        qr_code: status.pairing_code,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/whatsapp/send
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Response {
    if req.message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }

    let to = recipient::normalize(&req.phone_number, &state.config.whatsapp.country_prefix);

    match state.session.send(&req.phone_number, &req.message).await {
        Ok(message_id) => {
            state.deliveries.record_sent(&to, &message_id).await;
            Json(SendResponse {
                success: true,
                message_id: Some(message_id),
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            state.deliveries.record_failed(&to, &e.to_string()).await;
            let status = match e {
                SendError::NotConnected => StatusCode::CONFLICT,
                SendError::Transport(_) => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(SendResponse {
                    success: false,
                    message_id: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/whatsapp/connect
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn connect(State(state): State<AppState>) -> impl IntoResponse {
    match state.session.connect() {
        Ok(()) => Json(serde_json::json!({ "started": true })),
        // Already connecting, pairing, or open — idempotent for callers.
        Err(SessionError::ConcurrentConnectRejected) => {
            Json(serde_json::json!({ "started": false }))
        }
        Err(e) => Json(serde_json::json!({ "started": false, "error": e.to_string() })),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/whatsapp/logout
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn logout(State(state): State<AppState>) -> Response {
    match state.session.logout().await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "logout failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}
