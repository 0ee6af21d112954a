pub mod auth;
pub mod deliveries;
pub mod whatsapp;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the `ZD_API_TOKEN` bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(health));

    let protected = Router::new()
        // WhatsApp session
        .route("/v1/whatsapp/status", get(whatsapp::status))
        .route("/v1/whatsapp/send", post(whatsapp::send))
        .route("/v1/whatsapp/connect", post(whatsapp::connect))
        .route("/v1/whatsapp/logout", post(whatsapp::logout))
        // Outgoing-message status records
        .route("/v1/deliveries", get(deliveries::list_deliveries))
        .layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}

/// `GET /v1/health` — liveness probe.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
