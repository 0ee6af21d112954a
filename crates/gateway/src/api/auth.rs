//! Bearer-token auth for the protected routes.
//!
//! The token lives in the env var named by `config.server.api_token_env`
//! (`ZD_API_TOKEN` by default) and is read exactly once, at startup; only
//! its SHA-256 digest is kept in `AppState`, never the token itself. With
//! the env var unset or empty the gateway runs open, which is fine on a
//! developer machine and logged loudly so it is not fine silently in
//! production.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Middleware guarding everything behind the public route split.  Wire up
/// with `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_hash) = &state.api_token_hash else {
        // No token configured: dev mode, everything passes.
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    // Digests are fixed length, so a constant-time compare leaks neither
    // the token bytes nor how long the right token is.
    let provided_hash = Sha256::digest(provided.as_bytes());
    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return (
            axum::http::StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": "missing or invalid bearer token" })),
        )
            .into_response();
    }

    next.run(req).await
}

/// Resolve the configured token to its digest at startup.  `None` means
/// the gateway runs unauthenticated.
pub fn token_hash_from_env(env_var: &str) -> Option<Vec<u8>> {
    match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
        Some(token) => {
            tracing::info!(env_var, "bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        None => {
            tracing::warn!(env_var, "bearer-token auth disabled, API is open");
            None
        }
    }
}
