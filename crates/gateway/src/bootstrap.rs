//! AppState construction, shared by `serve` and the config subcommands.

use std::sync::Arc;

use anyhow::Context;

use zd_domain::config::Config;
use zd_session::dev::DevConnector;
use zd_session::{CredentialStore, SessionError, SessionManager, TransportConnector};

use crate::api::auth;
use crate::notify::DeliveryLog;
use crate::state::AppState;

/// Initialize every subsystem and return a fully-wired [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let state_path = &config.whatsapp.state_path;
    std::fs::create_dir_all(state_path)
        .with_context(|| format!("creating state dir {}", state_path.display()))?;

    // ── Credential store ─────────────────────────────────────────────
    let credentials =
        Arc::new(CredentialStore::new(state_path).context("initializing credential store")?);

    // ── Transport backend ────────────────────────────────────────────
    let connector = connector_for(&config.whatsapp.transport)?;
    tracing::info!(transport = %config.whatsapp.transport, "transport backend selected");

    // ── Session manager ──────────────────────────────────────────────
    let session = Arc::new(SessionManager::new(
        &config.whatsapp,
        credentials,
        connector,
    ));

    // ── Delivery log ─────────────────────────────────────────────────
    let deliveries = Arc::new(DeliveryLog::new(state_path));

    // ── API token (read once, hashed for constant-time comparison) ──
    let api_token_hash = auth::token_hash_from_env(&config.server.api_token_env);

    Ok(AppState {
        config,
        session,
        deliveries,
        api_token_hash,
    })
}

/// Open the session at startup when configured to.
pub fn start_session(state: &AppState) {
    if !state.config.whatsapp.connect_on_start {
        tracing::info!("connect_on_start disabled, waiting for POST /v1/whatsapp/connect");
        return;
    }
    match state.session.connect() {
        Ok(()) => tracing::info!("session connect issued"),
        Err(SessionError::ConcurrentConnectRejected) => {}
        Err(e) => tracing::error!(error = %e, "startup connect failed"),
    }
}

fn connector_for(name: &str) -> anyhow::Result<Arc<dyn TransportConnector>> {
    match name {
        "dev" => Ok(Arc::new(DevConnector)),
        other => anyhow::bail!(
            "unknown whatsapp.transport '{other}' (built-in backends: \"dev\")"
        ),
    }
}
