use std::sync::Arc;

use zd_domain::config::Config;
use zd_session::SessionManager;

use crate::notify::DeliveryLog;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// The process-wide WhatsApp session.
    pub session: Arc<SessionManager>,
    /// Outgoing-message status records.
    pub deliveries: Arc<DeliveryLog>,
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
