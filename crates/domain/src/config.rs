use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_3210")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Environment variable holding the API bearer token for protected
    /// endpoints.  If the env var is set and non-empty, every endpoint
    /// except `/v1/health` requires `Authorization: Bearer <token>`.
    /// If unset, the server logs a warning and allows unauthenticated access.
    #[serde(default = "d_api_token_env")]
    pub api_token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3210,
            host: "127.0.0.1".into(),
            api_token_env: d_api_token_env(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WhatsApp session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Durable state root.  Session credentials live under
    /// `<state_path>/credentials`, the delivery log under `<state_path>`.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Country calling code prepended to recipient numbers that don't
    /// already carry it (digits only, e.g. `"55"` for Brazil).
    #[serde(default = "d_prefix")]
    pub country_prefix: String,
    /// Transport backend to connect with.  `"dev"` is the built-in
    /// in-process transport; a real bridge registers its own name.
    #[serde(default = "d_transport")]
    pub transport: String,
    /// Whether to open the session automatically at server startup.
    #[serde(default = "d_true")]
    pub connect_on_start: bool,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
            country_prefix: d_prefix(),
            transport: d_transport(),
            connect_on_start: true,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Reconnect policy for the session supervisor.  Applies to *failed*
/// connect attempts; a transient drop of an open session reconnects
/// immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "d_1000")]
    pub initial_delay_ms: u64,
    #[serde(default = "d_60000")]
    pub max_delay_ms: u64,
    #[serde(default = "d_factor")]
    pub backoff_factor: f64,
    /// Consecutive failures before giving up.  `0` means unlimited.
    #[serde(default)]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_factor: 2.0,
            max_attempts: 0,
        }
    }
}

impl Config {
    /// Load from a TOML file.  A missing file yields the built-in
    /// defaults, so a bare checkout runs with zero setup.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            crate::error::Error::Config(format!("parsing {}: {e}", path.display()))
        })
    }
}

// ── Serde default helpers ───────────────────────────────────────────

fn d_3210() -> u16 {
    3210
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_api_token_env() -> String {
    "ZD_API_TOKEN".into()
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data/state")
}
fn d_prefix() -> String {
    "55".into()
}
fn d_transport() -> String {
    "dev".into()
}
fn d_true() -> bool {
    true
}
fn d_1000() -> u64 {
    1_000
}
fn d_60000() -> u64 {
    60_000
}
fn d_factor() -> f64 {
    2.0
}
