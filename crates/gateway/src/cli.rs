use clap::{Parser, Subcommand};

/// ZapDesk — back-office WhatsApp session gateway.
#[derive(Debug, Parser)]
#[command(name = "zapdesk", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `ZD_CONFIG` (or
/// `config.toml` by default).  Returns the parsed config and the path
/// that was used.  A missing file yields the built-in defaults.
pub fn load_config() -> anyhow::Result<(zd_domain::Config, String)> {
    let config_path = std::env::var("ZD_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = zd_domain::Config::load(std::path::Path::new(&config_path))
        .map_err(|e| anyhow::anyhow!("loading {config_path}: {e}"))?;
    Ok((config, config_path))
}
