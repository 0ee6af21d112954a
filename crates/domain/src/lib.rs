//! `zd-domain` — shared configuration and error types for ZapDesk crates.

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
