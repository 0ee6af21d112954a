//! `zd-gateway` — the HTTP surface over the ZapDesk WhatsApp session.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod notify;
pub mod state;
