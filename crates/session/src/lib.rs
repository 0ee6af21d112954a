//! `zd-session` — the WhatsApp session connection manager.
//!
//! One logical messaging session per process: this crate owns the
//! credentials that let the session resume without re-pairing, the single
//! live connection to the external transport, and the state machine that
//! decides how to react when that connection drops.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  SessionManager                                          │
//! │                                                          │
//! │   connect() ─▶ supervisor task ──▶ TransportConnector    │
//! │                    │                     │               │
//! │                    ◀── TransportEvent stream ◀───────────┤
//! │                    │                                     │
//! │   status()  ◀── ConnectionState + pairing code           │
//! │   send()    ──▶ Arc<dyn Transport> (only while Open)     │
//! │   logout()  ──▶ cancel supervisor, clear CredentialStore │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle (hard-coded by the manager)
//!
//! 1. `connect()` spawns exactly one supervisor task; re-entrant calls are
//!    rejected while a session is connecting, pairing, or open.
//! 2. The supervisor loads stored credentials, opens the transport, and
//!    folds the transport's event stream into [`ConnectionState`].
//! 3. A transient close reconnects automatically with the currently
//!    persisted credentials; a logged-out close is terminal.
//! 4. Rotated credentials are persisted whole, never merged.
//! 5. `logout()` tears everything down and erases the credential blob.
//!
//! The wire protocol itself lives behind the [`Transport`] capability
//! traits — this crate never parses frames or touches the network.

pub mod credentials;
pub mod dev;
pub mod manager;
pub mod reconnect;
pub mod recipient;
pub mod transport;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use credentials::{CredentialStore, PersistenceError};
pub use manager::{ConnectionState, ConnectionStatus, SendError, SessionError, SessionManager};
pub use reconnect::ReconnectBackoff;
pub use transport::{
    DisconnectReason, SessionCredentials, Transport, TransportConnector, TransportError,
    TransportEvent, TransportSession,
};
