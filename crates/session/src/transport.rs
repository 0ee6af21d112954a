//! Capability traits for the external real-time messaging transport.
//!
//! The actual protocol (framing, encryption, multi-device pairing) is the
//! external library's job.  Whatever vocabulary that library speaks is
//! normalized at this boundary into the four [`TransportEvent`] kinds the
//! session manager understands.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Opaque session credentials.
///
/// The blob lets the transport resume an authorized session without
/// re-pairing.  It is never inspected here — only persisted whole and
/// handed back on the next connect.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials(Vec<u8>);

impl SessionCredentials {
    pub fn new(blob: Vec<u8>) -> Self {
        Self(blob)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SessionCredentials {
    fn from(blob: Vec<u8>) -> Self {
        Self(blob)
    }
}

// Credential material must never end up in logs.
impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionCredentials(<{} bytes>)", self.0.len())
    }
}

/// Why a connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The session was revoked (by the user or the server).  Terminal:
    /// reconnecting would loop forever against a dead session.
    LoggedOut,
    /// Network blip, server restart, etc.  Recoverable.
    Transient,
}

impl DisconnectReason {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Lifecycle events emitted by a connected transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A pairing code is available for the user to scan.  Only emitted
    /// while the session has no valid credentials.
    PairingCode(String),
    /// The connection is fully established; `send` is now valid.
    Opened,
    /// The transport rotated the session credentials.  The new blob
    /// replaces the stored one entirely.
    CredentialsRotated(SessionCredentials),
    /// The connection closed.  No further events follow.
    Closed(DisconnectReason),
}

/// Failures surfaced by the transport.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("connect: {0}")]
    Connect(String),
    #[error("send: {0}")]
    Send(String),
    #[error("connection closed")]
    Closed,
}

/// An established connection: the send/close handle plus its event stream.
pub struct TransportSession {
    pub handle: Arc<dyn Transport>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Operations valid on a connection once it exists.
///
/// `send` returns the transport-assigned message identifier.  Calling it
/// before [`TransportEvent::Opened`] has fired is a contract violation the
/// session manager is responsible for preventing.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<String, TransportError>;

    /// Best-effort close.  Must be safe to call more than once.
    async fn close(&self);
}

/// Factory for connections.  `credentials` is `None` for a fresh, unpaired
/// session, in which case the transport is expected to emit a pairing code.
#[async_trait::async_trait]
pub trait TransportConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: Option<SessionCredentials>,
    ) -> Result<TransportSession, TransportError>;
}
