//! The session state machine.
//!
//! [`SessionManager`] owns the one live transport connection this process
//! is allowed to have.  All mutable session state sits behind a single
//! lock, every transition happens under one write-lock acquisition, and a
//! supervisor task is the only writer of the transport handle — so a
//! `send` racing a disconnect always observes a consistent state.
//!
//! Recovery policy: a transient close reconnects automatically with the
//! currently persisted credentials; a logged-out close is a deliberate
//! revocation and is never retried.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use zd_domain::config::WhatsAppConfig;

use crate::credentials::{CredentialStore, PersistenceError};
use crate::reconnect::ReconnectBackoff;
use crate::recipient;
use crate::transport::{
    Transport, TransportConnector, TransportError, TransportEvent, TransportSession,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the session currently stands.  Exactly one value holds at any
/// instant, process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingPairing,
    Open,
}

/// Snapshot returned by [`SessionManager::status`].
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Present iff the session is waiting to be paired.
    pub pairing_code: Option<String>,
}

/// Failures returned from [`SessionManager::send`].
#[derive(thiserror::Error, Debug)]
pub enum SendError {
    /// The session is not open.  The transport is never touched.
    #[error("not connected")]
    NotConnected,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures returned from [`SessionManager::connect`] / [`SessionManager::logout`].
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// A session is already connecting, pairing, or open.
    #[error("a connect is already in progress")]
    ConcurrentConnectRejected,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Manager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The mutable session state.  Only mutated under the write lock, and —
/// apart from `connect`/`logout` bookkeeping — only by the supervisor
/// task that owns the current generation.
struct Shared {
    state: ConnectionState,
    pairing_code: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    /// Bumped on every `connect` and `logout`.  A supervisor whose
    /// generation no longer matches is stale and must not transition.
    generation: u64,
}

impl Shared {
    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.pairing_code = None;
        self.transport = None;
    }
}

struct SupervisorHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Process-wide manager for the single WhatsApp session.
///
/// Create once, share as `Arc<SessionManager>`.  `status` and `send` are
/// safe from any number of concurrent callers; `connect` and `logout` are
/// the only state-changing entry points.
pub struct SessionManager {
    shared: Arc<RwLock<Shared>>,
    credentials: Arc<CredentialStore>,
    connector: Arc<dyn TransportConnector>,
    backoff: ReconnectBackoff,
    country_prefix: String,
    supervisor: Mutex<Option<SupervisorHandle>>,
}

impl SessionManager {
    pub fn new(
        config: &WhatsAppConfig,
        credentials: Arc<CredentialStore>,
        connector: Arc<dyn TransportConnector>,
    ) -> Self {
        Self {
            shared: Arc::new(RwLock::new(Shared {
                state: ConnectionState::Disconnected,
                pairing_code: None,
                transport: None,
                generation: 0,
            })),
            credentials,
            connector,
            backoff: ReconnectBackoff::from(&config.reconnect),
            country_prefix: config.country_prefix.clone(),
            supervisor: Mutex::new(None),
        }
    }

    /// Start the session.  Spawns the supervisor task and returns without
    /// waiting for the connection to open; observe progress via
    /// [`status`](Self::status).
    ///
    /// Rejected while a session is already connecting, pairing, or open —
    /// two live transports must never exist.
    pub fn connect(&self) -> Result<(), SessionError> {
        let generation = {
            let mut shared = self.shared.write();
            if shared.state != ConnectionState::Disconnected {
                return Err(SessionError::ConcurrentConnectRejected);
            }
            shared.state = ConnectionState::Connecting;
            shared.pairing_code = None;
            shared.generation += 1;
            shared.generation
        };

        let cancel = CancellationToken::new();
        let supervisor = Supervisor {
            shared: self.shared.clone(),
            credentials: self.credentials.clone(),
            connector: self.connector.clone(),
            backoff: self.backoff.clone(),
            generation,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(supervisor.run());

        *self.supervisor.lock() = Some(SupervisorHandle { cancel, task });
        Ok(())
    }

    /// Pure read of the observable status.  Never blocks, never suspends.
    pub fn status(&self) -> ConnectionStatus {
        let shared = self.shared.read();
        ConnectionStatus {
            connected: shared.state == ConnectionState::Open,
            pairing_code: shared.pairing_code.clone(),
        }
    }

    /// The raw connection state (for diagnostics; `status` is the API read).
    pub fn state(&self) -> ConnectionState {
        self.shared.read().state
    }

    /// Send a text message.  Fails fast with [`SendError::NotConnected`]
    /// outside `Open` — no blocking, no queuing.  The recipient accepts
    /// arbitrary formatting and is normalized before it reaches the
    /// transport.
    pub async fn send(&self, recipient: &str, text: &str) -> Result<String, SendError> {
        let transport = {
            let shared = self.shared.read();
            if shared.state != ConnectionState::Open {
                return Err(SendError::NotConnected);
            }
            shared.transport.clone().ok_or(SendError::NotConnected)?
        };

        let to = recipient::normalize(recipient, &self.country_prefix);
        let message_id = transport.send(&to, text).await?;
        tracing::debug!(message_id = %message_id, "message sent");
        Ok(message_id)
    }

    /// Terminal teardown: cancel the supervisor (even mid-connect), close
    /// the transport best-effort, erase persisted credentials, and return
    /// to the initial state.  A subsequent `connect` starts a fresh,
    /// unpaired session.
    pub async fn logout(&self) -> Result<(), SessionError> {
        // Stop the supervisor first so it cannot race the teardown below.
        let supervisor = self.supervisor.lock().take();
        if let Some(sup) = supervisor {
            sup.cancel.cancel();
            let _ = sup.task.await;
        }

        let transport = {
            let mut shared = self.shared.write();
            // Invalidate any loop that somehow outlived the cancel.
            shared.generation += 1;
            let transport = shared.transport.take();
            shared.reset();
            transport
        };

        if let Some(transport) = transport {
            transport.close().await;
        }

        self.credentials.clear()?;
        tracing::info!("logged out, session credentials cleared");
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Supervisor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How a single connection's event stream ended.
enum Outcome {
    Cancelled,
    LoggedOut,
    Transient { opened: bool },
}

/// The one task allowed to drive connect/reconnect for its generation.
/// Close events are consumed here and nowhere else, so two reconnect
/// attempts can never overlap.
struct Supervisor {
    shared: Arc<RwLock<Shared>>,
    credentials: Arc<CredentialStore>,
    connector: Arc<dyn TransportConnector>,
    backoff: ReconnectBackoff,
    generation: u64,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(self) {
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            let credentials = match self.credentials.load() {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "credential load failed, connecting unpaired");
                    None
                }
            };
            let paired = credentials.is_some();

            if !self.transition(|s| {
                s.state = ConnectionState::Connecting;
                s.pairing_code = None;
                s.transport = None;
            }) {
                return;
            }

            tracing::info!(paired, attempt, "opening transport");

            let connected = tokio::select! {
                r = self.connector.connect(credentials) => r,
                _ = self.cancel.cancelled() => return,
            };

            let session = match connected {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "transport connect failed");
                    if !self.pause_before_retry(&mut attempt).await {
                        return;
                    }
                    continue;
                }
            };

            match self.drive(session, &mut attempt).await {
                Outcome::Cancelled => return,
                Outcome::LoggedOut => {
                    tracing::info!("session revoked, not reconnecting");
                    self.transition(Shared::reset);
                    return;
                }
                Outcome::Transient { opened } => {
                    self.transition(Shared::reset);
                    if opened {
                        // The session had opened: reconnect right away with
                        // whatever credentials are persisted now.
                        tracing::info!("transient disconnect, reconnecting");
                    } else {
                        // Closed before opening: count it as a failed attempt
                        // so a flapping transport backs off instead of spinning.
                        tracing::warn!("transport closed before opening");
                        if !self.pause_before_retry(&mut attempt).await {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Fold one connection's event stream into state transitions.
    async fn drive(&self, mut session: TransportSession, attempt: &mut u32) -> Outcome {
        let mut opened = false;

        loop {
            let event = tokio::select! {
                e = session.events.recv() => e,
                _ = self.cancel.cancelled() => {
                    session.handle.close().await;
                    return Outcome::Cancelled;
                }
            };

            match event {
                Some(TransportEvent::PairingCode(code)) => {
                    tracing::info!("pairing code available");
                    if !self.transition(|s| {
                        s.state = ConnectionState::AwaitingPairing;
                        s.pairing_code = Some(code);
                    }) {
                        return Outcome::Cancelled;
                    }
                }
                Some(TransportEvent::Opened) => {
                    opened = true;
                    *attempt = 0;
                    let handle = session.handle.clone();
                    if !self.transition(move |s| {
                        s.state = ConnectionState::Open;
                        s.pairing_code = None;
                        s.transport = Some(handle);
                    }) {
                        return Outcome::Cancelled;
                    }
                    tracing::info!("session open");
                }
                Some(TransportEvent::CredentialsRotated(blob)) => {
                    // Availability over durability: a failed save leaves the
                    // session up, at the risk of re-pairing after a restart.
                    if let Err(e) = self.credentials.save(&blob) {
                        tracing::error!(error = %e, "failed to persist rotated credentials");
                    } else {
                        tracing::debug!("rotated credentials persisted");
                    }
                }
                Some(TransportEvent::Closed(reason)) => {
                    tracing::info!(?reason, "transport closed");
                    return if reason.is_terminal() {
                        Outcome::LoggedOut
                    } else {
                        Outcome::Transient { opened }
                    };
                }
                // Stream ended without a close frame: indistinguishable
                // from a network drop.
                None => return Outcome::Transient { opened },
            }
        }
    }

    /// Back off before the next attempt.  Returns `false` when the policy
    /// is exhausted or the supervisor was cancelled.
    async fn pause_before_retry(&self, attempt: &mut u32) -> bool {
        if self.backoff.exhausted(*attempt) {
            tracing::error!(
                attempts = *attempt,
                "reconnect attempts exhausted, staying disconnected"
            );
            self.transition(Shared::reset);
            return false;
        }

        let delay = self.backoff.delay(*attempt);
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            attempt = *attempt + 1,
            "retrying connect"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => return false,
        }

        *attempt += 1;
        true
    }

    /// Apply a transition unless this supervisor has been superseded.
    fn transition(&self, f: impl FnOnce(&mut Shared)) -> bool {
        let mut shared = self.shared.write();
        if shared.generation != self.generation {
            return false;
        }
        f(&mut shared);
        true
    }
}
