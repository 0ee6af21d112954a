//! In-process development transport.
//!
//! The default `transport = "dev"` backend: no network, no real messaging
//! account, but the full lifecycle — pairing when unpaired, an opened
//! connection, a credential rotation, and logged sends with sequential
//! message ids.  Useful for wiring up the HTTP surface and exercising the
//! pairing flow locally; a real WhatsApp bridge implements the same two
//! traits and registers under its own name.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::transport::{
    SessionCredentials, Transport, TransportConnector, TransportError, TransportEvent,
    TransportSession,
};

/// How long the dev transport pretends the user takes to scan the code.
const PAIRING_DELAY: Duration = Duration::from_millis(200);

pub struct DevConnector;

#[async_trait::async_trait]
impl TransportConnector for DevConnector {
    async fn connect(
        &self,
        credentials: Option<SessionCredentials>,
    ) -> Result<TransportSession, TransportError> {
        let (tx, events) = mpsc::channel(16);
        let shutdown = CancellationToken::new();

        let handle = Arc::new(DevTransport {
            next_id: AtomicU64::new(1),
            shutdown: shutdown.clone(),
        });

        tokio::spawn(async move {
            if credentials.is_none() {
                let code = pairing_code();
                tracing::info!(code = %code, "dev transport issuing pairing code");
                if tx.send(TransportEvent::PairingCode(code)).await.is_err() {
                    return;
                }
                tokio::time::sleep(PAIRING_DELAY).await;
            }

            if tx.send(TransportEvent::Opened).await.is_err() {
                return;
            }

            if credentials.is_none() {
                let blob = SessionCredentials::new(b"zapdesk-dev-session".to_vec());
                let _ = tx.send(TransportEvent::CredentialsRotated(blob)).await;
            }

            // Keep the event channel open until the handle is closed;
            // dropping `tx` is what ends the stream for the supervisor.
            shutdown.cancelled().await;
        });

        Ok(TransportSession { handle, events })
    }
}

pub struct DevTransport {
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

#[async_trait::async_trait]
impl Transport for DevTransport {
    async fn send(&self, recipient: &str, text: &str) -> Result<String, TransportError> {
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let id = format!("dev-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::info!(
            recipient = %recipient,
            chars = text.chars().count(),
            message_id = %id,
            "dev transport send"
        );
        Ok(id)
    }

    async fn close(&self) {
        self.shutdown.cancel();
    }
}

/// Short human-typable code, distinct per connect.
fn pairing_code() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("DEV-{:06}", nanos % 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unpaired_connect_emits_pairing_then_opened() {
        let mut session = DevConnector.connect(None).await.unwrap();
        assert!(matches!(
            session.events.recv().await,
            Some(TransportEvent::PairingCode(_))
        ));
        assert!(matches!(
            session.events.recv().await,
            Some(TransportEvent::Opened)
        ));
        assert!(matches!(
            session.events.recv().await,
            Some(TransportEvent::CredentialsRotated(_))
        ));
        session.handle.close().await;
    }

    #[tokio::test]
    async fn paired_connect_skips_pairing() {
        let creds = SessionCredentials::new(b"zapdesk-dev-session".to_vec());
        let mut session = DevConnector.connect(Some(creds)).await.unwrap();
        assert!(matches!(
            session.events.recv().await,
            Some(TransportEvent::Opened)
        ));
        session.handle.close().await;
    }

    #[tokio::test]
    async fn sends_get_sequential_ids_until_closed() {
        let creds = SessionCredentials::new(b"c".to_vec());
        let session = DevConnector.connect(Some(creds)).await.unwrap();
        assert_eq!(session.handle.send("5588996710011", "a").await.unwrap(), "dev-1");
        assert_eq!(session.handle.send("5588996710011", "b").await.unwrap(), "dev-2");
        session.handle.close().await;
        assert!(session.handle.send("5588996710011", "c").await.is_err());
    }
}
