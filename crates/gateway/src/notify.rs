//! Delivery log — outgoing-message status records.
//!
//! Every send attempt through the API leaves one record: the transport's
//! message id on success, the error text on failure.  A failed send is a
//! terminal outcome for that notification; nothing here retries.  Records
//! are appended to JSONL and kept in a bounded in-memory ring.

use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

const MAX_RECORDS: usize = 1000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    /// Normalized recipient the transport was (or would have been) given.
    pub recipient: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent { message_id: String },
    Failed { error: String },
}

pub struct DeliveryLog {
    records: RwLock<VecDeque<Delivery>>,
    persist_path: PathBuf,
}

impl DeliveryLog {
    /// Load (or start) the log at `state_path/deliveries.jsonl`.
    pub fn new(state_path: &std::path::Path) -> Self {
        let persist_path = state_path.join("deliveries.jsonl");

        let mut records = VecDeque::new();
        if let Ok(raw) = std::fs::read_to_string(&persist_path) {
            for line in raw.lines() {
                match serde_json::from_str::<Delivery>(line) {
                    Ok(d) => records.push_back(d),
                    Err(e) => tracing::warn!(error = %e, "skipping malformed delivery record"),
                }
            }
            while records.len() > MAX_RECORDS {
                records.pop_front();
            }
        }

        tracing::info!(
            records = records.len(),
            path = %persist_path.display(),
            "delivery log loaded"
        );

        Self {
            records: RwLock::new(records),
            persist_path,
        }
    }

    pub async fn record_sent(&self, recipient: &str, message_id: &str) -> Delivery {
        self.push(Delivery {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            created_at: Utc::now(),
            outcome: DeliveryOutcome::Sent {
                message_id: message_id.to_string(),
            },
        })
        .await
    }

    pub async fn record_failed(&self, recipient: &str, error: &str) -> Delivery {
        self.push(Delivery {
            id: Uuid::new_v4(),
            recipient: recipient.to_string(),
            created_at: Utc::now(),
            outcome: DeliveryOutcome::Failed {
                error: error.to_string(),
            },
        })
        .await
    }

    /// Newest-first page of records, plus the total count.
    pub async fn list(&self, limit: usize, offset: usize) -> (Vec<Delivery>, usize) {
        let records = self.records.read().await;
        let total = records.len();
        let page = records
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }

    async fn push(&self, delivery: Delivery) -> Delivery {
        {
            let mut records = self.records.write().await;
            records.push_back(delivery.clone());
            while records.len() > MAX_RECORDS {
                records.pop_front();
            }
        }

        // Append-only persistence; a failed write loses history, not the send.
        if let Err(e) = self.append(&delivery) {
            tracing::warn!(error = %e, "failed to persist delivery record");
        }
        delivery
    }

    fn append(&self, delivery: &Delivery) -> std::io::Result<()> {
        let line = serde_json::to_string(delivery)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.persist_path)?;
        writeln!(file, "{line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_both_outcomes_and_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = DeliveryLog::new(dir.path());

        log.record_sent("5588996710011", "m1").await;
        log.record_failed("5588990000000", "not connected").await;

        let (page, total) = log.list(10, 0).await;
        assert_eq!(total, 2);
        assert!(matches!(page[0].outcome, DeliveryOutcome::Failed { .. }));
        assert!(matches!(page[1].outcome, DeliveryOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn reloads_persisted_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = DeliveryLog::new(dir.path());
            log.record_sent("5588996710011", "m1").await;
        }
        let log = DeliveryLog::new(dir.path());
        let (page, total) = log.list(10, 0).await;
        assert_eq!(total, 1);
        assert_eq!(page[0].recipient, "5588996710011");
    }
}
