//! Wire messages for the push channel.
//!
//! Both directions are tagged by a `type` field and matched exhaustively, so
//! an unknown inbound type is a decode error rather than a silent no-op.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progress::events::{Chunk, Phase, ProgressEvent};
use crate::scanner::WalletRecord;

/// Server → observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PushMessage {
    Upload {
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        addresses: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    WalletUpdate {
        /// Run that settled these records.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<Uuid>,
        progress: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wallets: Option<Vec<WalletRecord>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Pong,
}

impl PushMessage {
    /// Upload failure notice for observers already watching the ingest.
    pub fn upload_failed(progress: u8, error: impl Into<String>) -> Self {
        PushMessage::Upload {
            progress,
            total: None,
            completed: None,
            addresses: None,
            error: Some(error.into()),
        }
    }

    /// Stamp a wallet update with the run that produced it.
    pub fn for_run(self, id: Uuid) -> Self {
        match self {
            PushMessage::WalletUpdate {
                progress,
                total,
                completed,
                wallets,
                error,
                ..
            } => PushMessage::WalletUpdate {
                run_id: Some(id),
                progress,
                total,
                completed,
                wallets,
                error,
            },
            other => other,
        }
    }

    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            PushMessage::WalletUpdate { run_id, .. } => *run_id,
            _ => None,
        }
    }
}

impl From<&ProgressEvent> for PushMessage {
    fn from(event: &ProgressEvent) -> Self {
        let total = Some(event.total);
        let completed = Some(event.completed);
        match event.phase {
            Phase::Ingest => PushMessage::Upload {
                progress: event.progress,
                total,
                completed,
                addresses: match &event.chunk {
                    Some(Chunk::Addresses(addresses)) => Some(addresses.clone()),
                    _ => None,
                },
                error: None,
            },
            Phase::Resolve => PushMessage::WalletUpdate {
                run_id: None,
                progress: event.progress,
                total,
                completed,
                wallets: match &event.chunk {
                    Some(Chunk::Wallets(wallets)) => Some(wallets.clone()),
                    _ => None,
                },
                error: None,
            },
        }
    }
}

/// Observer → server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Ping,
    /// Cancel the active run.
    Cancel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upload_event_shape() {
        let event = ProgressEvent {
            phase: Phase::Ingest,
            progress: 50,
            total: 4,
            completed: 2,
            chunk: Some(Chunk::Addresses(vec!["0xabc".into()])),
        };
        let value = serde_json::to_value(PushMessage::from(&event)).unwrap();
        assert_eq!(
            value,
            json!({"type": "upload", "progress": 50, "total": 4, "completed": 2, "addresses": ["0xabc"]})
        );
    }

    #[test]
    fn test_wallet_update_shape() {
        let event = ProgressEvent {
            phase: Phase::Resolve,
            progress: 100,
            total: 1,
            completed: 1,
            chunk: Some(Chunk::Wallets(vec![WalletRecord::resolved("0xabc", "2.5000")])),
        };
        let value = serde_json::to_value(PushMessage::from(&event)).unwrap();
        assert_eq!(value["type"], "wallet-update");
        assert_eq!(value["wallets"][0], json!({"address": "0xabc", "balance": "2.5000", "checked": true}));
        assert!(value.get("error").is_none());
        assert!(value.get("run_id").is_none());
    }

    #[test]
    fn test_wallet_update_carries_run_id() {
        let event = ProgressEvent {
            phase: Phase::Resolve,
            progress: 40,
            total: 5,
            completed: 2,
            chunk: None,
        };
        let id = Uuid::new_v4();
        let message = PushMessage::from(&event).for_run(id);
        assert_eq!(message.run_id(), Some(id));

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["run_id"], json!(id.to_string()));
        let decoded: PushMessage = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.run_id(), Some(id));

        // Upload events are not tied to a run.
        assert_eq!(PushMessage::upload_failed(10, "boom").for_run(id).run_id(), None);
    }

    #[test]
    fn test_client_messages() {
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"cancel"}"#).unwrap(),
            ClientMessage::Cancel
        );
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"resume"}"#).is_err());
        assert_eq!(serde_json::to_string(&PushMessage::Pong).unwrap(), r#"{"type":"pong"}"#);
    }
}
