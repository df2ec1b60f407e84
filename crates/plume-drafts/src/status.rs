use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use plume_types::{EventId, LogicalId, Timestamp};
use tokio::sync::watch;

/// Save state of one draft, as shown next to the editor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved { version: EventId, at: Timestamp },
    Failed { reason: String },
}

/// Per-draft save status, observable through `watch` channels.
#[derive(Clone, Default)]
pub struct SaveStatusBoard {
    channels: Arc<Mutex<HashMap<LogicalId, watch::Sender<SaveStatus>>>>,
}

impl SaveStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, logical_id: &LogicalId, status: SaveStatus) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        match channels.get(logical_id) {
            Some(sender) => {
                sender.send_replace(status);
            }
            None => {
                let (sender, _) = watch::channel(status);
                channels.insert(logical_id.clone(), sender);
            }
        }
    }

    pub fn get(&self, logical_id: &LogicalId) -> SaveStatus {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(logical_id)
            .map(|sender| sender.borrow().clone())
            .unwrap_or_default()
    }

    /// Observe a draft's status. Drafts never saved start out `Idle`.
    pub fn subscribe(&self, logical_id: &LogicalId) -> watch::Receiver<SaveStatus> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(logical_id.clone())
            .or_insert_with(|| watch::channel(SaveStatus::Idle).0)
            .subscribe()
    }

    /// Reset a draft to `Idle`, e.g. after it was deleted.
    pub fn clear(&self, logical_id: &LogicalId) {
        self.set(logical_id, SaveStatus::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_types::PublicKey;

    fn draft() -> LogicalId {
        LogicalId::new(PublicKey::from_bytes([1; 32]), "d")
    }

    #[test]
    fn unknown_drafts_are_idle() {
        assert_eq!(SaveStatusBoard::new().get(&draft()), SaveStatus::Idle);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let board = SaveStatusBoard::new();
        let mut rx = board.subscribe(&draft());

        board.set(&draft(), SaveStatus::Saving);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SaveStatus::Saving);

        let saved = SaveStatus::Saved {
            version: EventId::from_hash([2; 32]),
            at: Timestamp::from_secs(5),
        };
        board.set(&draft(), saved.clone());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), saved);
        assert_eq!(board.get(&draft()), saved);
    }
}
