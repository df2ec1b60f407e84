use std::collections::BTreeSet;
use std::sync::Arc;

use plume_crypto::EventSigner;
use plume_reconcile::Reconciler;
use plume_relay::RelayClient;
use plume_store::{LogicalDocument, RecordKind, StoreEntry, VersionRecord};
use plume_types::{
    Clock, Coordinate, EventId, Kind, LogicalId, PublicKey, SignedEvent, Tag, Timestamp,
    UnsignedEvent,
};
use tracing::{info, warn};

use crate::error::{Result, SaveError};
use crate::schema::{DraftContent, DraftDocument, DraftSchema};
use crate::status::{SaveStatus, SaveStatusBoard};

/// Who can read a saved draft.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SaveMode {
    /// Plaintext, readable by anyone holding the event.
    #[default]
    Private,
    /// Encrypted so only the author and `counterparty` can read it.
    Proposal { counterparty: PublicKey },
}

impl SaveMode {
    pub fn counterparty(&self) -> Option<&PublicKey> {
        match self {
            Self::Private => None,
            Self::Proposal { counterparty } => Some(counterparty),
        }
    }
}

/// Outcome of a successful save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveReceipt {
    pub logical_id: LogicalId,
    pub version: EventId,
    pub kind: RecordKind,
    pub created_at: Timestamp,
    /// Older versions deleted because this save superseded them.
    pub superseded: Vec<EventId>,
}

/// Fresh identifier for a new draft.
pub fn new_identifier() -> String {
    uuid::Uuid::now_v7().to_string()
}

enum Shape {
    Full,
    Checkpoint { parent: EventId },
}

/// Turns editor content into signed draft versions.
///
/// Every save is applied to the local store before it is published, and
/// publishing is fire-and-forget: a relay failure is logged and the local
/// state stands. Only signing and encryption failures reach the caller.
#[derive(Clone)]
pub struct DraftCoordinator {
    signer: Arc<dyn EventSigner>,
    relay: Arc<dyn RelayClient>,
    clock: Arc<dyn Clock>,
    drafts: Reconciler<DraftSchema>,
    status: SaveStatusBoard,
}

impl DraftCoordinator {
    pub fn new(
        signer: Arc<dyn EventSigner>,
        relay: Arc<dyn RelayClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let drafts = Reconciler::new(DraftSchema::new(Arc::clone(&signer)));
        Self {
            signer,
            relay,
            clock,
            drafts,
            status: SaveStatusBoard::new(),
        }
    }

    /// The draft reconciler fed by both local saves and relay events.
    pub fn drafts(&self) -> &Reconciler<DraftSchema> {
        &self.drafts
    }

    pub fn status(&self) -> &SaveStatusBoard {
        &self.status
    }

    pub fn author(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Full save of `content`.
    ///
    /// Afterwards every held version of the draft strictly older than this
    /// save is deleted. Versions with an equal or later `created_at`, such as
    /// a concurrent save from another client, are left alone.
    pub async fn manual_save(
        &self,
        content: &DraftContent,
        identifier: &str,
        mode: &SaveMode,
    ) -> Result<SaveReceipt> {
        let logical_id = LogicalId::new(self.author(), identifier);
        self.status.set(&logical_id, SaveStatus::Saving);
        let result = self.save_full(content, &logical_id, mode).await;
        self.finish(&logical_id, result)
    }

    /// Checkpoint of `content` on top of the draft's latest version. Nothing
    /// is deleted. A draft with no version yet gets a full save instead.
    pub async fn autosave_checkpoint(
        &self,
        content: &DraftContent,
        identifier: &str,
        mode: &SaveMode,
    ) -> Result<SaveReceipt> {
        let logical_id = LogicalId::new(self.author(), identifier);
        self.status.set(&logical_id, SaveStatus::Saving);
        let result = match self.drafts.latest(&logical_id) {
            Some(parent) => {
                self.save_checkpoint(content, &logical_id, mode, parent.id())
                    .await
            }
            None => self.save_full(content, &logical_id, mode).await,
        };
        self.finish(&logical_id, result)
    }

    /// Delete every held version of one of this author's drafts. Returns the
    /// ids removed; a draft owned by another key is left alone.
    pub async fn delete_draft(&self, logical_id: &LogicalId) -> Result<Vec<EventId>> {
        if logical_id.author != self.author() {
            return Ok(Vec::new());
        }
        let ids: Vec<EventId> = self
            .drafts
            .versions(logical_id)
            .iter()
            .map(StoreEntry::id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let removed = self.emit_deletion(ids).await?;
        self.status.clear(logical_id);
        info!(logical_id = %logical_id, removed = removed.len(), "draft deleted");
        Ok(removed)
    }

    /// Held versions of a draft, newest first.
    pub fn history(&self, logical_id: &LogicalId) -> Vec<StoreEntry<DraftDocument>> {
        self.drafts.versions(logical_id)
    }

    /// This author's drafts, most recently updated first.
    pub fn my_drafts(&self) -> Vec<LogicalDocument<DraftDocument>> {
        self.drafts.documents_by(&self.author())
    }

    /// Save a held version's content again as the draft's newest version,
    /// readable by the same parties as before.
    pub async fn restore(&self, version: &EventId) -> Result<SaveReceipt> {
        let entry = self
            .drafts
            .get(version)
            .ok_or(SaveError::UnknownVersion(*version))?;
        let mode = match entry.record.counterparty {
            Some(counterparty) => SaveMode::Proposal { counterparty },
            None => SaveMode::Private,
        };
        let content = DraftContent::from(&entry.document);
        self.manual_save(&content, &entry.record.logical_id.identifier, &mode)
            .await
    }

    async fn save_full(
        &self,
        content: &DraftContent,
        logical_id: &LogicalId,
        mode: &SaveMode,
    ) -> Result<SaveReceipt> {
        let (event, document) = self.sign_version(content, logical_id, mode, Shape::Full).await?;
        self.commit_local(&event, logical_id, RecordKind::FullSave, None, mode, document)?;
        self.publish(event.clone());

        let superseded = self.supersede(logical_id, &event).await;
        info!(
            logical_id = %logical_id,
            version = %event.id,
            superseded = superseded.len(),
            "draft saved"
        );
        Ok(SaveReceipt {
            logical_id: logical_id.clone(),
            version: event.id,
            kind: RecordKind::FullSave,
            created_at: event.created_at,
            superseded,
        })
    }

    async fn save_checkpoint(
        &self,
        content: &DraftContent,
        logical_id: &LogicalId,
        mode: &SaveMode,
        parent: EventId,
    ) -> Result<SaveReceipt> {
        let (event, document) = self
            .sign_version(content, logical_id, mode, Shape::Checkpoint { parent })
            .await?;
        self.commit_local(
            &event,
            logical_id,
            RecordKind::Checkpoint,
            Some(parent),
            mode,
            document,
        )?;
        self.publish(event.clone());

        info!(logical_id = %logical_id, version = %event.id, parent = %parent, "checkpoint saved");
        Ok(SaveReceipt {
            logical_id: logical_id.clone(),
            version: event.id,
            kind: RecordKind::Checkpoint,
            created_at: event.created_at,
            superseded: Vec::new(),
        })
    }

    async fn sign_version(
        &self,
        content: &DraftContent,
        logical_id: &LogicalId,
        mode: &SaveMode,
        shape: Shape,
    ) -> Result<(SignedEvent, DraftDocument)> {
        let author = self.author();
        let now = self.clock.now();
        let document = content.to_document(author, now);
        let mut payload =
            serde_json::to_string(&document).map_err(|e| SaveError::Encode(e.to_string()))?;

        let (kind, mut tags) = match shape {
            Shape::Full => (
                Kind::DRAFT,
                vec![Tag::identifier(logical_id.identifier.clone())],
            ),
            Shape::Checkpoint { parent } => {
                let coordinate =
                    Coordinate::new(Kind::DRAFT, logical_id.author, logical_id.identifier.clone());
                (
                    Kind::DRAFT_CHECKPOINT,
                    vec![Tag::coordinate(&coordinate), Tag::event(&parent)],
                )
            }
        };
        tags.push(Tag::kind(content.kind));

        if let Some(counterparty) = mode.counterparty() {
            payload = self
                .signer
                .encrypt(counterparty, &payload)
                .await
                .map_err(SaveError::Encryption)?;
            tags.push(Tag::pubkey(counterparty));
        }

        let event = self
            .signer
            .sign(UnsignedEvent::new(author, now, kind, tags, payload))
            .await
            .map_err(SaveError::Signing)?;
        Ok((event, document))
    }

    fn commit_local(
        &self,
        event: &SignedEvent,
        logical_id: &LogicalId,
        kind: RecordKind,
        parent: Option<EventId>,
        mode: &SaveMode,
        document: DraftDocument,
    ) -> Result<()> {
        let record = VersionRecord {
            id: event.id,
            logical_id: logical_id.clone(),
            created_at: event.created_at,
            kind,
            parent,
            counterparty: mode.counterparty().copied(),
        };
        self.drafts.apply_local(StoreEntry::new(record, document))?;
        Ok(())
    }

    /// Delete the held versions of `logical_id` strictly older than `save`.
    ///
    /// Candidates are read immediately before the deletion is signed. Only
    /// versions held this session are considered.
    async fn supersede(&self, logical_id: &LogicalId, save: &SignedEvent) -> Vec<EventId> {
        let stale: Vec<EventId> = self
            .drafts
            .versions(logical_id)
            .iter()
            .filter(|entry| entry.id() != save.id && entry.created_at() < save.created_at)
            .map(StoreEntry::id)
            .collect();
        if stale.is_empty() {
            return Vec::new();
        }
        match self.emit_deletion(stale).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(logical_id = %logical_id, error = %err, "supersede deletion failed");
                Vec::new()
            }
        }
    }

    /// Sign and publish a deletion of `ids`. Counterparties of the deleted
    /// versions are tagged so the deletion reaches them too.
    async fn emit_deletion(&self, ids: Vec<EventId>) -> Result<Vec<EventId>> {
        let counterparties: BTreeSet<PublicKey> = ids
            .iter()
            .filter_map(|id| self.drafts.get(id))
            .filter_map(|entry| entry.record.counterparty)
            .filter(|key| *key != self.author())
            .collect();

        let mut tags: Vec<Tag> = ids.iter().map(Tag::event).collect();
        tags.push(Tag::kind(Kind::DRAFT));
        tags.push(Tag::kind(Kind::DRAFT_CHECKPOINT));
        tags.extend(counterparties.iter().map(Tag::pubkey));

        let event = self
            .signer
            .sign(UnsignedEvent::new(
                self.author(),
                self.clock.now(),
                Kind::DELETION,
                tags,
                "",
            ))
            .await
            .map_err(SaveError::Signing)?;
        let removed = self.drafts.apply_local_deletion(self.author(), ids)?;
        self.publish(event);
        Ok(removed)
    }

    fn publish(&self, event: SignedEvent) {
        let relay = Arc::clone(&self.relay);
        tokio::spawn(async move {
            if let Err(err) = relay.publish(&event).await {
                warn!(id = %event.id, error = %err, "publish failed; local state stands");
            }
        });
    }

    fn finish(&self, logical_id: &LogicalId, result: Result<SaveReceipt>) -> Result<SaveReceipt> {
        let status = match &result {
            Ok(receipt) => SaveStatus::Saved {
                version: receipt.version,
                at: receipt.created_at,
            },
            Err(err) => {
                warn!(logical_id = %logical_id, error = %err, "save failed");
                SaveStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };
        self.status.set(logical_id, status);
        result
    }
}
