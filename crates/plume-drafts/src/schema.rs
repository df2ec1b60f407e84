use std::sync::Arc;

use async_trait::async_trait;
use plume_crypto::EventSigner;
use plume_reconcile::{IngestError, RecordHeader, RecordSchema, Resolved};
use plume_store::RecordKind;
use plume_types::{
    Coordinate, Kind, LogicalId, PublicKey, SignedEvent, Tag, Timestamp, UnsignedEvent,
};
use serde::{Deserialize, Serialize};

/// Materialized draft: the inner event being drafted (an article, a thread
/// note), unsigned until it is published.
pub type DraftDocument = UnsignedEvent;

/// What the editor holds for one draft.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftContent {
    pub kind: Kind,
    pub content: String,
    pub tags: Vec<Tag>,
}

impl DraftContent {
    pub fn new(kind: Kind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            tags: Vec::new(),
        }
    }

    pub fn article(content: impl Into<String>) -> Self {
        Self::new(Kind::LONG_FORM, content)
    }

    pub fn note(content: impl Into<String>) -> Self {
        Self::new(Kind::TEXT_NOTE, content)
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// The inner document as authored by `author` at `at`.
    pub fn to_document(&self, author: PublicKey, at: Timestamp) -> DraftDocument {
        UnsignedEvent::new(author, at, self.kind, self.tags.clone(), self.content.clone())
    }
}

impl From<&DraftDocument> for DraftContent {
    fn from(doc: &DraftDocument) -> Self {
        Self {
            kind: doc.kind,
            content: doc.content.clone(),
            tags: doc.tags.clone(),
        }
    }
}

/// Reads full saves (kind 31234) and checkpoints (kind 1234).
///
/// A full save names its document with a `d` tag. A checkpoint points back
/// at it with an `a` coordinate and at its parent version with an `e` tag;
/// the coordinate must name a draft (kind 31234) of the checkpoint's signer.
/// A `p` tag marks a proposal whose payload is encrypted between the author
/// and that counterparty.
pub struct DraftSchema {
    signer: Arc<dyn EventSigner>,
}

impl DraftSchema {
    pub fn new(signer: Arc<dyn EventSigner>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl RecordSchema for DraftSchema {
    type Document = DraftDocument;

    fn name(&self) -> &'static str {
        "drafts"
    }

    fn version_kinds(&self) -> &[Kind] {
        &[Kind::DRAFT, Kind::DRAFT_CHECKPOINT]
    }

    fn header(&self, event: &SignedEvent) -> Result<RecordHeader, IngestError> {
        let header = if event.kind == Kind::DRAFT_CHECKPOINT {
            let coordinate: Coordinate = event
                .tag_value("a")
                .and_then(|a| a.parse().ok())
                .ok_or(IngestError::MissingLogicalId(event.id))?;
            if coordinate.kind != Kind::DRAFT || coordinate.author != event.pubkey {
                return Err(IngestError::InvalidEvent {
                    id: event.id,
                    reason: format!("checkpoint points at {coordinate}, not a draft of its signer"),
                });
            }
            let parent = event.referenced_events().into_iter().next();
            RecordHeader::new(RecordKind::Checkpoint)
                .with_logical_id(LogicalId::new(coordinate.author, coordinate.identifier))
                .with_parent(parent)
        } else {
            let identifier = event
                .tag_value("d")
                .ok_or(IngestError::MissingLogicalId(event.id))?;
            RecordHeader::new(RecordKind::FullSave)
                .with_logical_id(LogicalId::new(event.pubkey, identifier))
        };
        Ok(header.with_counterparty(event.recipient()))
    }

    async fn resolve(
        &self,
        event: &SignedEvent,
        header: &RecordHeader,
    ) -> Result<Resolved<DraftDocument>, IngestError> {
        let plaintext = if header.counterparty.is_some() {
            let me = self.signer.public_key();
            let peer = event
                .peer_of(&me)
                .ok_or_else(|| IngestError::decryption(event.id, "no counterparty"))?;
            self.signer
                .decrypt(&peer, &event.content)
                .await
                .map_err(|e| IngestError::decryption(event.id, e))?
        } else {
            event.content.clone()
        };

        let document: DraftDocument =
            serde_json::from_str(&plaintext).map_err(|e| IngestError::malformed(event.id, e))?;
        Ok(Resolved::new(document))
    }
}
