use async_trait::async_trait;
use plume_store::{RecordKind, VersionRecord};
use plume_types::{EventId, Kind, LogicalId, PublicKey, SignedEvent};

use crate::error::IngestError;

/// What can be learned about a version event from its tags alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub kind: RecordKind,
    /// `None` when the logical id is only known after resolving the payload.
    pub logical_id: Option<LogicalId>,
    pub parent: Option<EventId>,
    pub counterparty: Option<PublicKey>,
}

impl RecordHeader {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            logical_id: None,
            parent: None,
            counterparty: None,
        }
    }

    pub fn with_logical_id(mut self, logical_id: LogicalId) -> Self {
        self.logical_id = Some(logical_id);
        self
    }

    pub fn with_parent(mut self, parent: Option<EventId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_counterparty(mut self, counterparty: Option<PublicKey>) -> Self {
        self.counterparty = counterparty;
        self
    }

    /// Build the stored record for `event` under `logical_id`.
    pub fn record(&self, event: &SignedEvent, logical_id: LogicalId) -> VersionRecord {
        VersionRecord {
            id: event.id,
            logical_id,
            created_at: event.created_at,
            kind: self.kind,
            parent: self.parent,
            counterparty: self.counterparty,
        }
    }
}

/// A resolved payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved<D> {
    pub document: D,
    /// Logical id derived from the payload, for schemas whose tags do not
    /// carry one. Takes precedence over the header's.
    pub logical_id: Option<LogicalId>,
}

impl<D> Resolved<D> {
    pub fn new(document: D) -> Self {
        Self {
            document,
            logical_id: None,
        }
    }

    pub fn with_logical_id(mut self, logical_id: LogicalId) -> Self {
        self.logical_id = Some(logical_id);
        self
    }
}

/// Describes one family of version events (drafts, schedules, ...) to the
/// reducer.
///
/// `header` is synchronous and runs before the tombstone check. `resolve`
/// may await (decryption, parsing) and runs with no lock held.
#[async_trait]
pub trait RecordSchema: Send + Sync + 'static {
    type Document: Clone + Send + Sync + 'static;

    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Event kinds carrying versions of this schema's documents.
    fn version_kinds(&self) -> &[Kind];

    fn header(&self, event: &SignedEvent) -> Result<RecordHeader, IngestError>;

    async fn resolve(
        &self,
        event: &SignedEvent,
        header: &RecordHeader,
    ) -> Result<Resolved<Self::Document>, IngestError>;
}
