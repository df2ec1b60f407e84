use std::fmt;

use plume_types::{EventId, LogicalId, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};

/// How a version record relates to its logical document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Complete, user-initiated save. May supersede earlier versions.
    FullSave,
    /// Incremental autosave referencing a parent version.
    Checkpoint,
    /// Time-delayed publication request.
    Schedule,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FullSave => "FullSave",
            Self::Checkpoint => "Checkpoint",
            Self::Schedule => "Schedule",
        };
        write!(f, "{s}")
    }
}

/// Metadata of one immutable version of a logical document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: EventId,
    pub logical_id: LogicalId,
    pub created_at: Timestamp,
    pub kind: RecordKind,
    /// Version this checkpoint was taken on top of.
    pub parent: Option<EventId>,
    /// Set when the payload is encrypted to a counterparty (proposal mode).
    pub counterparty: Option<PublicKey>,
}

/// A version record paired with its resolved document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreEntry<D> {
    pub record: VersionRecord,
    pub document: D,
}

impl<D> StoreEntry<D> {
    pub fn new(record: VersionRecord, document: D) -> Self {
        Self { record, document }
    }

    pub fn id(&self) -> EventId {
        self.record.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.record.created_at
    }
}

/// Materialized view of one logical document: its most recent version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalDocument<D> {
    pub logical_id: LogicalId,
    pub latest: StoreEntry<D>,
    /// Number of non-tombstoned versions held.
    pub versions: usize,
}

impl<D> LogicalDocument<D> {
    pub fn document(&self) -> &D {
        &self.latest.document
    }

    pub fn updated_at(&self) -> Timestamp {
        self.latest.record.created_at
    }
}
