use std::collections::{HashMap, HashSet};

use plume_types::{EventId, LogicalId, PublicKey};
use tracing::debug;

use crate::record::{LogicalDocument, StoreEntry};

/// Result of [`VersionStore::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// A version with the same id is already held; nothing changed.
    Duplicate,
}

/// Per logical document, the resolved versions held so far.
///
/// Each list is sorted by `created_at`, newest first. The sort is stable and
/// new entries are appended before sorting, so on an exact timestamp tie the
/// version that arrived first stays ahead.
#[derive(Clone, Debug)]
pub struct VersionStore<D> {
    documents: HashMap<LogicalId, Vec<StoreEntry<D>>>,
    index: HashMap<EventId, LogicalId>,
}

impl<D> Default for VersionStore<D> {
    fn default() -> Self {
        Self {
            documents: HashMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<D> VersionStore<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` under its logical id unless a version with the same id
    /// is already held.
    pub fn upsert(&mut self, entry: StoreEntry<D>) -> UpsertOutcome {
        let id = entry.record.id;
        if self.index.contains_key(&id) {
            return UpsertOutcome::Duplicate;
        }

        let logical_id = entry.record.logical_id.clone();
        let versions = self.documents.entry(logical_id.clone()).or_default();
        versions.push(entry);
        versions.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
        self.index.insert(id, logical_id);
        UpsertOutcome::Inserted
    }

    /// Remove every held version whose id is in `ids`, across all logical
    /// documents. Returns the ids actually removed.
    pub fn remove_by_ids(&mut self, ids: &HashSet<EventId>) -> Vec<EventId> {
        let mut removed = Vec::new();
        for id in ids {
            let Some(logical_id) = self.index.remove(id) else {
                continue;
            };
            let now_empty = match self.documents.get_mut(&logical_id) {
                Some(versions) => {
                    versions.retain(|entry| entry.record.id != *id);
                    versions.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.documents.remove(&logical_id);
                debug!(logical_id = %logical_id, "last version removed; document dropped");
            }
            removed.push(*id);
        }
        removed
    }

    /// Most recent version of a logical document.
    pub fn latest(&self, logical_id: &LogicalId) -> Option<&StoreEntry<D>> {
        self.documents.get(logical_id).and_then(|v| v.first())
    }

    /// All held versions of a logical document, newest first.
    pub fn versions(&self, logical_id: &LogicalId) -> &[StoreEntry<D>] {
        self.documents
            .get(logical_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, id: &EventId) -> Option<&StoreEntry<D>> {
        let logical_id = self.index.get(id)?;
        self.versions(logical_id).iter().find(|e| e.record.id == *id)
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.index.contains_key(id)
    }

    /// Logical ids currently materialized, sorted.
    pub fn logical_ids(&self) -> Vec<LogicalId> {
        let mut ids: Vec<_> = self.documents.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of logical documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of versions across all documents.
    pub fn version_count(&self) -> usize {
        self.index.len()
    }
}

impl<D: Clone> VersionStore<D> {
    /// Materialize one logical document.
    pub fn document(&self, logical_id: &LogicalId) -> Option<LogicalDocument<D>> {
        let versions = self.documents.get(logical_id)?;
        let latest = versions.first()?.clone();
        Some(LogicalDocument {
            logical_id: logical_id.clone(),
            latest,
            versions: versions.len(),
        })
    }

    /// Materialize every logical document, most recently updated first.
    pub fn documents(&self) -> Vec<LogicalDocument<D>> {
        self.collect(|_| true)
    }

    /// Materialize the logical documents authored by `author`.
    pub fn documents_by(&self, author: &PublicKey) -> Vec<LogicalDocument<D>> {
        self.collect(|id| id.author == *author)
    }

    fn collect(&self, keep: impl Fn(&LogicalId) -> bool) -> Vec<LogicalDocument<D>> {
        let mut docs: Vec<_> = self
            .documents
            .keys()
            .filter(|id| keep(id))
            .filter_map(|id| self.document(id))
            .collect();
        docs.sort_by(|a, b| {
            b.updated_at()
                .cmp(&a.updated_at())
                .then_with(|| a.logical_id.cmp(&b.logical_id))
        });
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordKind, VersionRecord};
    use plume_types::Timestamp;

    fn author() -> PublicKey {
        PublicKey::from_bytes([1; 32])
    }

    fn doc(name: &str) -> LogicalId {
        LogicalId::new(author(), name)
    }

    fn entry(id: u8, logical: &str, at: u64, body: &str) -> StoreEntry<String> {
        StoreEntry::new(
            VersionRecord {
                id: EventId::from_hash([id; 32]),
                logical_id: doc(logical),
                created_at: Timestamp::from_secs(at),
                kind: RecordKind::FullSave,
                parent: None,
                counterparty: None,
            },
            body.to_string(),
        )
    }

    fn ids(raw: &[u8]) -> HashSet<EventId> {
        raw.iter().map(|b| EventId::from_hash([*b; 32])).collect()
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = VersionStore::new();
        assert_eq!(store.upsert(entry(1, "doc1", 100, "v1")), UpsertOutcome::Inserted);
        assert_eq!(store.upsert(entry(1, "doc1", 100, "v1")), UpsertOutcome::Duplicate);
        assert_eq!(store.versions(&doc("doc1")).len(), 1);
        assert_eq!(store.version_count(), 1);
    }

    #[test]
    fn latest_wins_regardless_of_insert_order() {
        let mut store = VersionStore::new();
        store.upsert(entry(2, "doc1", 200, "v2"));
        store.upsert(entry(1, "doc1", 100, "v1"));
        assert_eq!(store.latest(&doc("doc1")).unwrap().document, "v2");

        let versions: Vec<_> = store
            .versions(&doc("doc1"))
            .iter()
            .map(|e| e.document.as_str())
            .collect();
        assert_eq!(versions, vec!["v2", "v1"]);
    }

    #[test]
    fn tie_keeps_existing_entry_first() {
        let mut store = VersionStore::new();
        store.upsert(entry(1, "doc1", 100, "first"));
        store.upsert(entry(2, "doc1", 100, "second"));
        assert_eq!(store.latest(&doc("doc1")).unwrap().document, "first");
    }

    #[test]
    fn remove_falls_back_to_remaining_version() {
        let mut store = VersionStore::new();
        store.upsert(entry(1, "doc1", 100, "v1"));
        store.upsert(entry(2, "doc1", 200, "v2"));

        let removed = store.remove_by_ids(&ids(&[2]));
        assert_eq!(removed, vec![EventId::from_hash([2; 32])]);
        assert_eq!(store.latest(&doc("doc1")).unwrap().document, "v1");
        assert!(!store.contains(&EventId::from_hash([2; 32])));
    }

    #[test]
    fn removing_last_version_drops_document() {
        let mut store = VersionStore::new();
        store.upsert(entry(1, "doc1", 100, "v1"));
        store.upsert(entry(3, "doc2", 50, "other"));

        store.remove_by_ids(&ids(&[1, 9]));
        assert!(store.latest(&doc("doc1")).is_none());
        assert_eq!(store.logical_ids(), vec![doc("doc2")]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_unknown_ids_is_noop() {
        let mut store = VersionStore::new();
        store.upsert(entry(1, "doc1", 100, "v1"));
        assert!(store.remove_by_ids(&ids(&[7, 8])).is_empty());
        assert_eq!(store.version_count(), 1);
    }

    #[test]
    fn documents_sorted_by_recency_and_filtered_by_author() {
        let mut store = VersionStore::new();
        store.upsert(entry(1, "old", 100, "a"));
        store.upsert(entry(2, "new", 300, "b"));
        store.upsert(StoreEntry::new(
            VersionRecord {
                id: EventId::from_hash([3; 32]),
                logical_id: LogicalId::new(PublicKey::from_bytes([2; 32]), "theirs"),
                created_at: Timestamp::from_secs(500),
                kind: RecordKind::FullSave,
                parent: None,
                counterparty: None,
            },
            "c".to_string(),
        ));

        let all: Vec<_> = store.documents().iter().map(|d| d.document().clone()).collect();
        assert_eq!(all, vec!["c", "b", "a"]);

        let mine: Vec<_> = store
            .documents_by(&author())
            .iter()
            .map(|d| d.logical_id.identifier.clone())
            .collect();
        assert_eq!(mine, vec!["new", "old"]);
    }

    #[test]
    fn get_finds_version_by_id() {
        let mut store = VersionStore::new();
        store.upsert(entry(1, "doc1", 100, "v1"));
        store.upsert(entry(2, "doc1", 200, "v2"));
        assert_eq!(store.get(&EventId::from_hash([1; 32])).unwrap().document, "v1");
        assert!(store.get(&EventId::from_hash([5; 32])).is_none());
        assert_eq!(store.document(&doc("doc1")).unwrap().versions, 2);
    }
}
