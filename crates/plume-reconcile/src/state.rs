use std::collections::HashSet;

use plume_store::{StoreEntry, TombstoneSet, UpsertOutcome, VersionStore};
use plume_types::{EventId, PublicKey};

/// Tombstone check performed before a version's payload is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Not seen yet; resolve and commit.
    Fresh,
    /// Deleted by its author; must never be materialized, not even
    /// transiently.
    Tombstoned,
    /// Already held.
    Duplicate,
}

/// Result of [`ReconcileState::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Inserted,
    Duplicate,
    /// Tombstoned while the payload was being resolved; discarded.
    Tombstoned,
}

/// The synchronous half of reconciliation: a version store and the
/// tombstones that guard it.
///
/// Every method is a single, non-suspending step, so callers that hold this
/// behind a lock see each one atomically. Given the same set of events, the
/// final state does not depend on the order the steps were applied in, apart
/// from which of two versions with equal `created_at` ends up first.
///
/// A version belongs to the key in its `logical_id.author`, and only that
/// key's deletions exclude it.
#[derive(Clone, Debug)]
pub struct ReconcileState<D> {
    store: VersionStore<D>,
    tombstones: TombstoneSet,
}

impl<D> Default for ReconcileState<D> {
    fn default() -> Self {
        Self {
            store: VersionStore::new(),
            tombstones: TombstoneSet::new(),
        }
    }
}

impl<D> ReconcileState<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a version `id` signed by `author`.
    pub fn admit(&self, id: &EventId, author: &PublicKey) -> Admission {
        if self.tombstones.deleted_by(id, author) {
            Admission::Tombstoned
        } else if self.store.contains(id) {
            Admission::Duplicate
        } else {
            Admission::Fresh
        }
    }

    /// Tombstone `ids` on behalf of `deleter` and purge the held versions
    /// `deleter` owns. Returns the ids that were removed from the store.
    pub fn apply_deletion<I>(&mut self, deleter: PublicKey, ids: I) -> Vec<EventId>
    where
        I: IntoIterator<Item = EventId>,
    {
        let ids: HashSet<EventId> = ids.into_iter().collect();
        self.tombstones.add(deleter, ids.iter().copied());
        let owned: HashSet<EventId> = ids
            .into_iter()
            .filter(|id| {
                self.store
                    .get(id)
                    .is_some_and(|entry| entry.record.logical_id.author == deleter)
            })
            .collect();
        self.store.remove_by_ids(&owned)
    }

    /// Insert a resolved version, re-checking tombstones first.
    pub fn commit(&mut self, entry: StoreEntry<D>) -> CommitOutcome {
        if self
            .tombstones
            .deleted_by(&entry.record.id, &entry.record.logical_id.author)
        {
            return CommitOutcome::Tombstoned;
        }
        match self.store.upsert(entry) {
            UpsertOutcome::Inserted => CommitOutcome::Inserted,
            UpsertOutcome::Duplicate => CommitOutcome::Duplicate,
        }
    }

    pub fn store(&self) -> &VersionStore<D> {
        &self.store
    }

    pub fn tombstones(&self) -> &TombstoneSet {
        &self.tombstones
    }
}
