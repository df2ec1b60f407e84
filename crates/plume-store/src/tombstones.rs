use std::collections::{HashMap, HashSet};

use plume_types::{EventId, PublicKey};

/// Ids permanently excluded by deletion records, keyed by who deleted them.
///
/// There is no un-delete: once added, an id stays for the lifetime of the
/// set. A deletion only binds versions signed by the deleter, so the set
/// remembers every key that named each id.
#[derive(Clone, Debug, Default)]
pub struct TombstoneSet {
    ids: HashMap<EventId, HashSet<PublicKey>>,
}

impl TombstoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `deleter` tombstoned `ids`. Returns how many of the
    /// `(deleter, id)` pairs are new.
    pub fn add<I>(&mut self, deleter: PublicKey, ids: I) -> usize
    where
        I: IntoIterator<Item = EventId>,
    {
        ids.into_iter()
            .filter(|id| self.ids.entry(*id).or_default().insert(deleter))
            .count()
    }

    /// Whether any key has tombstoned `id`.
    pub fn has(&self, id: &EventId) -> bool {
        self.ids.contains_key(id)
    }

    /// Whether `author` tombstoned `id`. Only such a tombstone excludes a
    /// version signed by `author`.
    pub fn deleted_by(&self, id: &EventId, author: &PublicKey) -> bool {
        self.ids
            .get(id)
            .is_some_and(|deleters| deleters.contains(author))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> PublicKey {
        PublicKey::from_bytes([n; 32])
    }

    #[test]
    fn add_reports_new_pairs_only() {
        let mut set = TombstoneSet::new();
        let a = EventId::from_hash([1; 32]);
        let b = EventId::from_hash([2; 32]);

        assert_eq!(set.add(key(1), [a]), 1);
        assert_eq!(set.add(key(1), [a, b]), 1);
        assert_eq!(set.add(key(1), [a, b]), 0);
        assert!(set.has(&a));
        assert!(set.has(&b));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn tombstones_bind_only_the_deleter() {
        let mut set = TombstoneSet::new();
        let id = EventId::from_hash([3; 32]);

        set.add(key(9), [id]);
        assert!(set.has(&id));
        assert!(set.deleted_by(&id, &key(9)));
        assert!(!set.deleted_by(&id, &key(1)));

        assert_eq!(set.add(key(1), [id]), 1);
        assert!(set.deleted_by(&id, &key(1)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn empty_set_has_nothing() {
        let set = TombstoneSet::new();
        assert!(set.is_empty());
        assert!(!set.has(&EventId::from_hash([0; 32])));
    }
}
