use std::sync::{Arc, PoisonError, RwLock};

use plume_relay::Subscription;
use plume_store::{LogicalDocument, StoreEntry};
use plume_types::{EventId, Kind, LogicalId, PublicKey, SignedEvent};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::schema::RecordSchema;
use crate::state::{Admission, CommitOutcome, ReconcileState};

/// What happened to one ingested event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new version was materialized.
    Inserted(LogicalId),
    /// The version was already held.
    Duplicate,
    /// A deletion was applied; lists the held versions it removed.
    Deleted { removed: Vec<EventId> },
    /// The version is tombstoned and was never materialized.
    Discarded,
    /// The event could not be reconciled and was dropped.
    Dropped(IngestError),
    /// Not a kind this reconciler handles.
    Ignored,
}

/// Order-independent reducer from a stream of signed events to materialized
/// logical documents.
///
/// Deletions are applied synchronously. A version is checked against the
/// tombstones, resolved without holding the lock, then checked again right
/// before it is committed, so a deletion that lands mid-resolution wins.
///
/// Cloning is cheap and every clone shares state. There is no global
/// instance; construct one per schema and pass it where needed.
pub struct Reconciler<S: RecordSchema> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: RecordSchema> {
    schema: S,
    state: RwLock<ReconcileState<S::Document>>,
    revision: watch::Sender<u64>,
}

impl<S: RecordSchema> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RecordSchema> Reconciler<S> {
    pub fn new(schema: S) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                schema,
                state: RwLock::new(ReconcileState::new()),
                revision,
            }),
        }
    }

    pub fn schema(&self) -> &S {
        &self.inner.schema
    }

    /// Reconcile one event received from a relay.
    ///
    /// Failures are confined to this event: they are logged and reported as
    /// [`IngestOutcome::Dropped`].
    pub async fn ingest(&self, event: SignedEvent) -> IngestOutcome {
        let schema = self.inner.schema.name();
        match self.reconcile(&event).await {
            Ok(outcome) => {
                debug!(schema, id = %event.id, kind = %event.kind, ?outcome, "event reconciled");
                outcome
            }
            Err(err) => {
                warn!(schema, id = %event.id, kind = %event.kind, error = %err, "event dropped");
                IngestOutcome::Dropped(err)
            }
        }
    }

    /// Reconcile `event` on its own task.
    pub fn spawn(&self, event: SignedEvent) -> JoinHandle<IngestOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.ingest(event).await })
    }

    /// Drain a relay subscription until it closes, reconciling each event on
    /// its own task so a slow resolution never holds up the rest.
    ///
    /// Returns the number of events processed.
    pub async fn run(&self, mut subscription: Subscription) -> usize {
        let schema = self.inner.schema.name();
        let mut tasks = JoinSet::new();
        let mut processed = 0usize;
        info!(schema, "reconciler started");

        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => {
                        let this = self.clone();
                        tasks.spawn(async move { this.ingest(event).await });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    processed += 1;
                    if let Err(err) = joined {
                        warn!(schema, error = %err, "ingestion task failed");
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            processed += 1;
            if let Err(err) = joined {
                warn!(schema, error = %err, "ingestion task failed");
            }
        }
        info!(schema, processed, "subscription closed");
        processed
    }

    /// Optimistically insert a locally authored version whose document is
    /// already known.
    pub fn apply_local(&self, entry: StoreEntry<S::Document>) -> Result<CommitOutcome, IngestError> {
        let outcome = self.write()?.commit(entry);
        if outcome == CommitOutcome::Inserted {
            self.bump();
        }
        Ok(outcome)
    }

    /// Optimistically tombstone versions deleted by `deleter`. Only versions
    /// `deleter` signed are removed.
    pub fn apply_local_deletion<I>(
        &self,
        deleter: PublicKey,
        ids: I,
    ) -> Result<Vec<EventId>, IngestError>
    where
        I: IntoIterator<Item = EventId>,
    {
        let removed = self.write()?.apply_deletion(deleter, ids);
        if !removed.is_empty() {
            self.bump();
        }
        Ok(removed)
    }

    async fn reconcile(&self, event: &SignedEvent) -> Result<IngestOutcome, IngestError> {
        plume_crypto::verify_event(event).map_err(|e| IngestError::InvalidEvent {
            id: event.id,
            reason: e.to_string(),
        })?;

        if event.kind == Kind::DELETION {
            let removed = self.apply_local_deletion(event.pubkey, event.referenced_events())?;
            if !removed.is_empty() {
                info!(
                    schema = self.inner.schema.name(),
                    id = %event.id,
                    removed = removed.len(),
                    "deletion purged held versions"
                );
            }
            return Ok(IngestOutcome::Deleted { removed });
        }

        if !self.inner.schema.version_kinds().contains(&event.kind) {
            return Ok(IngestOutcome::Ignored);
        }

        let header = self.inner.schema.header(event)?;
        match self.read(|state| state.admit(&event.id, &event.pubkey)) {
            Admission::Fresh => {}
            Admission::Tombstoned => return Ok(IngestOutcome::Discarded),
            Admission::Duplicate => return Ok(IngestOutcome::Duplicate),
        }

        // No lock is held across this await.
        let resolved = self.inner.schema.resolve(event, &header).await?;
        let logical_id = resolved
            .logical_id
            .or_else(|| header.logical_id.clone())
            .ok_or(IngestError::MissingLogicalId(event.id))?;
        if logical_id.author != event.pubkey {
            return Err(IngestError::InvalidEvent {
                id: event.id,
                reason: format!("version of {logical_id} signed by another key"),
            });
        }

        let entry = StoreEntry::new(header.record(event, logical_id.clone()), resolved.document);
        Ok(match self.apply_local(entry)? {
            CommitOutcome::Inserted => IngestOutcome::Inserted(logical_id),
            CommitOutcome::Duplicate => IngestOutcome::Duplicate,
            CommitOutcome::Tombstoned => IngestOutcome::Discarded,
        })
    }

    // -- reads -------------------------------------------------------------

    pub fn latest(&self, logical_id: &LogicalId) -> Option<StoreEntry<S::Document>> {
        self.read(|state| state.store().latest(logical_id).cloned())
    }

    /// Held versions of a document, newest first.
    pub fn versions(&self, logical_id: &LogicalId) -> Vec<StoreEntry<S::Document>> {
        self.read(|state| state.store().versions(logical_id).to_vec())
    }

    pub fn get(&self, id: &EventId) -> Option<StoreEntry<S::Document>> {
        self.read(|state| state.store().get(id).cloned())
    }

    pub fn document(&self, logical_id: &LogicalId) -> Option<LogicalDocument<S::Document>> {
        self.read(|state| state.store().document(logical_id))
    }

    /// Every materialized document, most recently updated first.
    pub fn documents(&self) -> Vec<LogicalDocument<S::Document>> {
        self.read(|state| state.store().documents())
    }

    pub fn documents_by(&self, author: &PublicKey) -> Vec<LogicalDocument<S::Document>> {
        self.read(|state| state.store().documents_by(author))
    }

    /// Whether any key has tombstoned `id`.
    pub fn is_tombstoned(&self, id: &EventId) -> bool {
        self.read(|state| state.tombstones().has(id))
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.read(|state| state.store().contains(id))
    }

    /// Revision counter, bumped on every change to the materialized view.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    fn read<R>(&self, f: impl FnOnce(&ReconcileState<S::Document>) -> R) -> R {
        // Every mutation is a single synchronous step, so a poisoned lock
        // still guards a consistent state.
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, ReconcileState<S::Document>>, IngestError> {
        self.inner.state.write().map_err(|_| IngestError::Poisoned)
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use plume_crypto::Keys;
    use plume_relay::{Filter, MemoryRelay, RelayClient};
    use plume_store::RecordKind;
    use plume_types::{Tag, Timestamp, UnsignedEvent};

    use super::*;
    use crate::schema::{RecordHeader, Resolved};

    /// Plaintext notes addressed by `d` tag, owned by the signer unless an
    /// `owner` tag names another key. Content `slow:<ms>:<body>` delays
    /// resolution; content `bad` fails it.
    struct NoteSchema;

    #[async_trait]
    impl RecordSchema for NoteSchema {
        type Document = String;

        fn name(&self) -> &'static str {
            "note"
        }

        fn version_kinds(&self) -> &[Kind] {
            &[Kind::DRAFT]
        }

        fn header(&self, event: &SignedEvent) -> Result<RecordHeader, IngestError> {
            let d = event
                .tag_value("d")
                .ok_or(IngestError::MissingLogicalId(event.id))?;
            let owner = match event.tag_value("owner") {
                Some(hex) => hex
                    .parse::<PublicKey>()
                    .map_err(|_| IngestError::MissingLogicalId(event.id))?,
                None => event.pubkey,
            };
            Ok(RecordHeader::new(RecordKind::FullSave).with_logical_id(LogicalId::new(owner, d)))
        }

        async fn resolve(
            &self,
            event: &SignedEvent,
            _header: &RecordHeader,
        ) -> Result<Resolved<String>, IngestError> {
            if event.content == "bad" {
                return Err(IngestError::malformed(event.id, "bad body"));
            }
            if let Some(rest) = event.content.strip_prefix("slow:") {
                let (ms, body) = rest.split_once(':').unwrap_or(("0", rest));
                tokio::time::sleep(Duration::from_millis(ms.parse().unwrap_or(0))).await;
                return Ok(Resolved::new(body.to_string()));
            }
            Ok(Resolved::new(event.content.clone()))
        }
    }

    fn note(keys: &Keys, d: &str, at: u64, content: &str) -> SignedEvent {
        keys.sign_event(UnsignedEvent::new(
            keys.public_key(),
            Timestamp::from_secs(at),
            Kind::DRAFT,
            vec![Tag::identifier(d)],
            content,
        ))
        .unwrap()
    }

    fn deletion(keys: &Keys, ids: &[EventId]) -> SignedEvent {
        keys.sign_event(UnsignedEvent::new(
            keys.public_key(),
            Timestamp::from_secs(999),
            Kind::DELETION,
            ids.iter().map(Tag::event).collect(),
            "",
        ))
        .unwrap()
    }

    fn body(reconciler: &Reconciler<NoteSchema>, keys: &Keys, d: &str) -> Option<String> {
        reconciler
            .latest(&LogicalId::new(keys.public_key(), d))
            .map(|e| e.document)
    }

    #[tokio::test]
    async fn ingest_reports_each_outcome() {
        let reconciler = Reconciler::new(NoteSchema);
        let keys = Keys::generate();
        let v1 = note(&keys, "doc1", 100, "one");
        let doc1 = LogicalId::new(keys.public_key(), "doc1");

        assert_eq!(reconciler.ingest(v1.clone()).await, IngestOutcome::Inserted(doc1));
        assert_eq!(reconciler.ingest(v1.clone()).await, IngestOutcome::Duplicate);
        assert_eq!(
            reconciler.ingest(deletion(&keys, &[v1.id])).await,
            IngestOutcome::Deleted { removed: vec![v1.id] }
        );
        assert_eq!(reconciler.ingest(v1).await, IngestOutcome::Discarded);

        let other_kind = keys
            .sign_event(UnsignedEvent::new(
                keys.public_key(),
                Timestamp::from_secs(1),
                Kind::TEXT_NOTE,
                vec![],
                "hi",
            ))
            .unwrap();
        assert_eq!(reconciler.ingest(other_kind).await, IngestOutcome::Ignored);
    }

    #[tokio::test]
    async fn failures_are_isolated_to_the_event() {
        let reconciler = Reconciler::new(NoteSchema);
        let keys = Keys::generate();

        let bad = note(&keys, "doc1", 100, "bad");
        assert!(matches!(
            reconciler.ingest(bad).await,
            IngestOutcome::Dropped(IngestError::MalformedPayload { .. })
        ));

        let mut forged = note(&keys, "doc1", 100, "good");
        forged.created_at = Timestamp::from_secs(5);
        assert!(matches!(
            reconciler.ingest(forged).await,
            IngestOutcome::Dropped(IngestError::InvalidEvent { .. })
        ));

        let untagged = keys
            .sign_event(UnsignedEvent::new(
                keys.public_key(),
                Timestamp::from_secs(1),
                Kind::DRAFT,
                vec![],
                "x",
            ))
            .unwrap();
        assert!(matches!(
            reconciler.ingest(untagged).await,
            IngestOutcome::Dropped(IngestError::MissingLogicalId(_))
        ));

        reconciler.ingest(note(&keys, "doc1", 100, "good")).await;
        assert_eq!(body(&reconciler, &keys, "doc1").as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn deletion_during_slow_resolution_prevents_resurrection() {
        let reconciler = Reconciler::new(NoteSchema);
        let keys = Keys::generate();
        let slow = note(&keys, "doc", 10, "slow:50:late");

        let pending = reconciler.spawn(slow.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        reconciler.ingest(deletion(&keys, &[slow.id])).await;

        assert_eq!(pending.await.unwrap(), IngestOutcome::Discarded);
        assert!(reconciler.documents().is_empty());
        assert!(reconciler.is_tombstoned(&slow.id));
    }

    #[tokio::test]
    async fn slow_resolution_does_not_block_others() {
        let reconciler = Reconciler::new(NoteSchema);
        let keys = Keys::generate();

        let slow = reconciler.spawn(note(&keys, "a", 10, "slow:200:late"));
        let fast = reconciler.spawn(note(&keys, "b", 10, "quick"));

        fast.await.unwrap();
        assert_eq!(body(&reconciler, &keys, "b").as_deref(), Some("quick"));
        assert!(body(&reconciler, &keys, "a").is_none());

        slow.await.unwrap();
        assert_eq!(body(&reconciler, &keys, "a").as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn out_of_order_completion_still_prefers_newest() {
        let reconciler = Reconciler::new(NoteSchema);
        let keys = Keys::generate();

        let newer = reconciler.spawn(note(&keys, "doc", 200, "slow:40:new"));
        let older = reconciler.spawn(note(&keys, "doc", 100, "old"));
        older.await.unwrap();
        newer.await.unwrap();

        assert_eq!(body(&reconciler, &keys, "doc").as_deref(), Some("new"));
        assert_eq!(
            reconciler
                .versions(&LogicalId::new(keys.public_key(), "doc"))
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn revision_tracks_materialized_changes() {
        let reconciler = Reconciler::new(NoteSchema);
        let mut changes = reconciler.subscribe();
        let keys = Keys::generate();
        let v1 = note(&keys, "doc", 1, "x");

        reconciler.ingest(v1.clone()).await;
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), 1);

        reconciler.ingest(v1.clone()).await;
        assert!(!changes.has_changed().unwrap());

        reconciler.ingest(deletion(&keys, &[v1.id])).await;
        assert_eq!(reconciler.revision(), 2);
    }

    #[tokio::test]
    async fn run_drains_a_relay_subscription() {
        let relay = MemoryRelay::default();
        let keys = Keys::generate();
        let v1 = note(&keys, "doc1", 100, "v1");
        let v2 = note(&keys, "doc1", 200, "v2");
        relay.publish(&v1).await.unwrap();
        relay.publish(&v2).await.unwrap();
        relay.publish(&deletion(&keys, &[v2.id])).await.unwrap();

        let subscription = relay
            .subscribe(Filter::new().kinds([Kind::DRAFT, Kind::DELETION]))
            .await
            .unwrap();
        let reconciler = Reconciler::new(NoteSchema);
        let runner = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.run(subscription).await })
        };

        let mut changes = reconciler.subscribe();
        while body(&reconciler, &keys, "doc1").is_none() {
            changes.changed().await.unwrap();
        }
        assert_eq!(body(&reconciler, &keys, "doc1").as_deref(), Some("v1"));

        drop(relay);
        assert_eq!(runner.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn local_writes_are_visible_immediately() {
        let reconciler = Reconciler::new(NoteSchema);
        let keys = Keys::generate();
        let event = note(&keys, "doc", 5, "local");
        let header = NoteSchema.header(&event).unwrap();
        let logical_id = header.logical_id.clone().unwrap();

        let entry = StoreEntry::new(header.record(&event, logical_id.clone()), "local".to_string());
        assert_eq!(reconciler.apply_local(entry).unwrap(), CommitOutcome::Inserted);
        assert_eq!(reconciler.documents_by(&keys.public_key()).len(), 1);

        // The echo from the relay is a no-op.
        assert_eq!(reconciler.ingest(event.clone()).await, IngestOutcome::Duplicate);

        assert_eq!(
            reconciler
                .apply_local_deletion(keys.public_key(), [event.id])
                .unwrap(),
            vec![event.id]
        );
        assert!(reconciler.document(&logical_id).is_none());
    }

    #[tokio::test]
    async fn versions_claiming_another_owner_are_dropped() {
        let reconciler = Reconciler::new(NoteSchema);
        let alice = Keys::generate();
        let mallory = Keys::generate();
        reconciler.ingest(note(&alice, "essay", 100, "mine")).await;

        let forged = mallory
            .sign_event(UnsignedEvent::new(
                mallory.public_key(),
                Timestamp::from_secs(u32::MAX as u64),
                Kind::DRAFT,
                vec![
                    Tag::identifier("essay"),
                    Tag::new(["owner", alice.public_key().to_hex().as_str()]),
                ],
                "INJECTED",
            ))
            .unwrap();
        assert!(matches!(
            reconciler.ingest(forged).await,
            IngestOutcome::Dropped(IngestError::InvalidEvent { .. })
        ));
        assert_eq!(body(&reconciler, &alice, "essay").as_deref(), Some("mine"));
        assert_eq!(reconciler.documents().len(), 1);
    }

    #[tokio::test]
    async fn deletions_only_remove_the_deleters_versions() {
        let reconciler = Reconciler::new(NoteSchema);
        let alice = Keys::generate();
        let mallory = Keys::generate();
        let v1 = note(&alice, "doc", 100, "kept");
        let v2 = note(&alice, "doc", 200, "arrives later");

        reconciler.ingest(v1.clone()).await;
        assert_eq!(
            reconciler.ingest(deletion(&mallory, &[v1.id, v2.id])).await,
            IngestOutcome::Deleted { removed: vec![] }
        );
        assert_eq!(
            reconciler.ingest(v2.clone()).await,
            IngestOutcome::Inserted(LogicalId::new(alice.public_key(), "doc"))
        );
        assert_eq!(body(&reconciler, &alice, "doc").as_deref(), Some("arrives later"));

        reconciler.ingest(deletion(&alice, &[v2.id])).await;
        assert_eq!(body(&reconciler, &alice, "doc").as_deref(), Some("kept"));
    }
}
