use std::sync::Arc;

use plume_crypto::EventSigner;
use plume_reconcile::Reconciler;
use plume_relay::RelayClient;
use plume_store::{LogicalDocument, RecordKind, StoreEntry, VersionRecord};
use plume_types::{
    Clock, EventId, Kind, LogicalId, PublicKey, SignedEvent, Tag, Timestamp, UnsignedEvent,
};
use tracing::{info, warn};

use crate::error::{Result, ScheduleError};
use crate::payload::{SchedulePayload, ScheduledPublication};
use crate::schema::ScheduleSchema;

/// Outcome of [`Scheduler::schedule`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleReceipt {
    pub logical_id: LogicalId,
    /// The schedule request event.
    pub request: EventId,
    /// The pre-signed event the service will publish.
    pub inner: EventId,
    pub publish_at: Timestamp,
    /// Earlier requests for the same post that this one replaced.
    pub superseded: Vec<EventId>,
}

/// Hands pre-signed events to a scheduler service for later publication.
#[derive(Clone)]
pub struct Scheduler {
    signer: Arc<dyn EventSigner>,
    relay: Arc<dyn RelayClient>,
    clock: Arc<dyn Clock>,
    service: PublicKey,
    schedules: Reconciler<ScheduleSchema>,
}

impl Scheduler {
    pub fn new(
        signer: Arc<dyn EventSigner>,
        relay: Arc<dyn RelayClient>,
        clock: Arc<dyn Clock>,
        service: PublicKey,
    ) -> Self {
        let schedules = Reconciler::new(ScheduleSchema::new(Arc::clone(&signer)));
        Self {
            signer,
            relay,
            clock,
            service,
            schedules,
        }
    }

    pub fn schedules(&self) -> &Reconciler<ScheduleSchema> {
        &self.schedules
    }

    pub fn service(&self) -> PublicKey {
        self.service
    }

    /// Sign `inner` with `publish_at` as its creation time and ask the
    /// service to publish it then.
    ///
    /// The request is encrypted to the service. Earlier requests for the same
    /// post are deleted.
    pub async fn schedule(
        &self,
        mut inner: UnsignedEvent,
        publish_at: impl Into<Timestamp>,
        relays: Vec<String>,
    ) -> Result<ScheduleReceipt> {
        let publish_at = publish_at.into();
        let now = self.clock.now();
        if publish_at <= now {
            return Err(ScheduleError::PublishTimeInPast { publish_at, now });
        }

        inner.created_at = publish_at;
        let inner = self.signer.sign(inner).await.map_err(ScheduleError::Signing)?;
        let publication = ScheduledPublication {
            event: inner.clone(),
            publish_at,
            relays: relays.clone(),
        };
        let me = self.signer.public_key();
        let logical_id = publication.logical_id(me);

        let payload = SchedulePayload::Current {
            event: inner,
            relays,
        }
        .encode()?;
        let sealed = self
            .signer
            .encrypt(&self.service, &payload)
            .await
            .map_err(ScheduleError::Encryption)?;
        let request = self
            .signer
            .sign(UnsignedEvent::new(
                me,
                now,
                Kind::SCHEDULE,
                vec![Tag::pubkey(&self.service), Tag::new(["encrypted"])],
                sealed,
            ))
            .await
            .map_err(ScheduleError::Signing)?;

        let inner_id = publication.event.id;
        let record = VersionRecord {
            id: request.id,
            logical_id: logical_id.clone(),
            created_at: request.created_at,
            kind: RecordKind::Schedule,
            parent: None,
            counterparty: Some(self.service),
        };
        self.schedules
            .apply_local(StoreEntry::new(record, publication))?;
        self.publish(request.clone());

        let superseded = self.supersede(&logical_id, &request).await;
        info!(
            logical_id = %logical_id,
            request = %request.id,
            publish_at = %publish_at.to_datetime(),
            "publication scheduled"
        );
        Ok(ScheduleReceipt {
            logical_id,
            request: request.id,
            inner: inner_id,
            publish_at,
            superseded,
        })
    }

    /// Withdraw every held request for a scheduled post.
    pub async fn cancel(&self, logical_id: &LogicalId) -> Result<Vec<EventId>> {
        let ids: Vec<EventId> = self
            .schedules
            .versions(logical_id)
            .iter()
            .map(StoreEntry::id)
            .collect();
        if ids.is_empty() {
            return Err(ScheduleError::UnknownSchedule(logical_id.clone()));
        }
        let removed = self.emit_deletion(ids).await?;
        info!(logical_id = %logical_id, removed = removed.len(), "schedule cancelled");
        Ok(removed)
    }

    /// This author's scheduled posts, soonest first.
    pub fn upcoming(&self) -> Vec<LogicalDocument<ScheduledPublication>> {
        let mut docs = self.schedules.documents_by(&self.signer.public_key());
        docs.sort_by(|a, b| {
            a.document()
                .publish_at
                .cmp(&b.document().publish_at)
                .then_with(|| a.logical_id.cmp(&b.logical_id))
        });
        docs
    }

    pub fn get(&self, logical_id: &LogicalId) -> Option<ScheduledPublication> {
        self.schedules
            .latest(logical_id)
            .map(|entry| entry.document)
    }

    async fn supersede(&self, logical_id: &LogicalId, request: &SignedEvent) -> Vec<EventId> {
        let stale: Vec<EventId> = self
            .schedules
            .versions(logical_id)
            .iter()
            .filter(|e| e.id() != request.id && e.created_at() < request.created_at)
            .map(StoreEntry::id)
            .collect();
        if stale.is_empty() {
            return Vec::new();
        }
        self.emit_deletion(stale).await.unwrap_or_else(|err| {
            warn!(logical_id = %logical_id, error = %err, "replacing earlier schedule failed");
            Vec::new()
        })
    }

    async fn emit_deletion(&self, ids: Vec<EventId>) -> Result<Vec<EventId>> {
        let mut tags: Vec<Tag> = ids.iter().map(Tag::event).collect();
        tags.push(Tag::kind(Kind::SCHEDULE));
        let deletion = self
            .signer
            .sign(UnsignedEvent::new(
                self.signer.public_key(),
                self.clock.now(),
                Kind::DELETION,
                tags,
                "",
            ))
            .await
            .map_err(ScheduleError::Signing)?;
        let removed = self
            .schedules
            .apply_local_deletion(self.signer.public_key(), ids)?;
        self.publish(deletion);
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
}
