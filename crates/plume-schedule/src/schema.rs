use std::sync::Arc;

use async_trait::async_trait;
use plume_crypto::EventSigner;
use plume_reconcile::{IngestError, RecordHeader, RecordSchema, Resolved};
use plume_store::RecordKind;
use plume_types::{Kind, SignedEvent};

use crate::payload::{SchedulePayload, ScheduledPublication};

/// Reads schedule requests (kind 5905).
///
/// The payload is always encrypted between the requester and the scheduler
/// service named in the `p` tag, so the logical id is only known once it has
/// been decrypted.
pub struct ScheduleSchema {
    signer: Arc<dyn EventSigner>,
}

impl ScheduleSchema {
    pub fn new(signer: Arc<dyn EventSigner>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl RecordSchema for ScheduleSchema {
    type Document = ScheduledPublication;

    fn name(&self) -> &'static str {
        "schedules"
    }

    fn version_kinds(&self) -> &[Kind] {
        &[Kind::SCHEDULE]
    }

    fn header(&self, event: &SignedEvent) -> Result<RecordHeader, IngestError> {
        let service = event
            .recipient()
            .ok_or_else(|| IngestError::decryption(event.id, "schedule names no service"))?;
        Ok(RecordHeader::new(RecordKind::Schedule).with_counterparty(Some(service)))
    }

    async fn resolve(
        &self,
        event: &SignedEvent,
        _header: &RecordHeader,
    ) -> Result<Resolved<ScheduledPublication>, IngestError> {
        let me = self.signer.public_key();
        let peer = event
            .peer_of(&me)
            .ok_or_else(|| IngestError::decryption(event.id, "no counterparty"))?;
        let plaintext = self
            .signer
            .decrypt(&peer, &event.content)
            .await
            .map_err(|e| IngestError::decryption(event.id, e))?;

        let publication = SchedulePayload::decode(&plaintext)
            .and_then(SchedulePayload::into_publication)
            .map_err(|e| IngestError::malformed(event.id, e))?;
        let logical_id = publication.logical_id(event.pubkey);
        Ok(Resolved::new(publication).with_logical_id(logical_id))
    }
}
