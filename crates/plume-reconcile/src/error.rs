use plume_types::EventId;

/// Reasons a single incoming event is dropped during ingestion.
///
/// Every variant is scoped to one event. The reducer logs it and moves on;
/// nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("invalid event {id}: {reason}")]
    InvalidEvent { id: EventId, reason: String },

    #[error("event {0} carries no logical document id")]
    MissingLogicalId(EventId),

    #[error("cannot decrypt event {id}: {reason}")]
    Decryption { id: EventId, reason: String },

    #[error("malformed payload in event {id}: {reason}")]
    MalformedPayload { id: EventId, reason: String },

    #[error("reconciler state poisoned")]
    Poisoned,
}

impl IngestError {
    pub fn malformed(id: EventId, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            id,
            reason: reason.to_string(),
        }
    }

    pub fn decryption(id: EventId, reason: impl ToString) -> Self {
        Self::Decryption {
            id,
            reason: reason.to_string(),
        }
    }
}
