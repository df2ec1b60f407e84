use plume_types::{EventId, SignedEvent, UnsignedEvent};

use crate::error::CryptoError;

/// Domain-separated BLAKE3 event hasher.
///
/// The domain tag is prepended to every hash computation, so an event id can
/// never collide with a hash computed for another purpose over the same bytes.
pub struct EventHasher {
    domain: &'static str,
}

impl EventHasher {
    /// Hasher for event ids.
    pub const EVENT: Self = Self {
        domain: "plume-event-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> EventId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        EventId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Content-derived id of an event.
    pub fn event_id(&self, event: &UnsignedEvent) -> Result<EventId, CryptoError> {
        let bytes = event
            .canonical_bytes()
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(self.hash(&bytes))
    }

    /// Check that a signed event's id matches its content.
    pub fn verify(&self, event: &SignedEvent) -> bool {
        self.event_id(&event.unsigned())
            .map(|id| id == event.id)
            .unwrap_or(false)
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
