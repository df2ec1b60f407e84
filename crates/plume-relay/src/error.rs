use plume_types::EventId;

/// Errors produced by relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The relay refused the event (bad id or signature).
    #[error("event {id} rejected: {reason}")]
    Rejected { id: EventId, reason: String },

    /// The event could not be delivered.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Internal lock poisoned by a panicking task.
    #[error("relay state poisoned")]
    Poisoned,
}

/// Convenience alias used throughout the relay crate.
pub type Result<T> = std::result::Result<T, RelayError>;
