use plume_crypto::CryptoError;
use plume_reconcile::IngestError;
use plume_types::{LogicalId, Timestamp};

/// Errors from scheduling and from decoding schedule payloads.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("malformed schedule payload: {0}")]
    Malformed(String),

    #[error("publish time {publish_at} is not after {now}")]
    PublishTimeInPast { publish_at: Timestamp, now: Timestamp },

    #[error("signing failed: {0}")]
    Signing(#[source] CryptoError),

    #[error("encryption to scheduler service failed: {0}")]
    Encryption(#[source] CryptoError),

    #[error("no scheduled post {0}")]
    UnknownSchedule(LogicalId),

    #[error("local store error: {0}")]
    Store(#[from] IngestError),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
