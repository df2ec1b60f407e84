use plume_crypto::CryptoError;
use plume_reconcile::IngestError;
use plume_types::EventId;

/// Errors surfaced by explicit save actions.
///
/// Publishing is not one of them: once a save is signed and applied locally
/// it stands, and relay failures are only logged.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("signing failed: {0}")]
    Signing(#[source] CryptoError),

    #[error("encryption to counterparty failed: {0}")]
    Encryption(#[source] CryptoError),

    #[error("cannot encode draft: {0}")]
    Encode(String),

    #[error("unknown draft version {0}")]
    UnknownVersion(EventId),

    #[error("local store error: {0}")]
    Store(#[from] IngestError),
}

pub type Result<T> = std::result::Result<T, SaveError>;
