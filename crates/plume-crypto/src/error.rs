use plume_types::EventId;

/// Errors from hashing, signing, and encryption.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("event {0} id does not match its content")]
    IdMismatch(EventId),

    #[error("invalid signature on event {0}")]
    InvalidSignature(EventId),

    #[error("invalid key")]
    InvalidKey,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
