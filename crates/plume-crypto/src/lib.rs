//! Cryptographic collaborators for Plume.
//!
//! Provides domain-separated BLAKE3 event hashing, Ed25519 event signing and
//! verification, counterparty encryption for proposals and schedules, and the
//! [`EventSigner`] trait the rest of the workspace signs and decrypts through.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod cipher;
pub mod error;
pub mod hasher;
pub mod signer;
pub mod traits;

pub use cipher::ConversationKey;
pub use error::CryptoError;
pub use hasher::EventHasher;
pub use signer::{verify_event, Keys};
pub use traits::{EventSigner, LocalSigner};
