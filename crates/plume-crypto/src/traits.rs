//! The [`EventSigner`] seam.
//!
//! Signing and counterparty encryption belong to an external collaborator
//! (a browser extension, a remote signer, a local key). Everything else in
//! Plume signs and decrypts through this trait, never through key material.

use async_trait::async_trait;
use plume_types::{PublicKey, SignedEvent, UnsignedEvent};

use crate::cipher::ConversationKey;
use crate::error::CryptoError;
use crate::signer::Keys;

/// Signs events and encrypts payloads on behalf of one author.
#[async_trait]
pub trait EventSigner: Send + Sync {
    /// The author this signer signs as.
    fn public_key(&self) -> PublicKey;

    /// Compute the id of `event` and sign it.
    async fn sign(&self, event: UnsignedEvent) -> Result<SignedEvent, CryptoError>;

    /// Encrypt `plaintext` so only this author and `peer` can read it.
    async fn encrypt(&self, peer: &PublicKey, plaintext: &str) -> Result<String, CryptoError>;

    /// Decrypt a payload exchanged with `peer`.
    async fn decrypt(&self, peer: &PublicKey, ciphertext: &str) -> Result<String, CryptoError>;
}

/// [`EventSigner`] backed by in-process [`Keys`].
#[derive(Debug)]
pub struct LocalSigner {
    keys: Keys,
}

impl LocalSigner {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    pub fn generate() -> Self {
        Self::new(Keys::generate())
    }

    fn conversation(&self, peer: &PublicKey) -> Result<ConversationKey, CryptoError> {
        ConversationKey::derive(&self.keys.shared_secret(peer)?)
    }
}

#[async_trait]
impl EventSigner for LocalSigner {
    fn public_key(&self) -> PublicKey {
        self.keys.public_key()
    }

    async fn sign(&self, event: UnsignedEvent) -> Result<SignedEvent, CryptoError> {
        self.keys.sign_event(event)
    }

    async fn encrypt(&self, peer: &PublicKey, plaintext: &str) -> Result<String, CryptoError> {
        self.conversation(peer)?.encrypt(plaintext)
    }

    async fn decrypt(&self, peer: &PublicKey, ciphertext: &str) -> Result<String, CryptoError> {
        self.conversation(peer)?.decrypt(ciphertext)
    }
}
