use plume_types::{PublicKey, Sig, SignedEvent, UnsignedEvent};

use crate::error::CryptoError;
use crate::hasher::EventHasher;

/// An Ed25519 key pair that signs events.
pub struct Keys(ed25519_dalek::SigningKey);

impl Keys {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a hex-encoded 32-byte secret.
    pub fn from_hex(secret: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(secret).map_err(|_| CryptoError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self::from_bytes(arr))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.0.verifying_key().to_bytes())
    }

    /// Compute the id of `event` and sign it.
    ///
    /// The event must be authored by this key pair.
    pub fn sign_event(&self, event: UnsignedEvent) -> Result<SignedEvent, CryptoError> {
        use ed25519_dalek::Signer;

        if event.pubkey != self.public_key() {
            return Err(CryptoError::Signing(format!(
                "event author {} is not the signing key {}",
                event.pubkey.short_id(),
                self.public_key().short_id()
            )));
        }
        let id = EventHasher::EVENT.event_id(&event)?;
        let sig = self.0.sign(id.as_bytes());
        Ok(SignedEvent {
            id,
            pubkey: event.pubkey,
            created_at: event.created_at,
            kind: event.kind,
            tags: event.tags,
            content: event.content,
            sig: Sig::from_bytes(sig.to_bytes()),
        })
    }

    /// Diffie-Hellman secret shared between this key pair and `peer`.
    ///
    /// Both Ed25519 keys are mapped to their X25519 (Montgomery) form, so
    /// `a.shared_secret(B) == b.shared_secret(A)`.
    pub fn shared_secret(&self, peer: &PublicKey) -> Result<[u8; 32], CryptoError> {
        let peer = ed25519_dalek::VerifyingKey::from_bytes(peer.as_bytes())
            .map_err(|_| CryptoError::InvalidKey)?;
        let shared = (peer.to_montgomery() * self.0.to_scalar()).to_bytes();
        if shared == [0u8; 32] {
            return Err(CryptoError::InvalidKey);
        }
        Ok(shared)
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keys({}, <redacted>)", self.public_key().short_id())
    }
}

/// Verify that a relay-delivered event is intact and signed by its author.
pub fn verify_event(event: &SignedEvent) -> Result<(), CryptoError> {
    use ed25519_dalek::Verifier;

    if !EventHasher::EVENT.verify(event) {
        return Err(CryptoError::IdMismatch(event.id));
    }
    let key = ed25519_dalek::VerifyingKey::from_bytes(event.pubkey.as_bytes())
        .map_err(|_| CryptoError::InvalidSignature(event.id))?;
    let sig = ed25519_dalek::Signature::from_bytes(event.sig.as_bytes());
    key.verify(event.id.as_bytes(), &sig)
        .map_err(|_| CryptoError::InvalidSignature(event.id))
}
