use chacha20poly1305::aead::Aead;
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::CryptoError;

const KDF_SALT: &[u8] = b"plume-conversation-v1";
const NONCE_LEN: usize = 24;

/// Symmetric key for one author/counterparty pair.
///
/// Derived with HKDF-SHA256 from the pair's Diffie-Hellman secret. Payloads
/// are XChaCha20-Poly1305 sealed and carried as `hex(nonce || ciphertext)`.
pub struct ConversationKey([u8; 32]);

impl ConversationKey {
    /// Derive the conversation key from a shared secret.
    pub fn derive(shared_secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), shared_secret);
        let mut okm = [0u8; 32];
        hk.expand(b"payload", &mut okm)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok(Self(okm))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.0));
        let mut nonce = [0u8; NONCE_LEN];
        rand::Rng::fill(&mut rand::thread_rng(), &mut nonce);

        let sealed = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(hex::encode(out))
    }

    pub fn decrypt(&self, payload: &str) -> Result<String, CryptoError> {
        let bytes = hex::decode(payload.trim())
            .map_err(|e| CryptoError::Decryption(format!("payload is not hex: {e}")))?;
        if bytes.len() <= NONCE_LEN {
            return Err(CryptoError::Decryption("payload too short".into()));
        }
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.0));
        let plain = cipher
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decryption("authentication failed".into()))?;
        String::from_utf8(plain).map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

impl std::fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConversationKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt() {
        let key = ConversationKey::derive(&[7; 32]).unwrap();
        let sealed = key.encrypt("secret draft").unwrap();
        assert_ne!(sealed, "secret draft");
        assert_eq!(key.decrypt(&sealed).unwrap(), "secret draft");
    }

    #[test]
    fn nonces_are_fresh() {
        let key = ConversationKey::derive(&[7; 32]).unwrap();
        assert_ne!(key.encrypt("same").unwrap(), key.encrypt("same").unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = ConversationKey::derive(&[1; 32])
            .unwrap()
            .encrypt("hello")
            .unwrap();
        let other = ConversationKey::derive(&[2; 32]).unwrap();
        assert!(matches!(
            other.decrypt(&sealed),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn garbage_payloads_fail() {
        let key = ConversationKey::derive(&[1; 32]).unwrap();
        assert!(key.decrypt("not hex at all").is_err());
        assert!(key.decrypt("abcd").is_err());
        assert!(key.decrypt("{\"event\":{}}").is_err());
    }
}
