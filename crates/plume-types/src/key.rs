use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Public key of an event author or counterparty.
///
/// Keys are compared and ordered by their raw bytes. Relays and tags carry
/// them as 64-character hex strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "crate::hex_serde")] [u8; 32]);

impl PublicKey {
    /// Create from raw 32-byte key material.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("pk:{}", hex::encode(&self.0[..4]))
    }

    /// Parse from a hex string (64 hex characters).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        crate::hex_serde::decode(s).map(Self)
    }
}

impl FromStr for PublicKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.short_id())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_format() {
        let key = PublicKey::from_bytes([0; 32]);
        let short = key.short_id();
        assert!(short.starts_with("pk:"));
        assert_eq!(short.len(), 11);
    }

    #[test]
    fn hex_roundtrip() {
        let key = PublicKey::from_bytes([99; 32]);
        let parsed: PublicKey = key.to_hex().parse().unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn ordering_is_consistent() {
        assert!(PublicKey::from_bytes([0; 32]) < PublicKey::from_bytes([1; 32]));
    }
}
