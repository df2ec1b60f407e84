//! Serde helpers encoding fixed-size byte arrays as lowercase hex strings,
//! the representation relays use for ids, keys, and signatures.

use serde::{self, Deserialize, Deserializer, Serializer};

pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    decode(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn decode<const N: usize>(s: &str) -> Result<[u8; N], crate::TypeError> {
    let bytes = hex::decode(s).map_err(|e| crate::TypeError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| crate::TypeError::InvalidLength {
            expected: N,
            actual,
        })
}
