use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::EventId;
use crate::key::PublicKey;
use crate::kind::Kind;
use crate::tag::Tag;
use crate::time::Timestamp;

/// 64-byte signature over an event id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sig(#[serde(with = "crate::hex_serde")] [u8; 64]);

impl Sig {
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}...)", hex::encode(&self.0[..8]))
    }
}

/// An event that has been composed but not yet signed.
///
/// Drafts embed their inner document in this form: the article or thread
/// that will eventually be published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: PublicKey,
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    pub fn new(
        pubkey: PublicKey,
        created_at: Timestamp,
        kind: Kind,
        tags: Vec<Tag>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            pubkey,
            created_at,
            kind,
            tags,
            content: content.into(),
        }
    }

    /// Canonical serialization hashed to derive the event id:
    /// `[0, pubkey, created_at, kind, tags, content]`.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TypeError> {
        let canonical = (
            0u8,
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        );
        serde_json::to_vec(&canonical).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn tag_value(&self, name: &str) -> Option<&str> {
        first_value(&self.tags, name)
    }
}

/// A signed event as exchanged with relays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: EventId,
    pub pubkey: PublicKey,
    pub created_at: Timestamp,
    pub kind: Kind,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: Sig,
}

impl SignedEvent {
    /// The signed fields without id and signature.
    pub fn unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    /// Value of the first tag named `name`.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        first_value(&self.tags, name)
    }

    /// Values of every tag named `name`.
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.name() == Some(name))
            .filter_map(Tag::value)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name() == Some(name))
    }

    /// Every `e` tag that parses as an event id. Malformed values are skipped.
    pub fn referenced_events(&self) -> Vec<EventId> {
        self.tag_values("e")
            .filter_map(|v| EventId::from_hex(v).ok())
            .collect()
    }

    /// The `p` tag, if it parses as a public key.
    pub fn recipient(&self) -> Option<PublicKey> {
        self.tag_value("p").and_then(|v| PublicKey::from_hex(v).ok())
    }

    /// The other party of an encrypted exchange, seen from `me`: the
    /// recipient when `me` authored the event, the author otherwise.
    pub fn peer_of(&self, me: &PublicKey) -> Option<PublicKey> {
        if self.pubkey == *me {
            self.recipient()
        } else {
            Some(self.pubkey)
        }
    }
}

fn first_value<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.name() == Some(name))
        .and_then(Tag::value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tags: Vec<Tag>) -> SignedEvent {
        SignedEvent {
            id: EventId::from_hash([1; 32]),
            pubkey: PublicKey::from_bytes([2; 32]),
            created_at: Timestamp::from_secs(100),
            kind: Kind::DELETION,
            tags,
            content: String::new(),
            sig: Sig::from_bytes([3; 64]),
        }
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let event = sample(vec![Tag::identifier("x")]).unsigned();
        assert_eq!(event.canonical_bytes().unwrap(), event.canonical_bytes().unwrap());
        let text = String::from_utf8(event.canonical_bytes().unwrap()).unwrap();
        assert!(text.starts_with("[0,\""));
        assert!(text.ends_with(",100,5,[[\"d\",\"x\"]],\"\"]"));
    }

    #[test]
    fn referenced_events_skip_malformed() {
        let good = EventId::from_hash([9; 32]);
        let event = sample(vec![
            Tag::event(&good),
            Tag::new(["e", "not-an-id"]),
            Tag::new(["e"]),
        ]);
        assert_eq!(event.referenced_events(), vec![good]);
    }

    #[test]
    fn peer_of_depends_on_perspective() {
        let counterparty = PublicKey::from_bytes([8; 32]);
        let event = sample(vec![Tag::pubkey(&counterparty)]);
        assert_eq!(event.peer_of(&event.pubkey), Some(counterparty));
        assert_eq!(event.peer_of(&counterparty), Some(event.pubkey));
        assert_eq!(sample(vec![]).peer_of(&event.pubkey), None);
    }

    #[test]
    fn json_shape_matches_wire_format() {
        let event = sample(vec![]);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], 5);
        assert_eq!(value["created_at"], 100);
        assert_eq!(value["sig"].as_str().unwrap().len(), 128);
        let back: SignedEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
