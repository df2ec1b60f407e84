use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::EventId;
use crate::key::PublicKey;
use crate::kind::Kind;

/// A single event tag, e.g. `["d", "my-article"]` or `["e", "<id>"]`.
///
/// The first element names the tag, the rest are positional values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// `["d", identifier]`
    pub fn identifier(identifier: impl Into<String>) -> Self {
        Self(vec!["d".into(), identifier.into()])
    }

    /// `["e", id]`
    pub fn event(id: &EventId) -> Self {
        Self(vec!["e".into(), id.to_hex()])
    }

    /// `["p", pubkey]`
    pub fn pubkey(key: &PublicKey) -> Self {
        Self(vec!["p".into(), key.to_hex()])
    }

    /// `["a", "kind:author:identifier"]`
    pub fn coordinate(coordinate: &Coordinate) -> Self {
        Self(vec!["a".into(), coordinate.to_string()])
    }

    /// `["k", kind]`
    pub fn kind(kind: Kind) -> Self {
        Self(vec!["k".into(), kind.to_string()])
    }

    /// The tag name (first element).
    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// The first value (second element).
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Address of an addressable event: `kind:author:identifier`.
///
/// The identifier is everything after the second `:` and may itself
/// contain colons.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub kind: Kind,
    pub author: PublicKey,
    pub identifier: String,
}

impl Coordinate {
    pub fn new(kind: Kind, author: PublicKey, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            author,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.author, self.identifier)
    }
}

impl FromStr for Coordinate {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(kind), Some(author), Some(identifier)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(TypeError::InvalidCoordinate(s.to_string()));
        };
        let kind = kind
            .parse::<u16>()
            .map_err(|_| TypeError::InvalidCoordinate(s.to_string()))?;
        Ok(Self {
            kind: Kind::new(kind),
            author: PublicKey::from_hex(author)?,
            identifier: identifier.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_accessors() {
        let tag = Tag::identifier("article-1");
        assert_eq!(tag.name(), Some("d"));
        assert_eq!(tag.value(), Some("article-1"));
        assert_eq!(Tag::new(Vec::<String>::new()).name(), None);
    }

    #[test]
    fn tag_serializes_as_array() {
        let json = serde_json::to_string(&Tag::new(["k", "30023"])).unwrap();
        assert_eq!(json, r#"["k","30023"]"#);
    }

    #[test]
    fn coordinate_roundtrip() {
        let coord = Coordinate::new(Kind::DRAFT, PublicKey::from_bytes([3; 32]), "my:draft");
        let parsed: Coordinate = coord.to_string().parse().unwrap();
        assert_eq!(parsed, coord);
        assert_eq!(parsed.identifier, "my:draft");
    }

    #[test]
    fn coordinate_rejects_garbage() {
        assert!(matches!(
            "31234".parse::<Coordinate>(),
            Err(TypeError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            "abc:00:id".parse::<Coordinate>(),
            Err(TypeError::InvalidCoordinate(_))
        ));
        assert!("31234:nothex:id".parse::<Coordinate>().is_err());
    }
}
