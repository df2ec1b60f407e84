use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::PublicKey;

/// Stable identifier grouping every version of one logical document.
///
/// Derived from tags (a `d` tag or an `a` back-reference), never from an
/// event id, so it survives re-saves. The author is part of the identity:
/// two authors may pick the same identifier without colliding.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalId {
    pub author: PublicKey,
    pub identifier: String,
}

impl LogicalId {
    pub fn new(author: PublicKey, identifier: impl Into<String>) -> Self {
        Self {
            author,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Debug for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicalId({}/{})", self.author.short_id(), self.identifier)
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.author.short_id(), self.identifier)
    }
}
