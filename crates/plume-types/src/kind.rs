use std::fmt;

use serde::{Deserialize, Serialize};

/// Event kind discriminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(u16);

impl Kind {
    /// Short text note; the inner kind of thread drafts.
    pub const TEXT_NOTE: Kind = Kind(1);
    /// Deletion request listing event ids to tombstone.
    pub const DELETION: Kind = Kind(5);
    /// Incremental autosave checkpoint of a draft.
    pub const DRAFT_CHECKPOINT: Kind = Kind(1234);
    /// Request to publish a pre-signed event at a later time.
    pub const SCHEDULE: Kind = Kind(5905);
    /// Long-form article; the inner kind of article drafts.
    pub const LONG_FORM: Kind = Kind(30023);
    /// Full draft save, addressable by its `d` tag.
    pub const DRAFT: Kind = Kind(31234);

    pub const fn new(kind: u16) -> Self {
        Self(kind)
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Addressable kinds are identified by `kind:author:d` rather than by id.
    pub const fn is_addressable(&self) -> bool {
        self.0 >= 30000 && self.0 < 40000
    }
}

impl From<u16> for Kind {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.0)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressable_range() {
        assert!(Kind::DRAFT.is_addressable());
        assert!(Kind::LONG_FORM.is_addressable());
        assert!(!Kind::DRAFT_CHECKPOINT.is_addressable());
        assert!(!Kind::SCHEDULE.is_addressable());
    }
}
