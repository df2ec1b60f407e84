use std::collections::BTreeMap;

use plume_types::{Kind, PublicKey, SignedEvent, Timestamp};

/// Filter selecting the events a subscription receives.
///
/// Unset fields match everything. Tag constraints match when the event has
/// at least one tag of that name whose value is listed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<Kind>>,
    /// If set, only events by these authors are delivered.
    pub authors: Option<Vec<PublicKey>>,
    /// Single-letter tag constraints, e.g. `'p' -> [pubkey]`.
    pub tags: BTreeMap<char, Vec<String>>,
    /// If set, only events created at or after this time are delivered.
    pub since: Option<Timestamp>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn author(mut self, author: PublicKey) -> Self {
        self.authors.get_or_insert_with(Vec::new).push(author);
        self
    }

    pub fn tag(mut self, name: char, value: impl Into<String>) -> Self {
        self.tags.entry(name).or_default().push(value.into());
        self
    }

    /// Events addressed to `key` via a `p` tag.
    pub fn recipient(self, key: &PublicKey) -> Self {
        self.tag('p', key.to_hex())
    }

    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    /// Returns `true` if the given event matches this filter.
    pub fn matches(&self, event: &SignedEvent) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if let Some(ref authors) = self.authors {
            if !authors.contains(&event.pubkey) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.created_at < since {
                return false;
            }
        }
        self.tags.iter().all(|(name, wanted)| {
            let name = name.to_string();
            let found = event
                .tag_values(&name)
                .any(|value| wanted.iter().any(|w| w == value));
            found
        })
    }
}
