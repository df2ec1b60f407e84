//! Version storage for Plume's event-sourced documents.
//!
//! Mutable application state (drafts, scheduled posts) is modelled as chains
//! of immutable signed version records. This crate holds the two structures
//! that state is folded into:
//!
//! - [`VersionStore`] -- per logical document, the resolved versions held so
//!   far, newest first
//! - [`TombstoneSet`] -- ids that a deletion record has removed for good,
//!   with the keys that deleted them
//!
//! # Design Rules
//!
//! 1. Records are immutable; an update is always a new record.
//! 2. Upserts are idempotent by record id.
//! 3. A logical document whose last version is removed disappears.
//! 4. A version's signer owns its logical id (`logical_id.author`), and only
//!    that key's deletions remove it.
//! 5. Both structures are plain data. Callers that share them across tasks
//!    hold them behind one lock so a tombstone check and the insert it guards
//!    happen atomically.

pub mod record;
pub mod tombstones;
pub mod versions;

pub use record::{LogicalDocument, RecordKind, StoreEntry, VersionRecord};
pub use tombstones::TombstoneSet;
pub use versions::{UpsertOutcome, VersionStore};
