//! Ingestion reducer for Plume.
//!
//! Mutable documents (drafts, scheduled posts) arrive as immutable signed
//! version events and deletion events, out of order, duplicated, and from
//! several relays at once. This crate folds that stream into materialized
//! logical documents such that the result depends only on the *set* of
//! events seen, not their order.
//!
//! # Key Types
//!
//! - [`RecordSchema`] -- describes one family of version events: how to read
//!   a header from tags and how to resolve the payload
//! - [`ReconcileState`] -- the synchronous reducer over a version store and
//!   tombstone set
//! - [`Reconciler`] -- the async driver: verification, two-phase
//!   resolve-then-commit, per-event tasks, and a revision feed for observers
//!
//! # Properties
//!
//! - Ingesting an event twice is the same as ingesting it once.
//! - A deletion and the version it names converge to the same state in
//!   either order.
//! - A tombstoned id is never materialized again for the key that deleted
//!   it. Deletions by other keys have no effect on a version.
//! - A version is owned by its signer; one claiming another key's logical
//!   id is dropped.
//! - The version with the greater `created_at` is the latest. On an exact
//!   tie the version held first stays ahead.

pub mod error;
pub mod reconciler;
pub mod schema;
pub mod state;

pub use error::IngestError;
pub use reconciler::{IngestOutcome, Reconciler};
pub use schema::{RecordHeader, RecordSchema, Resolved};
pub use state::{Admission, CommitOutcome, ReconcileState};
