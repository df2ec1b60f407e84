//! Draft versioning for Plume.
//!
//! A draft is never edited in place. Each save signs a new version event:
//! a full save (kind 31234, addressed by its `d` tag) or an autosave
//! checkpoint (kind 1234, pointing at its draft and parent version). Manual
//! saves delete the older versions they supersede; checkpoints accumulate as
//! history until then.
//!
//! # Key Types
//!
//! - [`DraftSchema`] -- how draft events are read back, including proposals
//!   encrypted to a counterparty
//! - [`DraftCoordinator`] -- authoring: manual save, autosave checkpoint,
//!   delete, history, and restore
//! - [`AutosavePolicy`] / [`AutosaveDriver`] -- when checkpoints are taken
//! - [`SaveStatusBoard`] -- observable per-draft save status

pub mod autosave;
pub mod coordinator;
pub mod error;
pub mod schema;
pub mod status;

pub use autosave::{AutosaveConfig, AutosaveDriver, AutosavePolicy};
pub use coordinator::{new_identifier, DraftCoordinator, SaveMode, SaveReceipt};
pub use error::{Result, SaveError};
pub use schema::{DraftContent, DraftDocument, DraftSchema};
pub use status::{SaveStatus, SaveStatusBoard};
