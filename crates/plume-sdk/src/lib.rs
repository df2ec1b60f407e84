//! High-level SDK for Plume.
//!
//! [`Plume`] wires one author's signer and relay into a draft coordinator
//! and, when a scheduler service is configured, a [`Scheduler`]. Everything
//! an application needs to embed draft sync is reachable from it.
//!
//! ```ignore
//! let config = PlumeConfig::load("plume.toml")?;
//! let plume = Plume::builder(signer, relay).with_config(config).build();
//! plume.start().await?;
//!
//! let editor = plume.open_draft(None, SaveMode::Private);
//! editor.edit(DraftContent::article("# Hello"));
//! ```

pub mod config;
pub mod error;
pub mod plume;

pub use config::{PlumeConfig, ScheduleConfig};
pub use error::{SdkError, SdkResult};
pub use plume::{Plume, PlumeBuilder};

// Re-export key types
pub use plume_crypto::{EventSigner, Keys, LocalSigner};
pub use plume_drafts::{
    AutosaveConfig, AutosaveDriver, DraftContent, DraftCoordinator, DraftDocument, SaveMode,
    SaveReceipt, SaveStatus,
};
pub use plume_relay::{Filter, MemoryRelay, RelayClient, RelayConfig};
pub use plume_schedule::{ScheduleReceipt, ScheduledPublication, Scheduler};
pub use plume_store::LogicalDocument;
pub use plume_types::{EventId, Kind, LogicalId, PublicKey, SignedEvent, Timestamp, UnsignedEvent};
