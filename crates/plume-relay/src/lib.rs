//! Relay collaborator for Plume.
//!
//! Persisted state lives entirely in signed events held by relays. This crate
//! defines the seam the reconciliation core talks to ([`RelayClient`]), the
//! subscription [`Filter`], and [`MemoryRelay`], an in-process relay that
//! stores events, honours deletions, and fans out to live subscribers.

pub mod error;
pub mod filter;
pub mod memory;
pub mod traits;

pub use error::{RelayError, Result};
pub use filter::Filter;
pub use memory::{MemoryRelay, RelayConfig};
pub use traits::{RelayClient, Subscription};
