//! Foundation types for Plume.
//!
//! This crate provides the identity, temporal, and wire types shared by every
//! other Plume crate: the signed event shape exchanged with relays, and the
//! logical identifiers that group event versions into documents.
//!
//! # Key Types
//!
//! - [`EventId`]: Content-derived event identifier
//! - [`PublicKey`]: Author / counterparty key
//! - [`Timestamp`]: Signer-supplied creation time (seconds)
//! - [`Kind`]: Event kind discriminator
//! - [`Tag`]: Event tag (`["d", "..."]`, `["e", "..."]`, ...)
//! - [`Coordinate`]: `kind:author:identifier` address of a replaceable event
//! - [`LogicalId`]: Stable identifier grouping all versions of a document
//! - [`UnsignedEvent`] / [`SignedEvent`]: Event before and after signing

pub mod error;
pub mod event;
mod hex_serde;
pub mod id;
pub mod key;
pub mod kind;
pub mod logical;
pub mod tag;
pub mod time;

pub use error::TypeError;
pub use event::{Sig, SignedEvent, UnsignedEvent};
pub use id::EventId;
pub use key::PublicKey;
pub use kind::Kind;
pub use logical::LogicalId;
pub use tag::{Coordinate, Tag};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
