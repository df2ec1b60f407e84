//! Scheduled publication for Plume.
//!
//! A post is scheduled by signing it in advance, with its publish time as
//! `created_at`, and sending it to a scheduler service inside an encrypted
//! schedule request (kind 5905). Requests are versioned and deleted with the
//! same reconciliation rules as drafts.
//!
//! Two payload shapes exist on relays. Both decode into
//! [`SchedulePayload`] and resolve to the same [`ScheduledPublication`].

pub mod error;
pub mod payload;
pub mod scheduler;
pub mod schema;

pub use error::{Result, ScheduleError};
pub use payload::{SchedulePayload, ScheduledPublication};
pub use scheduler::{ScheduleReceipt, Scheduler};
pub use schema::ScheduleSchema;
