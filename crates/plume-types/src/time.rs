use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Signer-supplied creation time, in whole seconds since the UNIX epoch.
///
/// Timestamps come from whichever client signed an event. They are neither
/// monotonic nor unique across clients, so two versions of a document may
/// carry the same value.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from seconds since the UNIX epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    /// Seconds since the UNIX epoch.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by `secs`, saturating.
    pub const fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub const fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Convert to a UTC date-time. Out-of-range values clamp to the epoch.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        i64::try_from(self.0)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(u64::try_from(value.timestamp()).unwrap_or(0))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of "now" for authoring. Injected so saves can be tested at fixed
/// instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock [`Clock`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven [`Clock`] for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.as_secs()),
        }
    }

    pub fn set(&self, to: Timestamp) {
        self.secs.store(to.as_secs(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) -> Timestamp {
        let prev = self.secs.fetch_add(secs, Ordering::SeqCst);
        Timestamp::from_secs(prev + secs)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_produces_reasonable_timestamp() {
        // After 2020-01-01.
        assert!(Timestamp::now().as_secs() > 1_577_836_800);
    }

    #[test]
    fn ordering_by_seconds() {
        assert!(Timestamp::from_secs(100) < Timestamp::from_secs(200));
    }

    #[test]
    fn secs_since_saturates() {
        let a = Timestamp::from_secs(10);
        let b = Timestamp::from_secs(25);
        assert_eq!(b.secs_since(a), 15);
        assert_eq!(a.secs_since(b), 0);
    }

    #[test]
    fn datetime_roundtrip() {
        let ts = Timestamp::from_secs(1_700_000_000);
        assert_eq!(Timestamp::from(ts.to_datetime()), ts);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&Timestamp::from_secs(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Timestamp::from_secs(100));
        assert_eq!(clock.now(), Timestamp::from_secs(100));
        assert_eq!(clock.advance(4), Timestamp::from_secs(104));
        clock.set(Timestamp::from_secs(7));
        assert_eq!(clock.now(), Timestamp::from_secs(7));
    }
}
