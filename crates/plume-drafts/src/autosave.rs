use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use plume_types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::coordinator::{DraftCoordinator, SaveMode, SaveReceipt};
use crate::error::Result;
use crate::schema::DraftContent;

/// Autosave thresholds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Edits needed before a checkpoint is taken early.
    pub change_threshold: u32,
    /// Minimum gap between checkpoints taken on the change threshold.
    pub min_interval_secs: u64,
    /// An unsaved edit older than this is checkpointed regardless.
    pub fallback_interval_secs: u64,
    /// How often the driver checks the policy.
    pub tick_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            change_threshold: 2,
            min_interval_secs: 3,
            fallback_interval_secs: 30,
            tick_ms: 500,
        }
    }
}

/// Debounce state deciding when an autosave checkpoint is due.
///
/// A checkpoint is due when enough edits have accumulated and the last save
/// is not too recent, or when the oldest unsaved edit has waited for the
/// fallback interval. Any save, manual or automatic, resets it.
#[derive(Clone, Debug)]
pub struct AutosavePolicy {
    config: AutosaveConfig,
    pending: u32,
    first_pending: Option<Timestamp>,
    last_saved: Timestamp,
}

impl AutosavePolicy {
    pub fn new(config: AutosaveConfig, now: Timestamp) -> Self {
        Self {
            config,
            pending: 0,
            first_pending: None,
            last_saved: now,
        }
    }

    pub fn record_change(&mut self, now: Timestamp) {
        self.pending = self.pending.saturating_add(1);
        self.first_pending.get_or_insert(now);
    }

    pub fn due(&self, now: Timestamp) -> bool {
        let Some(first_pending) = self.first_pending else {
            return false;
        };
        let by_count = self.pending >= self.config.change_threshold
            && now.secs_since(self.last_saved) >= self.config.min_interval_secs;
        let by_time = now.secs_since(first_pending) >= self.config.fallback_interval_secs;
        by_count || by_time
    }

    pub fn mark_saved(&mut self, now: Timestamp) {
        self.pending = 0;
        self.first_pending = None;
        self.last_saved = now;
    }

    /// Put back `unsaved` edits claimed by a save that then failed. They stay
    /// pending, timed from the failed attempt.
    pub fn restore(&mut self, unsaved: u32) {
        if unsaved == 0 {
            return;
        }
        self.pending = self.pending.saturating_add(unsaved);
        self.first_pending = Some(self.last_saved);
    }

    pub fn pending_changes(&self) -> u32 {
        self.pending
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }
}

struct Buffer {
    policy: AutosavePolicy,
    content: Option<DraftContent>,
}

/// Edits and content taken out of the buffer by an in-flight save.
struct Claim {
    pending: u32,
    content: Option<DraftContent>,
}

impl Buffer {
    fn claim(&mut self, now: Timestamp) -> Claim {
        let claim = Claim {
            pending: self.policy.pending_changes(),
            content: self.content.take(),
        };
        self.policy.mark_saved(now);
        claim
    }

    /// Hand back what a failed save claimed. Content edited since wins.
    fn release(&mut self, claim: Claim) {
        self.policy.restore(claim.pending);
        if self.content.is_none() {
            self.content = claim.content;
        }
    }
}

/// Takes autosave checkpoints of one draft in the background.
///
/// The editor reports every edit through [`AutosaveDriver::edit`]; a tokio
/// interval polls the policy and checkpoints the latest content when due.
/// The task stops when the driver is dropped.
pub struct AutosaveDriver {
    coordinator: DraftCoordinator,
    identifier: String,
    mode: SaveMode,
    buffer: Arc<Mutex<Buffer>>,
    task: JoinHandle<()>,
}

impl AutosaveDriver {
    pub fn start(
        coordinator: DraftCoordinator,
        identifier: impl Into<String>,
        mode: SaveMode,
        config: AutosaveConfig,
    ) -> Self {
        let identifier = identifier.into();
        let tick = Duration::from_millis(config.tick_ms.max(1));
        let buffer = Arc::new(Mutex::new(Buffer {
            policy: AutosavePolicy::new(config, coordinator.now()),
            content: None,
        }));

        let task = tokio::spawn(tick_loop(
            coordinator.clone(),
            identifier.clone(),
            mode.clone(),
            Arc::clone(&buffer),
            tick,
        ));
        debug!(identifier = %identifier, "autosave started");

        Self {
            coordinator,
            identifier,
            mode,
            buffer,
            task,
        }
    }

    /// Record an edit; `content` is what a checkpoint would save.
    pub fn edit(&self, content: DraftContent) {
        let now = self.coordinator.now();
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.policy.record_change(now);
        buffer.content = Some(content);
    }

    /// Manual save of `content`. Restarts the autosave timer; if the save
    /// fails the unsaved edits stay pending.
    pub async fn save_now(&self, content: DraftContent) -> Result<SaveReceipt> {
        let claim = self
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .claim(self.coordinator.now());
        let result = self
            .coordinator
            .manual_save(&content, &self.identifier, &self.mode)
            .await;
        if result.is_err() {
            self.buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .release(claim);
        }
        result
    }

    pub fn pending_changes(&self) -> u32 {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .policy
            .pending_changes()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl Drop for AutosaveDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn tick_loop(
    coordinator: DraftCoordinator,
    identifier: String,
    mode: SaveMode,
    buffer: Arc<Mutex<Buffer>>,
    tick: Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    loop {
        ticker.tick().await;
        let now = coordinator.now();
        let due = {
            let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if buffer.policy.due(now) {
                Some(buffer.claim(now))
            } else {
                None
            }
        };
        let Some(mut claim) = due else { continue };
        let Some(content) = claim.content.take() else { continue };

        match coordinator.autosave_checkpoint(&content, &identifier, &mode).await {
            Ok(receipt) => debug!(identifier = %identifier, version = %receipt.version, "autosaved"),
            Err(err) => {
                warn!(identifier = %identifier, error = %err, "autosave failed");
                claim.content = Some(content);
                buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .release(claim);
            }
        }
    }
}
