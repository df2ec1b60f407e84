use std::sync::{Arc, Mutex, PoisonError};

use plume_crypto::EventSigner;
use plume_drafts::{
    new_identifier, AutosaveDriver, DraftCoordinator, DraftDocument, SaveMode, SaveStatus,
};
use plume_relay::{Filter, RelayClient};
use plume_schedule::{ScheduledPublication, Scheduler};
use plume_store::LogicalDocument;
use plume_types::{Clock, Kind, LogicalId, PublicKey, SystemClock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::PlumeConfig;
use crate::error::{SdkError, SdkResult};

/// Builder for [`Plume`].
pub struct PlumeBuilder {
    signer: Arc<dyn EventSigner>,
    relay: Arc<dyn RelayClient>,
    clock: Arc<dyn Clock>,
    config: PlumeConfig,
}

impl PlumeBuilder {
    pub fn with_config(mut self, config: PlumeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Plume {
        let drafts = DraftCoordinator::new(
            Arc::clone(&self.signer),
            Arc::clone(&self.relay),
            Arc::clone(&self.clock),
        );
        let scheduler = self.config.schedule.service_pubkey.map(|service| {
            Scheduler::new(
                Arc::clone(&self.signer),
                Arc::clone(&self.relay),
                Arc::clone(&self.clock),
                service,
            )
        });
        Plume {
            signer: self.signer,
            relay: self.relay,
            config: self.config,
            drafts,
            scheduler,
            tasks: Mutex::new(Vec::new()),
            starting: tokio::sync::Mutex::new(()),
        }
    }
}

/// Client state for one signed-in author.
///
/// Holds the draft and schedule stores, fed by relay subscriptions once
/// [`Plume::start`] is called and by local saves immediately. Instances are
/// fully independent; nothing is shared through globals.
pub struct Plume {
    signer: Arc<dyn EventSigner>,
    relay: Arc<dyn RelayClient>,
    config: PlumeConfig,
    drafts: DraftCoordinator,
    scheduler: Option<Scheduler>,
    tasks: Mutex<Vec<JoinHandle<usize>>>,
    starting: tokio::sync::Mutex<()>,
}

impl Plume {
    pub fn builder(signer: Arc<dyn EventSigner>, relay: Arc<dyn RelayClient>) -> PlumeBuilder {
        PlumeBuilder {
            signer,
            relay,
            clock: Arc::new(SystemClock),
            config: PlumeConfig::default(),
        }
    }

    pub fn author(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn config(&self) -> &PlumeConfig {
        &self.config
    }

    /// Subscribe to this author's drafts, proposals addressed to them, and
    /// their schedule requests. Calling it again, even concurrently, is a
    /// no-op.
    pub async fn start(&self) -> SdkResult<()> {
        let _starting = self.starting.lock().await;
        if !self.lock_tasks().is_empty() {
            return Ok(());
        }
        let me = self.author();
        let mut handles = Vec::new();

        let own = self
            .relay
            .subscribe(
                Filter::new()
                    .kinds([Kind::DRAFT, Kind::DRAFT_CHECKPOINT, Kind::DELETION])
                    .author(me),
            )
            .await?;
        let inbound = self
            .relay
            .subscribe(
                Filter::new()
                    .kinds([Kind::DRAFT, Kind::DRAFT_CHECKPOINT, Kind::DELETION])
                    .recipient(&me),
            )
            .await?;
        for subscription in [own, inbound] {
            let drafts = self.drafts.drafts().clone();
            handles.push(tokio::spawn(async move { drafts.run(subscription).await }));
        }

        if let Some(scheduler) = &self.scheduler {
            let subscription = self
                .relay
                .subscribe(
                    Filter::new()
                        .kinds([Kind::SCHEDULE, Kind::DELETION])
                        .author(me),
                )
                .await?;
            let schedules = scheduler.schedules().clone();
            handles.push(tokio::spawn(async move { schedules.run(subscription).await }));
        }

        info!(
            author = %me.short_id(),
            relays = ?self.config.relay.urls,
            subscriptions = handles.len(),
            "plume started"
        );
        self.lock_tasks().extend(handles);
        Ok(())
    }

    /// Stop consuming relay subscriptions. Local state is kept.
    pub fn stop(&self) {
        for handle in self.lock_tasks().drain(..) {
            handle.abort();
        }
    }

    pub fn drafts(&self) -> &DraftCoordinator {
        &self.drafts
    }

    pub fn scheduler(&self) -> SdkResult<&Scheduler> {
        self.scheduler.as_ref().ok_or(SdkError::NoSchedulerService)
    }

    /// Open a draft for editing with autosave. A new identifier is minted
    /// when none is given.
    pub fn open_draft(&self, identifier: Option<String>, mode: SaveMode) -> AutosaveDriver {
        AutosaveDriver::start(
            self.drafts.clone(),
            identifier.unwrap_or_else(new_identifier),
            mode,
            self.config.autosave.clone(),
        )
    }

    // -- selectors ---------------------------------------------------------

    /// This author's drafts, most recently updated first.
    pub fn my_drafts(&self) -> Vec<LogicalDocument<DraftDocument>> {
        self.drafts.my_drafts()
    }

    /// Drafts other authors have proposed to this one.
    pub fn proposals(&self) -> Vec<LogicalDocument<DraftDocument>> {
        let me = self.author();
        self.drafts
            .drafts()
            .documents()
            .into_iter()
            .filter(|doc| doc.logical_id.author != me)
            .collect()
    }

    pub fn draft(&self, logical_id: &LogicalId) -> Option<LogicalDocument<DraftDocument>> {
        self.drafts.drafts().document(logical_id)
    }

    pub fn scheduled(&self) -> Vec<LogicalDocument<ScheduledPublication>> {
        self.scheduler
            .as_ref()
            .map(Scheduler::upcoming)
            .unwrap_or_default()
    }

    /// Fires whenever the set of materialized drafts changes.
    pub fn watch_drafts(&self) -> watch::Receiver<u64> {
        self.drafts.drafts().subscribe()
    }

    pub fn watch_save_status(&self, logical_id: &LogicalId) -> watch::Receiver<SaveStatus> {
        self.drafts.status().subscribe(logical_id)
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<usize>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Plume {
    fn drop(&mut self) {
        self.stop();
    }
}
