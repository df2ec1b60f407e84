use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use plume_types::{EventId, Kind, SignedEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::filter::Filter;
use crate::traits::{RelayClient, Subscription};

/// Configuration for relay connections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay URLs to publish to and subscribe from.
    pub urls: Vec<String>,
    /// Capacity of per-subscription delivery channels.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            channel_capacity: 1024,
        }
    }
}

/// Internal subscriber: a filter paired with a delivery channel.
struct Subscriber {
    filter: Filter,
    sender: mpsc::Sender<SignedEvent>,
}

#[derive(Default)]
struct RelayState {
    events: Vec<SignedEvent>,
    seen: HashSet<EventId>,
    subscribers: Vec<Subscriber>,
}

/// In-process relay: stores events, honours deletions, fans out to
/// subscribers.
///
/// Events are verified before they are accepted. A deletion removes the
/// referenced events from storage when the deletion's author wrote them; the
/// deletion itself is kept so every subscriber still learns about it.
pub struct MemoryRelay {
    config: RelayConfig,
    state: RwLock<RelayState>,
    offline: AtomicBool,
}

impl MemoryRelay {
    pub fn new(config: RelayConfig) -> Self {
        info!(urls = ?config.urls, "memory relay started");
        Self {
            config,
            state: RwLock::new(RelayState::default()),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate losing connectivity: publishes fail while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stored events, in arrival order.
    pub fn stored(&self) -> Vec<SignedEvent> {
        self.state
            .read()
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.state
            .read()
            .map(|s| s.events.iter().any(|e| e.id == *id))
            .unwrap_or(false)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state
            .read()
            .map(|s| s.subscribers.iter().filter(|sub| !sub.sender.is_closed()).count())
            .unwrap_or(0)
    }

    /// Store `event` and return the channels it must be routed to.
    /// Returns `None` for an event already seen.
    fn accept(&self, event: &SignedEvent) -> Result<Option<Vec<mpsc::Sender<SignedEvent>>>> {
        let mut state = self.state.write().map_err(|_| RelayError::Poisoned)?;
        if !state.seen.insert(event.id) {
            return Ok(None);
        }

        if event.kind == Kind::DELETION {
            let targets: HashSet<EventId> = event.referenced_events().into_iter().collect();
            let before = state.events.len();
            state
                .events
                .retain(|e| !(targets.contains(&e.id) && e.pubkey == event.pubkey));
            let purged = before - state.events.len();
            if purged > 0 {
                debug!(id = %event.id, purged, "deletion purged stored events");
            }
        }
        state.events.push(event.clone());

        state.subscribers.retain(|sub| !sub.sender.is_closed());
        Ok(Some(
            state
                .subscribers
                .iter()
                .filter(|sub| sub.filter.matches(event))
                .map(|sub| sub.sender.clone())
                .collect(),
        ))
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

#[async_trait]
impl RelayClient for MemoryRelay {
    async fn publish(&self, event: &SignedEvent) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RelayError::Publish("relay unreachable".into()));
        }
        plume_crypto::verify_event(event).map_err(|e| RelayError::Rejected {
            id: event.id,
            reason: e.to_string(),
        })?;

        let Some(targets) = self.accept(event)? else {
            debug!(id = %event.id, "duplicate event ignored");
            return Ok(());
        };

        // Lock released; delivery may wait on slow subscribers.
        for sender in targets {
            if sender.send(event.clone()).await.is_err() {
                debug!(id = %event.id, "subscriber went away during delivery");
            }
        }
        debug!(id = %event.id, kind = %event.kind, "event published");
        Ok(())
    }

    async fn subscribe(&self, filter: Filter) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        let history: Vec<SignedEvent> = {
            let mut state = self.state.write().map_err(|_| RelayError::Poisoned)?;
            state.subscribers.push(Subscriber {
                filter: filter.clone(),
                sender: tx.clone(),
            });
            state
                .events
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect()
        };

        let subscription = Subscription::new(filter, rx);
        let mut backlog = history.into_iter();
        while let Some(event) = backlog.next() {
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    // The receiver is not handed out yet; finish on a task.
                    let rest: Vec<SignedEvent> = std::iter::once(event).chain(backlog).collect();
                    tokio::spawn(async move {
                        for event in rest {
                            if tx.send(event).await.is_err() {
                                warn!("subscription closed before history was delivered");
                                break;
                            }
                        }
                    });
                    break;
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }
        Ok(subscription)
    }
}
