use async_trait::async_trait;
use plume_types::SignedEvent;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::filter::Filter;

/// Connection to the relays that hold a user's events.
///
/// Delivery is at-least-once and unordered: a subscription yields stored
/// events first, then live ones, and the same event may arrive more than once.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Publish a signed event.
    async fn publish(&self, event: &SignedEvent) -> Result<()>;

    /// Open a subscription delivering stored and live events matching `filter`.
    async fn subscribe(&self, filter: Filter) -> Result<Subscription>;
}

/// Stream of events delivered for one filter.
#[derive(Debug)]
pub struct Subscription {
    filter: Filter,
    receiver: mpsc::Receiver<SignedEvent>,
}

impl Subscription {
    pub fn new(filter: Filter, receiver: mpsc::Receiver<SignedEvent>) -> Self {
        Self { filter, receiver }
    }

    /// Next delivered event, or `None` once the relay side has closed.
    pub async fn recv(&mut self) -> Option<SignedEvent> {
        self.receiver.recv().await
    }

    /// Next already-buffered event, without waiting.
    pub fn try_recv(&mut self) -> Option<SignedEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}
