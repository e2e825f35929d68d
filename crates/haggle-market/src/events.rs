use std::sync::Arc;

use async_trait::async_trait;
use haggle_types::MarketEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fan-out of market events to any number of subscribers.
///
/// Publishing never blocks and never fails; with no subscribers events are dropped.
/// Slow subscribers may miss events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn with_defaults() -> Self {
        Self::new(256)
    }

    pub fn publish(&self, event: MarketEvent) {
        debug!(chat_id = event.chat_id(), ?event, "Publishing market event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// External consumer of market events (push delivery, badges, toasts)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: MarketEvent);
}

/// Forward every event on `bus` to `sink` until the bus closes
pub fn spawn_sink(bus: &EventBus, sink: Arc<dyn NotificationSink>) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => sink.notify(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification sink lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
