use std::sync::Arc;

use async_trait::async_trait;
use eventix_core::repository::{CatalogPublisher, RepoResult};
use eventix_shared::CatalogChange;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// In-process fan-out to connected stream subscribers.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<CatalogChange>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogChange> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl CatalogPublisher for BroadcastPublisher {
    async fn publish(&self, change: &CatalogChange) -> RepoResult<()> {
        // No subscribers is not an error
        match self.tx.send(change.clone()) {
            Ok(receivers) => debug!("Broadcast {} to {} subscriber(s)", change.name(), receivers),
            Err(_) => debug!("Broadcast {} with no subscribers", change.name()),
        }
        Ok(())
    }
}

/// Delivers every change to each sink; one failing sink does not stop the rest.
#[derive(Default)]
pub struct FanOutPublisher {
    sinks: Vec<Arc<dyn CatalogPublisher>>,
}

impl FanOutPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn CatalogPublisher>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl CatalogPublisher for FanOutPublisher {
    async fn publish(&self, change: &CatalogChange) -> RepoResult<()> {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(change).await {
                warn!("Catalog sink failed for {}: {}", change.name(), e);
            }
        }
        Ok(())
    }
}
