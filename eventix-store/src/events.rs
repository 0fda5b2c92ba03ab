use async_trait::async_trait;
use eventix_core::repository::{CatalogPublisher, RepoResult};
use eventix_shared::CatalogChange;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

/// Publishes catalog changes to a Kafka topic, keyed by event id.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    topic: String,
}

impl EventProducer {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer, topic: topic.to_string() })
    }
}

#[async_trait]
impl CatalogPublisher for EventProducer {
    async fn publish(&self, change: &CatalogChange) -> RepoResult<()> {
        let key = change.event_id().to_string();
        let payload = serde_json::to_string(change)?;
        let record = FutureRecord::to(&self.topic)
            .key(&key)
            .payload(&payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent {} to {}/{}: partition {} offset {}",
                    change.name(), self.topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send {} to {}: {}", change.name(), self.topic, e);
                Err(e.into())
            }
        }
    }
}
