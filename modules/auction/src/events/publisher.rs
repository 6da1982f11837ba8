use auction_contracts::{subject_for, DomainEvent, SOURCE_MODULE};
use event_bus::{BusError, EventBus, EventEnvelope};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::outbox::OutboxStatus;
use crate::store::{AuctionStore, StoreError};

/// Envelope for an event raised by this service
///
/// The auction id doubles as correlation id so every event of one auction
/// can be traced together.
pub fn new_envelope<E: DomainEvent>(event: E) -> EventEnvelope<E> {
    let correlation_id = event.auction_id().to_string();
    EventEnvelope::new(E::EVENT_TYPE.to_string(), SOURCE_MODULE.to_string(), event)
        .with_source_version(env!("CARGO_PKG_VERSION").to_string())
        .with_correlation_id(Some(correlation_id))
}

/// Sends envelopes to the subject of their event type
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Publish an envelope; `Err` means the broker could not take it
    pub async fn publish<T: Serialize>(&self, envelope: &EventEnvelope<T>) -> Result<(), BusError> {
        let bytes =
            serde_json::to_vec(envelope).map_err(|e| BusError::SerializationError(e.to_string()))?;
        self.publish_raw(&envelope.event_type, bytes).await
    }

    /// Publish an already serialized envelope of `event_type`
    pub async fn publish_raw(&self, event_type: &str, bytes: Vec<u8>) -> Result<(), BusError> {
        let subject = subject_for(event_type);
        self.bus.publish(&subject, bytes).await
    }
}

/// Outbox relay settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    /// Failed publishes after which an entry is given up on
    pub max_publish_retries: i32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 100,
            max_publish_retries: 5,
        }
    }
}

impl RelayConfig {
    /// Defaults, with the poll interval overridable via `OUTBOX_POLL_INTERVAL_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let poll_interval = std::env::var("OUTBOX_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        Self {
            poll_interval,
            ..defaults
        }
    }
}

/// Background task that publishes events from the outbox to the event bus
///
/// Polls the store for pending entries and publishes them in creation order.
/// Once published, entries are marked with a published_at timestamp.
pub async fn run_publisher_task(
    store: Arc<dyn AuctionStore>,
    publisher: EventPublisher,
    config: RelayConfig,
) {
    tracing::info!(
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Starting event publisher task"
    );

    let mut interval = tokio::time::interval(config.poll_interval);
    let mut tick_count: u64 = 0;

    loop {
        interval.tick().await;
        tick_count += 1;

        match publish_batch(store.as_ref(), &publisher, &config).await {
            Ok(count) if count > 0 => {
                tracing::info!("Publisher tick {}: published {} events from outbox", tick_count, count);
            }
            Ok(_) => {
                if tick_count <= 3 || tick_count % 60 == 0 {
                    tracing::debug!("Publisher tick {}: no unpublished events", tick_count);
                }
            }
            Err(e) => {
                tracing::error!("Publisher tick {}: error publishing events: {}", tick_count, e);
            }
        }
    }
}

/// Publish one batch of pending entries, returning how many were published
///
/// Stops at the first entry the broker refuses so later events of the same
/// auction do not overtake it.
pub async fn publish_batch(
    store: &dyn AuctionStore,
    publisher: &EventPublisher,
    config: &RelayConfig,
) -> Result<usize, StoreError> {
    let entries = store.fetch_pending(config.batch_size).await?;
    let mut published = 0;

    for entry in entries {
        let bytes = serde_json::to_vec(&entry.payload)?;

        if let Err(e) = publisher.publish_raw(&entry.event_type, bytes).await {
            let status = store
                .record_publish_failure(entry.id, &e.to_string(), config.max_publish_retries)
                .await?;

            if status == OutboxStatus::Failed {
                tracing::error!(
                    event_id = %entry.event_id,
                    event_type = %entry.event_type,
                    aggregate_id = %entry.aggregate_id,
                    retries = entry.retry_count + 1,
                    error = %e,
                    "Giving up on outbox entry after repeated publish failures"
                );
                continue;
            }

            tracing::warn!(
                event_id = %entry.event_id,
                event_type = %entry.event_type,
                error = %e,
                "Failed to publish event, will retry"
            );
            break;
        }

        store.mark_published(entry.id).await?;
        published += 1;

        tracing::info!(
            event_id = %entry.event_id,
            event_type = %entry.event_type,
            aggregate_id = %entry.aggregate_id,
            "Event published successfully"
        );
    }

    Ok(published)
}
