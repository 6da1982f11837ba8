//! Authoritative auction service
//!
//! Owns auction records. Every committed change lands in the outbox in the
//! same write and is published by the relay task; faults reported by
//! downstream consumers of `auction.created` are compensated or escalated by
//! the fault consumer.

pub mod alert;
pub mod config;
pub mod consumer;
pub mod db;
pub mod events;
pub mod health;
pub mod models;
pub mod repos;
pub mod routes;
pub mod services;
pub mod store;

use event_bus::{BusError, EventBus};
use event_consumer::{ConsumerRegistry, Dispatcher, DispatcherConfig, DispatcherHandle};
use std::sync::Arc;

use crate::alert::AlertSink;
use crate::consumer::AuctionCreatedFaultConsumer;
use crate::events::EventPublisher;

pub const SERVICE_NAME: &str = "auction";

/// Register the fault consumer and start delivering to it
pub async fn start_fault_consumer(
    bus: Arc<dyn EventBus>,
    alerts: Arc<dyn AlertSink>,
    config: DispatcherConfig,
) -> Result<DispatcherHandle, BusError> {
    let mut registry = ConsumerRegistry::new(SERVICE_NAME);
    registry
        .register(AuctionCreatedFaultConsumer::new(
            EventPublisher::new(bus.clone()),
            alerts,
        ))
        .map_err(|e| BusError::SubscribeError(e.to_string()))?;

    Dispatcher::start(bus, registry, config).await
}
