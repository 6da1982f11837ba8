//! Search service
//!
//! Keeps a replica of every auction, fed by the auction event stream and
//! topped up at startup by a catch-up pull from the auction service.

pub mod config;
pub mod consumer;
pub mod db;
pub mod health;
pub mod models;
pub mod repos;
pub mod routes;
pub mod store;
pub mod sync;

use event_bus::{BusError, EventBus};
use event_consumer::{ConsumerRegistry, Dispatcher, DispatcherConfig, DispatcherHandle};
use std::sync::Arc;

use crate::consumer::{register_replica_consumers, ReplicaProjector};
use crate::store::ReplicaStore;

pub const SERVICE_NAME: &str = "search";

/// Register the replica consumers and start delivering to them
pub async fn start_replica_consumers(
    bus: Arc<dyn EventBus>,
    store: Arc<dyn ReplicaStore>,
    config: DispatcherConfig,
) -> Result<DispatcherHandle, BusError> {
    let mut registry = ConsumerRegistry::new(SERVICE_NAME);
    register_replica_consumers(&mut registry, Arc::new(ReplicaProjector::new(store)))
        .map_err(|e| BusError::SubscribeError(e.to_string()))?;

    Dispatcher::start(bus, registry, config).await
}
