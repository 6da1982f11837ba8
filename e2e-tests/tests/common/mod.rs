//! Both services wired over one in-memory bus
//!
//! The auction service's outbox is relayed on demand with `relay()` instead of
//! the polling task, so each test controls exactly when events leave.

#![allow(dead_code)]

use async_trait::async_trait;
use auction_rs::alert::{AlertError, AlertSink, FaultAlert};
use auction_rs::events::{publish_batch, EventPublisher, RelayConfig};
use auction_rs::models::CreateAuctionRequest;
use auction_rs::services::AuctionService;
use auction_rs::store::InMemoryAuctionStore;
use auction_rs::start_fault_consumer;
use chrono::{Duration as ChronoDuration, Utc};
use event_bus::consumer_retry::RetryConfig;
use event_bus::{EventBus, InMemoryBus};
use event_consumer::{DispatcherConfig, DispatcherHandle};
use search_rs::models::Item;
use search_rs::start_replica_consumers;
use search_rs::store::{InMemoryReplicaStore, ReplicaStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn create_request(make: &str) -> CreateAuctionRequest {
    CreateAuctionRequest {
        make: make.to_string(),
        model: "GT".to_string(),
        year: 2020,
        color: "White".to_string(),
        mileage: 50000,
        image_url: "https://example.com/car.jpg".to_string(),
        reserve_price: 20000,
        auction_end: Utc::now() + ChronoDuration::days(10),
    }
}

/// Retries quickly so fault paths settle within a test
pub fn fast_dispatch() -> DispatcherConfig {
    DispatcherConfig {
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
        },
        max_in_flight: 4,
    }
}

/// Alert sink that remembers every escalation
#[derive(Default)]
pub struct RecordingAlertSink {
    pub alerts: Mutex<Vec<FaultAlert>>,
}

impl RecordingAlertSink {
    pub fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn escalate(&self, alert: &FaultAlert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

pub struct Pipeline {
    pub bus: Arc<dyn EventBus>,
    pub auctions: Arc<AuctionService>,
    pub auction_store: Arc<InMemoryAuctionStore>,
    pub publisher: EventPublisher,
    pub replica: Arc<InMemoryReplicaStore>,
    pub alerts: Arc<RecordingAlertSink>,
    handles: Vec<DispatcherHandle>,
}

impl Pipeline {
    pub async fn start() -> Self {
        init_tracing();

        let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
        let auction_store = Arc::new(InMemoryAuctionStore::new());
        let auctions = Arc::new(AuctionService::new(auction_store.clone(), "bob"));
        let replica = Arc::new(InMemoryReplicaStore::new());
        let alerts = Arc::new(RecordingAlertSink::default());

        let replica_handle = start_replica_consumers(bus.clone(), replica.clone(), fast_dispatch())
            .await
            .unwrap();
        let fault_handle = start_fault_consumer(bus.clone(), alerts.clone(), fast_dispatch())
            .await
            .unwrap();

        Self {
            publisher: EventPublisher::new(bus.clone()),
            bus,
            auctions,
            auction_store,
            replica,
            alerts,
            handles: vec![replica_handle, fault_handle],
        }
    }

    /// Publish everything pending in the auction outbox
    pub async fn relay(&self) -> usize {
        publish_batch(
            self.auction_store.as_ref(),
            &self.publisher,
            &RelayConfig::default(),
        )
        .await
        .unwrap()
    }

    /// Publish every outbox entry again, as a broker redelivering would
    pub async fn redeliver_all(&self) {
        for entry in self.auction_store.outbox_entries().await {
            let bytes = serde_json::to_vec(&entry.payload).unwrap();
            self.publisher.publish_raw(&entry.event_type, bytes).await.unwrap();
        }
    }

    /// Poll the replica record for `id` until `check` holds or two seconds pass
    pub async fn replica_eventually(&self, id: Uuid, check: impl Fn(Option<Item>) -> bool) -> bool {
        for _ in 0..200 {
            if check(self.replica.get(id).await.unwrap()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Poll until `n` alerts were raised or two seconds pass
    pub async fn alerts_eventually(&self, n: usize) -> bool {
        for _ in 0..200 {
            if self.alerts.count() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    pub fn shutdown(self) {
        for handle in self.handles {
            handle.shutdown();
        }
    }
}
