use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::client::AuctionSource;
use super::SyncError;
use crate::models::Item;
use crate::store::ReplicaStore;

/// Result of one catch-up run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub watermark: Option<DateTime<Utc>>,
    pub fetched: usize,
    pub applied: usize,
    /// Stale, deleted or invalid snapshots left out
    pub skipped: usize,
}

/// Pulls auctions changed since the replica's watermark from the auction
/// service and writes them through the same version guard as live events
pub struct CatchUpSynchronizer {
    store: Arc<dyn ReplicaStore>,
    source: Arc<dyn AuctionSource>,
}

impl CatchUpSynchronizer {
    pub fn new(store: Arc<dyn ReplicaStore>, source: Arc<dyn AuctionSource>) -> Self {
        Self { store, source }
    }

    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let watermark = self.store.max_updated_at().await?;
        let snapshots = self.source.fetch_updated_since(watermark).await?;

        let mut report = SyncReport {
            watermark,
            fetched: snapshots.len(),
            ..SyncReport::default()
        };

        for snapshot in snapshots {
            let item = Item::from(snapshot);
            if let Err(reason) = item.validate() {
                tracing::warn!(auction_id = %item.id, reason = %reason, "Skipping invalid auction");
                report.skipped += 1;
                continue;
            }

            if self.store.upsert(&item).await? {
                report.applied += 1;
            } else {
                report.skipped += 1;
            }
        }

        Ok(report)
    }

    /// Run once at startup; failures are logged and the service carries on
    /// with live event delivery
    pub async fn run_at_startup(&self) -> Option<SyncReport> {
        match self.run().await {
            Ok(report) => {
                tracing::info!(
                    watermark = ?report.watermark,
                    fetched = report.fetched,
                    applied = report.applied,
                    skipped = report.skipped,
                    "Catch-up synchronization finished"
                );
                Some(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Catch-up synchronization failed, relying on live events");
                None
            }
        }
    }
}
