use async_trait::async_trait;
use auction_contracts::{
    AuctionCreated, AuctionDeleted, AuctionUpdated, AUCTION_CREATED, AUCTION_DELETED,
    AUCTION_UPDATED,
};
use event_consumer::{ConsumeContext, Consumer, ConsumerError};
use std::sync::Arc;

use super::projector::{ApplyOutcome, ReplicaProjector};

fn log_outcome(consumer: &str, auction_id: uuid::Uuid, version: i64, attempt: u32, outcome: ApplyOutcome) {
    match outcome {
        ApplyOutcome::Applied => tracing::info!(
            consumer,
            auction_id = %auction_id,
            version,
            attempt,
            outcome = outcome.as_str(),
            "Replica updated"
        ),
        _ => tracing::debug!(
            consumer,
            auction_id = %auction_id,
            version,
            attempt,
            outcome = outcome.as_str(),
            "Replica left unchanged"
        ),
    }
}

pub struct AuctionCreatedConsumer {
    projector: Arc<ReplicaProjector>,
}

impl AuctionCreatedConsumer {
    pub fn new(projector: Arc<ReplicaProjector>) -> Self {
        Self { projector }
    }
}

#[async_trait]
impl Consumer for AuctionCreatedConsumer {
    type Message = AuctionCreated;

    fn name(&self) -> &str {
        "search-auction-created"
    }

    fn event_type(&self) -> String {
        AUCTION_CREATED.to_string()
    }

    async fn consume(&self, ctx: ConsumeContext<AuctionCreated>) -> Result<(), ConsumerError> {
        let event = ctx.message();
        let outcome = self.projector.on_created(event).await?;
        log_outcome(self.name(), event.id, event.version, ctx.attempt, outcome);
        Ok(())
    }
}

pub struct AuctionUpdatedConsumer {
    projector: Arc<ReplicaProjector>,
}

impl AuctionUpdatedConsumer {
    pub fn new(projector: Arc<ReplicaProjector>) -> Self {
        Self { projector }
    }
}

#[async_trait]
impl Consumer for AuctionUpdatedConsumer {
    type Message = AuctionUpdated;

    fn name(&self) -> &str {
        "search-auction-updated"
    }

    fn event_type(&self) -> String {
        AUCTION_UPDATED.to_string()
    }

    async fn consume(&self, ctx: ConsumeContext<AuctionUpdated>) -> Result<(), ConsumerError> {
        let event = ctx.message();
        let outcome = self.projector.on_updated(event).await?;
        log_outcome(self.name(), event.id, event.version, ctx.attempt, outcome);
        Ok(())
    }
}

pub struct AuctionDeletedConsumer {
    projector: Arc<ReplicaProjector>,
}

impl AuctionDeletedConsumer {
    pub fn new(projector: Arc<ReplicaProjector>) -> Self {
        Self { projector }
    }
}

#[async_trait]
impl Consumer for AuctionDeletedConsumer {
    type Message = AuctionDeleted;

    fn name(&self) -> &str {
        "search-auction-deleted"
    }

    fn event_type(&self) -> String {
        AUCTION_DELETED.to_string()
    }

    async fn consume(&self, ctx: ConsumeContext<AuctionDeleted>) -> Result<(), ConsumerError> {
        let event = ctx.message();
        let outcome = self.projector.on_deleted(event).await?;
        log_outcome(self.name(), event.id, event.version, ctx.attempt, outcome);
        Ok(())
    }
}
