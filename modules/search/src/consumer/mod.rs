pub mod auction_consumers;
pub mod projector;

pub use auction_consumers::{AuctionCreatedConsumer, AuctionDeletedConsumer, AuctionUpdatedConsumer};
pub use projector::{ApplyOutcome, ReplicaProjector};

use event_consumer::{ConsumerRegistry, RegistryError};
use std::sync::Arc;

/// Register one consumer per auction event type, all feeding `projector`
pub fn register_replica_consumers(
    registry: &mut ConsumerRegistry,
    projector: Arc<ReplicaProjector>,
) -> Result<(), RegistryError> {
    registry
        .register(AuctionCreatedConsumer::new(projector.clone()))?
        .register(AuctionUpdatedConsumer::new(projector.clone()))?
        .register(AuctionDeletedConsumer::new(projector))?;
    Ok(())
}
