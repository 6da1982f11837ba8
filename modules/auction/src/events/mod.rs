pub mod outbox;
pub mod publisher;

pub use outbox::{OutboxEntry, OutboxStatus};
pub use publisher::{new_envelope, publish_batch, run_publisher_task, EventPublisher, RelayConfig};
