pub mod fault_consumer;

pub use fault_consumer::{compensation_policy, AuctionCreatedFaultConsumer, Compensation};
