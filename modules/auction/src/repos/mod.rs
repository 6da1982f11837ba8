pub mod auction_repo;
pub mod failed_repo;
pub mod outbox_repo;
pub mod pg_store;

pub use pg_store::PgAuctionStore;
