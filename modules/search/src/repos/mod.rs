pub mod item_repo;
pub mod pg_store;

pub use pg_store::PgReplicaStore;
