pub mod search;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::health::health;
use crate::store::ReplicaStore;

pub fn router(store: Arc<dyn ReplicaStore>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/search", get(search::search_items))
        .with_state(store)
}
