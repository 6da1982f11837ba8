pub mod auctions;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::health::health;
use crate::services::AuctionService;

pub fn router(service: Arc<AuctionService>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/auctions",
            get(auctions::list_auctions).post(auctions::create_auction),
        )
        .route(
            "/api/auctions/{id}",
            get(auctions::get_auction)
                .put(auctions::update_auction)
                .delete(auctions::delete_auction),
        )
        .with_state(service)
}
