//! The search service catches up over HTTP from the auction service's query
//! endpoint, then keeps converging once live events resume.
//!
//! Run with: cargo test -p e2e-tests --test catch_up_e2e

mod common;

use auction_rs::models::UpdateAuctionRequest;
use auction_rs::routes::router;
use common::{create_request, Pipeline};
use search_rs::store::ReplicaStore;
use search_rs::sync::{AuctionServiceClient, CatchUpSynchronizer};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

async fn serve_auction_api(pipeline: &Pipeline) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(pipeline.auctions.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
#[serial]
async fn test_catch_up_fills_replica_then_live_events_converge() {
    let pipeline = Pipeline::start().await;
    let base_url = serve_auction_api(&pipeline).await;

    // Changes made while the search service was away: nothing relayed
    let mut ids = Vec::new();
    for make in ["Ford", "Audi", "Bugatti"] {
        ids.push(pipeline.auctions.create(create_request(make)).await.unwrap().id);
    }

    let sync = CatchUpSynchronizer::new(
        pipeline.replica.clone(),
        Arc::new(AuctionServiceClient::new(base_url).unwrap()),
    );

    let report = sync.run_at_startup().await.unwrap();
    assert_eq!(report.watermark, None);
    assert_eq!(report.applied, 3);
    assert_eq!(pipeline.replica.count().await.unwrap(), 3);

    // A later change is picked up from the watermark, not re-fetched in full
    tokio::time::sleep(Duration::from_millis(5)).await;
    pipeline
        .auctions
        .update(
            ids[0],
            UpdateAuctionRequest {
                make: Some("Ferrari".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let report = sync.run_at_startup().await.unwrap();
    assert!(report.watermark.is_some());
    assert_eq!(report.fetched, 1);
    assert_eq!(report.applied, 1);
    let item = pipeline.replica.get(ids[0]).await.unwrap().unwrap();
    assert_eq!(item.make, "Ferrari");
    assert_eq!(item.version, 2);

    // The backlog finally relays; the stale Created must not roll anything back
    assert_eq!(pipeline.relay().await, 4);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let item = pipeline.replica.get(ids[0]).await.unwrap().unwrap();
    assert_eq!(item.make, "Ferrari");
    assert_eq!(item.version, 2);
    assert_eq!(pipeline.replica.count().await.unwrap(), 3);
    assert_eq!(pipeline.alerts.count(), 0);

    pipeline.shutdown();
}

#[tokio::test]
#[serial]
async fn test_unreachable_auction_service_leaves_replica_to_live_events() {
    let pipeline = Pipeline::start().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let sync = CatchUpSynchronizer::new(
        pipeline.replica.clone(),
        Arc::new(AuctionServiceClient::new(base_url).unwrap()),
    );
    assert!(sync.run_at_startup().await.is_none());

    let auction = pipeline.auctions.create(create_request("Ford")).await.unwrap();
    pipeline.relay().await;
    assert!(pipeline.replica_eventually(auction.id, |i| i.is_some()).await);

    pipeline.shutdown();
}
