//! Catch-up synchronizer tests

mod common;

use axum::{extract::Query, routing::get, Json, Router};
use common::{at, created, deleted, snapshot, FakeSource};
use search_rs::consumer::ReplicaProjector;
use search_rs::store::{InMemoryReplicaStore, ReplicaStore};
use search_rs::sync::{AuctionServiceClient, AuctionSource, CatchUpSynchronizer, SyncError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[tokio::test]
async fn test_empty_replica_receives_every_auction() {
    let store = Arc::new(InMemoryReplicaStore::new());
    let snapshots: Vec<_> = ["Ford", "Audi", "Bugatti"]
        .iter()
        .enumerate()
        .map(|(i, make)| snapshot(Uuid::new_v4(), make, i as i64 + 1))
        .collect();
    let source = Arc::new(FakeSource::new(snapshots));

    let report = CatchUpSynchronizer::new(store.clone(), source.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.watermark, None);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.applied, 3);
    assert_eq!(store.count().await.unwrap(), 3);
    assert_eq!(*source.requests.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn test_second_run_uses_watermark_and_adds_no_duplicates() {
    let store = Arc::new(InMemoryReplicaStore::new());
    let old = snapshot(Uuid::new_v4(), "Ford", 1);
    let newer = snapshot(Uuid::new_v4(), "Audi", 5);
    let source = Arc::new(FakeSource::new(vec![old, newer]));
    let sync = CatchUpSynchronizer::new(store.clone(), source.clone());

    sync.run().await.unwrap();
    let second = sync.run().await.unwrap();

    assert_eq!(second.watermark, Some(at(5)));
    assert_eq!(second.fetched, 0);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(source.requests.lock().unwrap()[1], Some(at(5)));
}

#[tokio::test]
async fn test_only_changes_after_watermark_are_pulled() {
    let store = Arc::new(InMemoryReplicaStore::new());
    let projector = ReplicaProjector::new(store.clone());
    let known = Uuid::new_v4();
    projector.on_created(&created(known, "Ford", 3)).await.unwrap();

    let fresh = Uuid::new_v4();
    let source = Arc::new(FakeSource::new(vec![
        snapshot(known, "Ford", 3),
        snapshot(fresh, "Audi", 4),
    ]));

    let report = CatchUpSynchronizer::new(store.clone(), source)
        .run()
        .await
        .unwrap();

    assert_eq!(report.watermark, Some(at(3)));
    assert_eq!(report.fetched, 1);
    assert!(store.get(fresh).await.unwrap().is_some());
}

#[tokio::test]
async fn test_catch_up_respects_deletions_and_newer_versions() {
    let store = Arc::new(InMemoryReplicaStore::new());
    let projector = ReplicaProjector::new(store.clone());

    let gone = Uuid::new_v4();
    projector.on_created(&created(gone, "Ford", 1)).await.unwrap();
    projector.on_deleted(&deleted(gone, 2)).await.unwrap();

    let ahead = Uuid::new_v4();
    let mut newer = created(ahead, "Ferrari", 6);
    newer.updated_at = at(0);
    projector.on_created(&newer).await.unwrap();

    let mut stale_gone = snapshot(gone, "Ford", 1);
    stale_gone.updated_at = at(30);
    let mut stale_ahead = snapshot(ahead, "Fiat", 4);
    stale_ahead.updated_at = at(30);
    let source = Arc::new(FakeSource::new(vec![stale_gone, stale_ahead]));

    let report = CatchUpSynchronizer::new(store.clone(), source)
        .run()
        .await
        .unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 2);
    assert!(store.get(gone).await.unwrap().is_none());
    assert_eq!(store.get(ahead).await.unwrap().unwrap().make, "Ferrari");
}

#[tokio::test]
async fn test_invalid_snapshots_are_skipped() {
    let store = Arc::new(InMemoryReplicaStore::new());
    let source = Arc::new(FakeSource::new(vec![
        snapshot(Uuid::new_v4(), "", 1),
        snapshot(Uuid::new_v4(), "Ford", 2),
    ]));

    let report = CatchUpSynchronizer::new(store.clone(), source)
        .run()
        .await
        .unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_unreachable_source_does_not_fail_startup() {
    let store = Arc::new(InMemoryReplicaStore::new());
    let sync = CatchUpSynchronizer::new(store.clone(), Arc::new(FakeSource::failing()));

    assert!(matches!(sync.run().await, Err(SyncError::Status { status: 503, .. })));
    assert!(sync.run_at_startup().await.is_none());
    assert_eq!(store.count().await.unwrap(), 0);
}

// ============================================================================
// HTTP client
// ============================================================================

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn auction_json(id: Uuid) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "reserve_price": 20000,
        "seller": "bob",
        "winner": null,
        "sold_amount": null,
        "current_high_bid": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:05:00Z",
        "auction_end": "2024-01-11T00:00:00Z",
        "status": "Live",
        "make": "Ford",
        "model": "GT",
        "year": 2020,
        "color": "White",
        "mileage": 50000,
        "image_url": "https://cdn.example.com/gt.jpg",
        "version": 2
    })
}

#[tokio::test]
async fn test_client_sends_watermark_and_decodes_auctions() {
    let id = Uuid::new_v4();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let router = Router::new().route(
        "/api/auctions",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let recorded = recorded.clone();
            async move {
                recorded.lock().unwrap().push(params.get("date").cloned());
                Json(vec![auction_json(id)])
            }
        }),
    );
    let client = AuctionServiceClient::new(serve(router).await).unwrap();

    let all = client.fetch_updated_since(None).await.unwrap();
    let since = client.fetch_updated_since(Some(at(5))).await.unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].updated_at, at(5));
    assert_eq!(all[0].version, 2);
    assert_eq!(since, all);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], None);
    assert_eq!(seen[1].as_deref(), Some("2024-01-01T00:05:00Z"));
}

#[tokio::test]
async fn test_client_reports_error_status() {
    let router = Router::new().route(
        "/api/auctions",
        get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
    );
    let client = AuctionServiceClient::new(format!("{}/", serve(router).await)).unwrap();

    let err = client.fetch_updated_since(None).await.unwrap_err();

    assert!(matches!(err, SyncError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_startup_sync_over_http() {
    let id = Uuid::new_v4();
    let router = Router::new().route(
        "/api/auctions",
        get(move || async move { Json(vec![auction_json(id)]) }),
    );
    let client = AuctionServiceClient::new(serve(router).await).unwrap();
    let store = Arc::new(InMemoryReplicaStore::new());

    let report = CatchUpSynchronizer::new(store.clone(), Arc::new(client))
        .run_at_startup()
        .await
        .unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(store.get(id).await.unwrap().unwrap().make, "Ford");
}
