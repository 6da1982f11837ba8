//! Postgres replica store tests
//!
//! ## Prerequisites
//! - PostgreSQL reachable at `DATABASE_URL`
//!
//! Run with `cargo test -p search-rs --test pg_replica_tests -- --ignored`

mod common;

use common::{at, created, deleted, full_update, get_test_pool, make_update};
use search_rs::consumer::{ApplyOutcome, ReplicaProjector};
use search_rs::models::{Item, SearchQuery, Tombstone};
use search_rs::repos::PgReplicaStore;
use search_rs::store::ReplicaStore;
use serial_test::serial;
use std::sync::Arc;
use uuid::Uuid;

async fn projector() -> (ReplicaProjector, Arc<PgReplicaStore>) {
    let store = Arc::new(PgReplicaStore::new(get_test_pool().await));
    (ReplicaProjector::new(store.clone()), store)
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_version_guard_in_sql() {
    let (p, store) = projector().await;
    let id = Uuid::new_v4();

    assert_eq!(p.on_created(&created(id, "Ford", 1)).await.unwrap(), ApplyOutcome::Applied);
    assert_eq!(p.on_created(&created(id, "Ford", 1)).await.unwrap(), ApplyOutcome::Applied);
    assert_eq!(p.on_updated(&make_update(id, "Ferrari", 3)).await.unwrap(), ApplyOutcome::Applied);

    let stale = Item::from(&created(id, "Fiat", 2));
    assert!(!store.upsert(&stale).await.unwrap());

    let item = store.get(id).await.unwrap().unwrap();
    assert_eq!(item.make, "Ferrari");
    assert_eq!(item.version, 3);
    assert_eq!(item.updated_at, at(3));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_tombstone_absorbs_and_newer_created_resurrects() {
    let (p, store) = projector().await;
    let id = Uuid::new_v4();
    p.on_created(&created(id, "Ford", 1)).await.unwrap();

    assert_eq!(p.on_deleted(&deleted(id, 2)).await.unwrap(), ApplyOutcome::Applied);
    assert_eq!(p.on_deleted(&deleted(id, 2)).await.unwrap(), ApplyOutcome::AlreadyAbsent);
    assert_eq!(
        p.on_updated(&full_update(id, "Ferrari", 5)).await.unwrap(),
        ApplyOutcome::Absorbed
    );

    // The guard holds in SQL even when the projector's pre-check is skipped
    assert!(!store.upsert(&Item::from(&created(id, "Ford", 2))).await.unwrap());
    assert!(store.get(id).await.unwrap().is_none());

    // A lower tombstone never replaces a higher one
    let stale = Tombstone {
        id,
        version: 1,
        deleted_at: at(1),
    };
    assert!(!store.remove(&stale).await.unwrap());
    assert_eq!(store.tombstone(id).await.unwrap().unwrap().version, 2);

    assert_eq!(p.on_created(&created(id, "Ford", 3)).await.unwrap(), ApplyOutcome::Applied);
    assert!(store.tombstone(id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_search_filters_and_pages() {
    let (p, store) = projector().await;
    let seller = format!("seller-{}", Uuid::new_v4());
    for make in ["Ford", "Audi", "Ferrari"] {
        let mut event = created(Uuid::new_v4(), make, 1);
        event.seller = seller.clone();
        p.on_created(&event).await.unwrap();
    }

    let page = store
        .search(&SearchQuery {
            seller: Some(seller.clone()),
            page_size: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_count, 3);
    assert_eq!(page.page_count, 2);
    let makes: Vec<_> = page.results.iter().map(|i| i.make.as_str()).collect();
    assert_eq!(makes, vec!["Audi", "Ferrari"]);

    let page = store
        .search(&SearchQuery {
            search_term: Some("FER".to_string()),
            seller: Some(seller),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
}
