//! Auction Service
//!
//! State changes on auctions. Each committed change produces exactly one
//! outbox entry in the same store write, which the relay later publishes.

use auction_contracts::{AuctionStatus, DomainEvent};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::events::{new_envelope, OutboxEntry};
use crate::models::{Auction, CreateAuctionRequest, Item, UpdateAuctionRequest};
use crate::store::{AuctionStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("auction {0} not found")]
    NotFound(Uuid),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("auction {0} was changed concurrently")]
    Conflict(Uuid),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::Conflict { id, .. } => ServiceError::Conflict(id),
            other => ServiceError::Store(other),
        }
    }
}

pub struct AuctionService {
    store: Arc<dyn AuctionStore>,
    default_seller: String,
}

impl AuctionService {
    pub fn new(store: Arc<dyn AuctionStore>, default_seller: impl Into<String>) -> Self {
        Self {
            store,
            default_seller: default_seller.into(),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Auction>, ServiceError> {
        Ok(self.store.get(id).await?)
    }

    /// Auctions ordered by make, only those updated after `updated_after`
    /// when given
    pub async fn list(
        &self,
        updated_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Auction>, ServiceError> {
        Ok(self.store.list(updated_after).await?)
    }

    pub async fn create(&self, req: CreateAuctionRequest) -> Result<Auction, ServiceError> {
        if req.reserve_price < 0 {
            return Err(ServiceError::Validation(
                "reserve_price cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let auction = Auction {
            id: Uuid::new_v4(),
            reserve_price: req.reserve_price,
            seller: self.default_seller.clone(),
            winner: None,
            sold_amount: None,
            current_high_bid: None,
            created_at: now,
            updated_at: now,
            auction_end: req.auction_end,
            status: AuctionStatus::Live,
            item: Item {
                make: req.make,
                model: req.model,
                year: req.year,
                color: req.color,
                mileage: req.mileage,
                image_url: req.image_url,
            },
            version: 1,
        };
        validate_item(&auction.item)?;

        let entry = outbox_entry(auction.to_created_event())?;
        self.store.insert(&auction, &entry).await?;

        tracing::info!(
            auction_id = %auction.id,
            event_id = %entry.event_id,
            "Auction created"
        );
        Ok(auction)
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: UpdateAuctionRequest,
    ) -> Result<Auction, ServiceError> {
        let current = self.store.get(id).await?.ok_or(ServiceError::NotFound(id))?;

        let mut auction = current.clone();
        req.apply_to(&mut auction.item);
        validate_item(&auction.item)?;
        auction.version = current.version + 1;
        auction.updated_at = Utc::now();

        let entry = outbox_entry(auction.to_updated_event())?;
        self.store.update(&auction, current.version, &entry).await?;

        tracing::info!(
            auction_id = %id,
            version = auction.version,
            event_id = %entry.event_id,
            "Auction updated"
        );
        Ok(auction)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let current = self.store.get(id).await?.ok_or(ServiceError::NotFound(id))?;

        let entry = outbox_entry(current.to_deleted_event(Utc::now()))?;
        self.store.delete(id, current.version, &entry).await?;

        tracing::info!(
            auction_id = %id,
            event_id = %entry.event_id,
            "Auction deleted"
        );
        Ok(())
    }
}

fn outbox_entry<E: DomainEvent>(event: E) -> Result<OutboxEntry, serde_json::Error> {
    let aggregate_id = event.auction_id();
    OutboxEntry::from_envelope(&new_envelope(event), aggregate_id)
}

fn validate_item(item: &Item) -> Result<(), ServiceError> {
    if item.make.trim().is_empty() {
        return Err(ServiceError::Validation("make is required".to_string()));
    }
    if item.model.trim().is_empty() {
        return Err(ServiceError::Validation("model is required".to_string()));
    }
    if item.color.trim().is_empty() {
        return Err(ServiceError::Validation("color is required".to_string()));
    }
    if item.year <= 0 {
        return Err(ServiceError::Validation("year must be positive".to_string()));
    }
    if item.mileage < 0 {
        return Err(ServiceError::Validation(
            "mileage cannot be negative".to_string(),
        ));
    }
    Ok(())
}
