//! Catch-up synchronization with the auction service

pub mod client;
pub mod synchronizer;

pub use client::{AuctionServiceClient, AuctionSnapshot, AuctionSource};
pub use synchronizer::{CatchUpSynchronizer, SyncReport};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request to auction service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auction service answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("replica store error: {0}")]
    Store(#[from] StoreError),
}
