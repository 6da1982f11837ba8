//! Auction API Routes
//!
//! CRUD on auctions plus the change query the search service catches up from.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{AuctionDto, CreateAuctionRequest, UpdateAuctionRequest};
use crate::services::{AuctionService, ServiceError};

#[derive(Debug, Deserialize)]
pub struct ListAuctionsQuery {
    /// RFC 3339 timestamp; only auctions updated after it are returned
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Problem saving changes".to_string(),
            ),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(id) => ApiError::NotFound(format!("auction {} not found", id)),
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::Conflict(_) => ApiError::Conflict(e.to_string()),
            ServiceError::Store(_) | ServiceError::Serialization(_) => {
                tracing::error!(error = %e, "Auction request failed");
                ApiError::Internal
            }
        }
    }
}

/// GET /api/auctions?date=
pub async fn list_auctions(
    State(service): State<Arc<AuctionService>>,
    Query(params): Query<ListAuctionsQuery>,
) -> Result<Json<Vec<AuctionDto>>, ApiError> {
    let updated_after = match params.date.as_deref() {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| ApiError::BadRequest(format!("invalid date '{}': {}", raw, e)))?,
        ),
        None => None,
    };

    let auctions = service.list(updated_after).await?;
    Ok(Json(auctions.iter().map(AuctionDto::from).collect()))
}

/// GET /api/auctions/{id}
pub async fn get_auction(
    State(service): State<Arc<AuctionService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuctionDto>, ApiError> {
    let auction = service
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("auction {} not found", id)))?;
    Ok(Json(AuctionDto::from(&auction)))
}

/// POST /api/auctions
pub async fn create_auction(
    State(service): State<Arc<AuctionService>>,
    Json(req): Json<CreateAuctionRequest>,
) -> Result<(StatusCode, Json<AuctionDto>), ApiError> {
    let auction = service.create(req).await?;
    Ok((StatusCode::CREATED, Json(AuctionDto::from(&auction))))
}

/// PUT /api/auctions/{id}
pub async fn update_auction(
    State(service): State<Arc<AuctionService>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAuctionRequest>,
) -> Result<Json<AuctionDto>, ApiError> {
    let auction = service.update(id, req).await?;
    Ok(Json(AuctionDto::from(&auction)))
}

/// DELETE /api/auctions/{id}
pub async fn delete_auction(
    State(service): State<Arc<AuctionService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service.delete(id).await?;
    Ok(StatusCode::OK)
}
