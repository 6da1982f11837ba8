//! Search API Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{SearchPage, SearchQuery};
use crate::store::{ReplicaStore, StoreError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct SearchError(StoreError);

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Search failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Search is unavailable".to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /api/search?searchTerm=&seller=&pageSize=&pageNumber=
pub async fn search_items(
    State(store): State<Arc<dyn ReplicaStore>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchPage>, SearchError> {
    store.search(&query).await.map(Json).map_err(SearchError)
}
