use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::{ApiError, ApiResponse};
use crate::state::ServiceState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    if query.q.is_empty() {
        return Err(ApiError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    let hits = state
        .inspect(move |inspector| inspector.search_keys(&query.q))
        .await
        .map_err(ApiError::context("Search failed"))?;

    Ok(ApiResponse::data(hits).into_response())
}
