use axum::extract::State;
use axum::response::{IntoResponse, Response};

use super::{ApiError, ApiResponse};
use crate::state::ServiceState;

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Result<Response, ApiError> {
    let stats = state
        .inspect(|inspector| inspector.database_stats())
        .await
        .map_err(ApiError::context("Failed to get statistics"))?;

    Ok(ApiResponse::data(stats).into_response())
}
