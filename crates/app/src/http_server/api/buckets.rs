use axum::extract::State;
use axum::response::{IntoResponse, Response};

use super::{ApiError, ApiResponse};
use crate::state::ServiceState;

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Result<Response, ApiError> {
    let buckets = state
        .inspect(|inspector| inspector.list_buckets())
        .await
        .map_err(ApiError::context("Failed to get bucket list"))?;

    tracing::info!("retrieved {} buckets", buckets.len());
    let mut response = ApiResponse::data(buckets.clone());
    response.buckets = Some(buckets);
    Ok(response.into_response())
}
