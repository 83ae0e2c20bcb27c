use axum::extract::State;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};

use super::{decode_part, raw_tail, ApiError, ApiResponse};
use crate::state::ServiceState;

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>, uri: Uri) -> Result<Response, ApiError> {
    let path = decode_part(raw_tail(&uri, "/bucket/")?)
        .trim_matches('/')
        .to_string();

    let bucket = state
        .inspect(move |inspector| inspector.bucket_details(&path))
        .await
        .map_err(ApiError::context("Failed to get bucket details"))?;

    let mut response = ApiResponse::data(bucket.clone());
    response.bucket = Some(bucket);
    Ok(response.into_response())
}
