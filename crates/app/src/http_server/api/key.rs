use axum::extract::{Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use common::prelude::PreviewMode;

use super::{key_route, ApiError, ApiResponse};
use crate::state::ServiceState;

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    /// `1` asks for the untruncated preview
    pub full: Option<String>,
}

impl KeyQuery {
    fn mode(&self) -> PreviewMode {
        match self.full.as_deref() {
            Some("1") => PreviewMode::Full,
            _ => PreviewMode::Bounded,
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn handler(
    State(state): State<ServiceState>,
    uri: Uri,
    Query(query): Query<KeyQuery>,
) -> Result<Response, ApiError> {
    let (bucket, key) = key_route(&uri, "/key/")?;
    let mode = query.mode();
    let context = match mode {
        PreviewMode::Full => "Failed to get full key data",
        PreviewMode::Bounded => "Failed to get key details",
    };

    let value = state
        .inspect(move |inspector| inspector.key_details(&bucket, &key, mode))
        .await
        .map_err(ApiError::context(context))?;

    Ok(ApiResponse::data(value).into_response())
}
