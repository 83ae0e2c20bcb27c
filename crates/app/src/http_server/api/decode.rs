use axum::extract::State;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use common::prelude::{DecodedTime, Envelope};

use super::{key_route, ApiError, ApiResponse};
use crate::state::ServiceState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeResponse {
    pub decoded_time: String,
    pub timestamp: i64,
    pub iso: String,
}

impl From<DecodedTime> for TimeResponse {
    fn from(time: DecodedTime) -> Self {
        Self {
            decoded_time: time.formatted,
            timestamp: time.unix_seconds,
            iso: time.iso8601,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeResponse {
    pub type_url: String,
    /// Payload bytes as text, invalid UTF-8 replaced
    pub value: String,
    pub size: usize,
}

impl From<Envelope> for EnvelopeResponse {
    fn from(envelope: Envelope) -> Self {
        Self {
            value: envelope.payload_text(),
            size: envelope.payload_size,
            type_url: envelope.type_url,
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn time_handler(
    State(state): State<ServiceState>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let (bucket, key) = key_route(&uri, "/decode/time/")?;
    let time = state
        .inspect(move |inspector| inspector.decode_time_at(&bucket, &key))
        .await
        .map_err(ApiError::context("Failed to decode timestamp"))?;

    Ok(ApiResponse::data(TimeResponse::from(time)).into_response())
}

#[tracing::instrument(skip(state))]
pub async fn protobuf_handler(
    State(state): State<ServiceState>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let (bucket, key) = key_route(&uri, "/decode/protobuf/")?;
    let envelope = state
        .inspect(move |inspector| inspector.decode_envelope_at(&bucket, &key))
        .await
        .map_err(ApiError::context("Protobuf decoding failed"))?;

    Ok(ApiResponse::data(EnvelopeResponse::from(envelope)).into_response())
}
