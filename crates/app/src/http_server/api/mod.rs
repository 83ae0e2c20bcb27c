//! JSON API consumed by the index page.
//!
//! Every reply uses the same envelope, `{success, data, error}`. Bucket
//! names may contain `/`, so routes that take a bucket path followed by a
//! key read the still-encoded request path and split it on its last `/`
//! before percent-decoding either half. An encoded `%2F` therefore stays
//! part of a name.

use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use http::{Method, StatusCode};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use common::prelude::InspectError;

mod bucket;
mod buckets;
mod decode;
mod key;
mod search;
mod stats;
mod ws;

use super::API_PREFIX;
use crate::state::{ServiceState, StateError};

pub fn router(state: ServiceState) -> Router<ServiceState> {
    let cors_layer = CorsLayer::new()
        .allow_methods(vec![Method::GET])
        .allow_headers(vec![ACCEPT, CONTENT_TYPE, ORIGIN])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .route("/buckets", get(buckets::handler))
        .route("/bucket/*path", get(bucket::handler))
        .route("/key/*path", get(key::handler))
        .route("/decode/time/*path", get(decode::time_handler))
        .route("/decode/protobuf/*path", get(decode::protobuf_handler))
        .route("/search", get(search::handler))
        .route("/stats", get(stats::handler))
        .route("/ws", get(ws::handler))
        .with_state(state)
        .layer(cors_layer)
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Same as `data`, for the bucket tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<T>,
    /// Same as `data`, for a single bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            buckets: None,
            bucket: None,
            error: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{context}: {source}")]
    Failed {
        context: &'static str,
        #[source]
        source: StateError,
    },
    #[error("{0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Wraps a failed inspection with what the handler was doing.
    pub fn context(context: &'static str) -> impl FnOnce(StateError) -> ApiError {
        move |source| ApiError::Failed { context, source }
    }

    fn status(&self) -> StatusCode {
        let err = match self {
            ApiError::InvalidInput(_) => return StatusCode::BAD_REQUEST,
            ApiError::Failed {
                source: StateError::Join(_),
                ..
            } => return StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Failed {
                source: StateError::Inspect(err),
                ..
            } => err,
        };
        match err {
            InspectError::BucketNotFound { .. } | InspectError::KeyNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            InspectError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            InspectError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            err if err.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::info!(status = status.as_u16(), "{}", self);
        }

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            buckets: None,
            bucket: None,
            error: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

/// The still-encoded part of the request path after `route`, for example
/// `"/key/"`. Accepts the path with or without the API prefix.
fn raw_tail<'a>(uri: &'a Uri, route: &str) -> Result<&'a str, ApiError> {
    let path = uri.path();
    path.strip_prefix(API_PREFIX)
        .unwrap_or(path)
        .strip_prefix(route)
        .ok_or_else(|| ApiError::InvalidInput(format!("unexpected request path: {}", path)))
}

/// Percent-decode one path part. Input that does not decode to UTF-8 is
/// used as is.
pub fn decode_part(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::warn!(raw, "percent-decoding failed, using raw text: {}", e);
            raw.to_string()
        }
    }
}

/// Split a raw `bucket/path/key` tail on its last `/` and decode both
/// halves. The bucket path comes back without outer slashes.
pub fn split_key_path(raw: &str) -> Result<(String, String), ApiError> {
    let (bucket, key) = raw
        .rsplit_once('/')
        .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
        .ok_or_else(|| {
            ApiError::InvalidInput(format!("expected <bucket path>/<key>, got {}", raw))
        })?;

    let bucket = decode_part(bucket).trim_matches('/').to_string();
    Ok((bucket, decode_part(key)))
}

/// Bucket path and key for a route of the shape `{route}{bucket path}/{key}`.
fn key_route(uri: &Uri, route: &str) -> Result<(String, String), ApiError> {
    split_key_path(raw_tail(uri, route)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_part() {
        assert_eq!(decode_part("docker.io%2Flibrary%2Fredis%3A7"), "docker.io/library/redis:7");
        assert_eq!(decode_part("plain"), "plain");
        // invalid UTF-8 once decoded
        assert_eq!(decode_part("bad%FF"), "bad%FF");
        // an incomplete escape is kept verbatim
        assert_eq!(decode_part("100%"), "100%");
    }

    #[test]
    fn test_split_keeps_encoded_slash_in_bucket_name() {
        let (bucket, key) =
            split_key_path("v1/k8s.io/images/docker.io%2Flibrary%2Fredis%3A7/digest").unwrap();
        assert_eq!(bucket, "v1/k8s.io/images/docker.io/library/redis:7");
        assert_eq!(key, "digest");
    }

    #[test]
    fn test_split_keeps_encoded_slash_in_key() {
        let (bucket, key) = split_key_path("v1/content/blob/sha256%2Fabc").unwrap();
        assert_eq!(bucket, "v1/content/blob");
        assert_eq!(key, "sha256/abc");
    }

    #[test]
    fn test_split_trims_bucket_slashes() {
        let (bucket, key) = split_key_path("%2Fv1%2F/k").unwrap();
        assert_eq!(bucket, "v1");
        assert_eq!(key, "k");
    }

    #[test]
    fn test_split_rejects_missing_parts() {
        assert!(split_key_path("onlykey").is_err());
        assert!(split_key_path("/key").is_err());
        assert!(split_key_path("bucket/").is_err());
    }

    #[test]
    fn test_raw_tail() {
        let uri: Uri = "/api/key/a%2Fb/k?full=1".parse().unwrap();
        assert_eq!(raw_tail(&uri, "/key/").unwrap(), "a%2Fb/k");
        let nested: Uri = "/key/a/k".parse().unwrap();
        assert_eq!(raw_tail(&nested, "/key/").unwrap(), "a/k");
        assert!(raw_tail(&nested, "/bucket/").is_err());
    }

    #[test]
    fn test_error_status() {
        let not_found = ApiError::context("Failed to get key")(StateError::Inspect(
            InspectError::KeyNotFound {
                bucket: "a".into(),
                key: "k".into(),
            },
        ));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            not_found.to_string(),
            "Failed to get key: key not found: k (bucket a)"
        );

        let query = ApiError::context("Search failed")(StateError::Inspect(
            InspectError::InvalidQuery("empty".into()),
        ));
        assert_eq!(query.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
