use askama::Template;
use askama_axum::IntoResponse;
use axum::Extension;
use tracing::instrument;

use common::prelude::build_info;

use crate::http_server::Config;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub db_path: String,
    pub version: String,
}

#[instrument(skip(config))]
pub async fn handler(Extension(config): Extension<Config>) -> askama_axum::Response {
    let template = IndexTemplate {
        db_path: config.db_path.display().to_string(),
        version: build_info().version,
    };

    template.into_response()
}
