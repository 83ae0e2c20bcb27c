use std::path::PathBuf;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use common::prelude::{build_info, BuildInfo};

use crate::state::ServiceState;

/// Build metadata plus the database file this instance inspects.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    #[serde(flatten)]
    pub build: BuildInfo,
    pub database: PathBuf,
}

#[tracing::instrument(skip(state))]
pub async fn handler(State(state): State<ServiceState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        build: build_info(),
        database: state.inspector().db_path().to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_reports_build_and_database() {
        let state = ServiceState::from_config(&Config {
            db_path: "/var/lib/containerd/io.containerd.metadata.v1.bolt/meta.db".into(),
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: tracing::Level::INFO,
        });

        let Json(reply) = handler(State(state)).await;
        assert_eq!(reply.build, build_info());
        assert_eq!(
            reply.database,
            Path::new("/var/lib/containerd/io.containerd.metadata.v1.bolt/meta.db")
        );

        let body = serde_json::to_value(&reply).unwrap();
        assert_eq!(body["version"], build_info().version.as_str());
        assert_eq!(body["target"], build_info().target.as_str());
        assert_eq!(
            body["database"],
            "/var/lib/containerd/io.containerd.metadata.v1.bolt/meta.db"
        );
    }
}
