use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use http::request::Parts;

use common::prelude::Inspector;

use crate::state::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Check that requests can be served right now.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("the database cannot be opened")]
    DatabaseUnavailable,

    #[error("readiness check could not run")]
    CheckFailed,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ready when a fresh snapshot of the database can be opened.
struct DatabaseSource {
    inspector: Inspector,
}

#[async_trait]
impl DataSource for DatabaseSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        let inspector = self.inspector.clone();
        tokio::task::spawn_blocking(move || inspector.probe())
            .await
            .map_err(|_| DataSourceError::CheckFailed)?
            .map_err(|e| {
                tracing::warn!("readiness probe failed: {}", e);
                DataSourceError::DatabaseUnavailable
            })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StateDataSource
where
    ServiceState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ();

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ServiceState::from_ref(state);
        Ok(StateDataSource(Arc::new(DatabaseSource {
            inspector: state.inspector().clone(),
        })))
    }
}
