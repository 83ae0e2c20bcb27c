use common::prelude::{InspectError, Inspector};

use crate::config::Config;

/// Shared by every handler. Holds no open database handle: each request
/// opens and drops its own snapshot.
#[derive(Debug, Clone)]
pub struct ServiceState {
    inspector: Inspector,
}

impl ServiceState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inspector: Inspector::new(&config.db_path),
        }
    }

    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    /// Run one inspection on the blocking pool.
    pub async fn inspect<T, F>(&self, op: F) -> Result<T, StateError>
    where
        T: Send + 'static,
        F: FnOnce(&Inspector) -> Result<T, InspectError> + Send + 'static,
    {
        let inspector = self.inspector.clone();
        Ok(tokio::task::spawn_blocking(move || op(&inspector)).await??)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Inspect(#[from] InspectError),
    #[error("inspection task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
