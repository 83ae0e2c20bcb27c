//! One method per inspection request.
//!
//! Every call opens its own [`Snapshot`], copies out what it returns and
//! drops the snapshot before returning, on success and on error alike.
//! Nothing is cached between calls.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{classify, ClassifiedValue, PreviewMode};
use crate::decode::{decode_envelope, decode_time, DecodeError, DecodedTime, Envelope};
use crate::resolve::{resolve, segments, ResolveError};
use crate::search::{search, SearchHit, DEFAULT_LIMIT};
use crate::store::{Bucket, Snapshot, StoreError, Tx};
use crate::tree::{build_summary, build_tree, BucketSummary};

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("bucket not found: {path}")]
    BucketNotFound {
        path: String,
        level: usize,
        available: Vec<String>,
    },
    #[error("key not found: {key} (bucket {bucket})")]
    KeyNotFound { bucket: String, key: String },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("failed to stat database file: {0}")]
    Metadata(#[from] std::io::Error),
}

impl From<ResolveError> for InspectError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound {
                path,
                level,
                available,
            } => InspectError::BucketNotFound {
                path,
                level,
                available,
            },
            ResolveError::Store(err) => InspectError::Store(err),
        }
    }
}

impl InspectError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InspectError::BucketNotFound { .. } | InspectError::KeyNotFound { .. }
        )
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, InspectError::Store(err) if err.is_unavailable())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub database: DatabaseInfo,
    pub transactions: TransactionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub path: PathBuf,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub free_page_n: usize,
    /// Pages freed by writers that are still open. A read-only snapshot
    /// never observes any.
    pub pending_page_n: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    /// Id of the last committed transaction
    pub tx_n: u64,
    pub open_tx_n: usize,
}

#[derive(Debug, Clone)]
pub struct Inspector {
    db_path: PathBuf,
}

impl Inspector {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Snapshot, InspectError> {
        Ok(Snapshot::open(&self.db_path)?)
    }

    /// Check the database can be opened right now.
    pub fn probe(&self) -> Result<(), InspectError> {
        self.open().map(|_| ())
    }

    pub fn list_buckets(&self) -> Result<Vec<BucketSummary>, InspectError> {
        let snapshot = self.open()?;
        let tree = build_tree(&snapshot)?;
        tracing::debug!(buckets = tree.len(), "listed top-level buckets");
        Ok(tree)
    }

    pub fn bucket_details(&self, path: &str) -> Result<BucketSummary, InspectError> {
        let snapshot = self.open()?;
        let bucket = resolve(&snapshot, path)?;
        let name = segments(path).last().copied().unwrap_or_default();
        Ok(build_summary(&bucket, name, path.trim_matches('/'), 0, true)?)
    }

    pub fn key_details(
        &self,
        path: &str,
        key: &str,
        mode: PreviewMode,
    ) -> Result<ClassifiedValue, InspectError> {
        self.with_value(path, key, |raw| Ok(classify(key, raw, mode)))
    }

    pub fn decode_time_at(&self, path: &str, key: &str) -> Result<DecodedTime, InspectError> {
        self.with_value(path, key, |raw| Ok(decode_time(raw)?))
    }

    pub fn decode_envelope_at(&self, path: &str, key: &str) -> Result<Envelope, InspectError> {
        self.with_value(path, key, |raw| Ok(decode_envelope(raw)?))
    }

    pub fn search_keys(&self, query: &str) -> Result<Vec<SearchHit>, InspectError> {
        if query.is_empty() {
            return Err(InspectError::InvalidQuery(
                "search query cannot be empty".into(),
            ));
        }
        let snapshot = self.open()?;
        let root = snapshot.root()?;
        Ok(search(&root, query, DEFAULT_LIMIT)?)
    }

    pub fn database_stats(&self) -> Result<DatabaseStats, InspectError> {
        let snapshot = self.open()?;
        let modified = std::fs::metadata(&self.db_path)?.modified()?;
        let free_pages = snapshot.free_pages()?;

        Ok(DatabaseStats {
            database: DatabaseInfo {
                path: self.db_path.clone(),
                size: snapshot.file_size() as u64,
                last_modified: DateTime::<Utc>::from(modified),
                free_page_n: free_pages.len(),
                pending_page_n: 0,
                page_size: snapshot.page_size(),
            },
            transactions: TransactionStats {
                tx_n: snapshot.meta().txid,
                open_tx_n: 0,
            },
        })
    }

    /// Run `f` on the value at `path`/`key` while the snapshot is open.
    fn with_value<R>(
        &self,
        path: &str,
        key: &str,
        f: impl FnOnce(&[u8]) -> Result<R, InspectError>,
    ) -> Result<R, InspectError> {
        let snapshot = self.open()?;
        let bucket = resolve(&snapshot, path)?;
        let raw = bucket
            .get(key.as_bytes())?
            .ok_or_else(|| InspectError::KeyNotFound {
                bucket: path.to_string(),
                key: key.to_string(),
            })?;
        f(raw)
    }
}
