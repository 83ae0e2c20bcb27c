//! Read access to a hierarchical key/value store.
//!
//! Everything above this module is written against two traits:
//! - [`Tx`]: a read-only, point-in-time snapshot with a root bucket
//! - [`Bucket`]: a container whose keys map to either a value or a nested bucket
//!
//! Handles and values borrow the snapshot they came from (`'tx`), so nothing
//! obtained through a snapshot can outlive it. Callers that need a value after
//! the snapshot is gone copy it first.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod bolt;
pub mod memory;

pub use bolt::Snapshot;
pub use memory::MemoryStore;

/// A single direct child of a bucket, in store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'tx> {
    pub key: &'tx [u8],
    /// `None` marks a nested bucket
    pub value: Option<&'tx [u8]>,
}

impl<'tx> Entry<'tx> {
    pub fn is_bucket(&self) -> bool {
        self.value.is_none()
    }

    /// Key as display text; non UTF-8 bytes are replaced.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.key).into_owned()
    }
}

/// Page accounting for one bucket's own B+tree.
///
/// Nested buckets are not folded into their parent's numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStats {
    pub branch_page_n: usize,
    pub branch_overflow_n: usize,
    pub leaf_page_n: usize,
    pub leaf_overflow_n: usize,
    pub key_n: usize,
    pub depth: usize,
    pub branch_inuse: usize,
    pub leaf_inuse: usize,
}

pub trait Bucket<'tx>: Sized {
    /// Direct child bucket with exactly this name.
    fn bucket(&self, name: &[u8]) -> Result<Option<Self>, StoreError>;

    /// Value stored under exactly this key. Nested buckets are not values.
    fn get(&self, key: &[u8]) -> Result<Option<&'tx [u8]>, StoreError>;

    /// All direct children in store order.
    fn entries(&self) -> Result<Vec<Entry<'tx>>, StoreError>;

    fn stats(&self) -> Result<BucketStats, StoreError>;

    /// Names of the direct child buckets, in store order.
    fn bucket_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(Entry::is_bucket)
            .map(|entry| entry.name())
            .collect())
    }
}

/// A read-only snapshot of a store.
pub trait Tx {
    type Bucket<'tx>: Bucket<'tx>
    where
        Self: 'tx;

    /// The root bucket, whose children are the top-level buckets.
    fn root(&self) -> Result<Self::Bucket<'_>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a bolt database: {0}")]
    Invalid(String),
    #[error("corrupt page {page}: {reason}")]
    Corrupt { page: u64, reason: String },
}

impl StoreError {
    pub(crate) fn corrupt(page: u64, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            page,
            reason: reason.into(),
        }
    }

    /// Whether the store could not be opened at all, as opposed to a
    /// problem found while reading an open snapshot.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. } | StoreError::Invalid(_))
    }
}
