//! Bucket path resolution.
//!
//! Bucket names are arbitrary bytes, so a name may itself contain `/` and a
//! slash-joined path does not say where one name ends and the next begins.
//! [`resolve`] splits naively and then re-joins adjacent segments whenever the
//! naive split does not line up with real bucket names:
//!
//! 1. try the single segment at the cursor as a child bucket
//! 2. try every remaining segment joined back together
//! 3. try `[cursor..end)` joined, for `end` from longest to `cursor + 2`,
//!    and keep the first match
//!
//! Resolution is all or nothing: it never hands back a parent bucket for a
//! path it could only partly follow.

use crate::store::{Bucket, StoreError, Tx};

/// How many sibling names a failed lookup reports.
const MAX_REPORTED_SIBLINGS: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("bucket not found: {path}")]
    NotFound {
        path: String,
        /// Segment index at which resolution gave up
        level: usize,
        /// Bucket names available at the failing level (at most 20)
        available: Vec<String>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

/// Normalize a path and split it into candidate segments.
///
/// Empty segments are dropped, so outer and repeated slashes never count
/// as a level.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Locate the bucket a logical path refers to inside `tx`.
pub fn resolve<'tx, T: Tx>(tx: &'tx T, path: &str) -> Result<T::Bucket<'tx>, ResolveError> {
    resolve_from(tx.root()?, path)
}

/// Like [`resolve`], starting below an already open bucket.
pub fn resolve_from<'tx, B: Bucket<'tx>>(start: B, path: &str) -> Result<B, ResolveError> {
    let parts = segments(path);
    if parts.is_empty() {
        return Err(not_found(path, 0, Vec::new()));
    }
    tracing::debug!(path, ?parts, "resolving bucket path");

    let mut bucket = start;
    let mut cursor = 0;
    while cursor < parts.len() {
        if let Some(next) = bucket.bucket(parts[cursor].as_bytes())? {
            tracing::debug!(level = cursor, name = parts[cursor], "entered bucket");
            bucket = next;
            cursor += 1;
            continue;
        }

        let remainder = parts[cursor..].join("/");
        if let Some(next) = bucket.bucket(remainder.as_bytes())? {
            tracing::debug!(level = cursor, name = %remainder, "matched remaining path as one name");
            return Ok(next);
        }

        match contract(&bucket, &parts, cursor)? {
            Some((next, end)) => {
                bucket = next;
                cursor = end;
            }
            None => {
                let mut available = bucket.bucket_names()?;
                available.truncate(MAX_REPORTED_SIBLINGS);
                tracing::debug!(
                    level = cursor,
                    name = parts[cursor],
                    ?available,
                    "bucket not found"
                );
                return Err(not_found(path, cursor, available));
            }
        }
    }

    Ok(bucket)
}

/// Longest run `[cursor..end)` of at least two segments that names a child
/// of `bucket`. Returns the child and `end`.
fn contract<'tx, B: Bucket<'tx>>(
    bucket: &B,
    parts: &[&str],
    cursor: usize,
) -> Result<Option<(B, usize)>, StoreError> {
    for end in (cursor + 2..parts.len()).rev() {
        let candidate = parts[cursor..end].join("/");
        if let Some(next) = bucket.bucket(candidate.as_bytes())? {
            tracing::debug!(
                level = cursor,
                end,
                name = %candidate,
                "matched bucket by merging segments"
            );
            return Ok(Some((next, end)));
        }
    }
    Ok(None)
}

fn not_found(path: &str, level: usize, available: Vec<String>) -> ResolveError {
    ResolveError::NotFound {
        path: path.to_string(),
        level,
        available,
    }
}
