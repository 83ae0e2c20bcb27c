use serde::{Deserialize, Serialize};

use crate::classify::{classify, ClassifiedValue, PreviewMode};
use crate::store::{Bucket, BucketStats, StoreError, Tx};

/// Levels above this depth are rendered expanded.
const EXPAND_BELOW_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub name: String,
    pub path: String,
    pub level: usize,
    pub key_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_buckets: Vec<BucketSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<ClassifiedValue>,
    pub stats: BucketStats,
    pub is_expanded: bool,
}

/// Summarize `bucket` and, recursively, every bucket nested below it.
///
/// Child summaries follow store order and never carry keys; `include_keys`
/// only applies to `bucket` itself.
pub fn build_summary<'tx, B: Bucket<'tx>>(
    bucket: &B,
    name: &str,
    path: &str,
    depth: usize,
    include_keys: bool,
) -> Result<BucketSummary, StoreError> {
    let stats = bucket.stats()?;
    let mut summary = BucketSummary {
        name: name.to_string(),
        path: path.to_string(),
        level: depth,
        key_count: stats.key_n,
        sub_buckets: Vec::new(),
        keys: Vec::new(),
        stats,
        is_expanded: depth < EXPAND_BELOW_DEPTH,
    };

    for entry in bucket.entries()? {
        match entry.value {
            None => {
                // entries() just reported it, a miss means the page is inconsistent
                let Some(child) = bucket.bucket(entry.key)? else {
                    tracing::warn!(path, key = %entry.name(), "listed bucket could not be opened");
                    continue;
                };
                let child_name = entry.name();
                let child_path = format!("{}/{}", path, child_name);
                summary.sub_buckets.push(build_summary(
                    &child,
                    &child_name,
                    &child_path,
                    depth + 1,
                    false,
                )?);
            }
            Some(value) if include_keys => {
                summary
                    .keys
                    .push(classify(&entry.name(), value, PreviewMode::Bounded));
            }
            Some(_) => {}
        }
    }

    Ok(summary)
}

/// One summary per top-level bucket, without keys.
pub fn build_tree<T: Tx>(tx: &T) -> Result<Vec<BucketSummary>, StoreError> {
    let root = tx.root()?;
    let mut tree = Vec::new();
    for entry in root.entries()? {
        if !entry.is_bucket() {
            continue;
        }
        if let Some(bucket) = root.bucket(entry.key)? {
            let name = entry.name();
            tree.push(build_summary(&bucket, &name, &name, 0, false)?);
        }
    }
    Ok(tree)
}
