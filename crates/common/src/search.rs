use serde::{Deserialize, Serialize};

use crate::classify::{classify, truncate_chars, PreviewMode, ValueKind};
use crate::store::{Bucket, StoreError};

pub const DEFAULT_LIMIT: usize = 100;
const HIT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Path of the bucket holding the key
    pub bucket: String,
    pub key: String,
    /// `bucket/key`
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    pub size: usize,
    pub preview: String,
}

/// Keys whose name contains `query`, ignoring case, across every bucket
/// below `root`. Walks depth first in store order and stops at `limit` hits.
pub fn search<'tx, B: Bucket<'tx>>(
    root: &B,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>, StoreError> {
    let needle = query.to_lowercase();
    let mut hits = Vec::new();

    for entry in root.entries()? {
        if hits.len() >= limit {
            break;
        }
        if !entry.is_bucket() {
            continue;
        }
        if let Some(bucket) = root.bucket(entry.key)? {
            search_bucket(&bucket, &entry.name(), &needle, limit, &mut hits)?;
        }
    }

    tracing::debug!(query, hits = hits.len(), limit, "key search finished");
    Ok(hits)
}

fn search_bucket<'tx, B: Bucket<'tx>>(
    bucket: &B,
    path: &str,
    needle: &str,
    limit: usize,
    hits: &mut Vec<SearchHit>,
) -> Result<(), StoreError> {
    for entry in bucket.entries()? {
        if hits.len() >= limit {
            return Ok(());
        }
        let name = entry.name();
        let entry_path = format!("{}/{}", path, name);
        match entry.value {
            None => {
                if let Some(child) = bucket.bucket(entry.key)? {
                    search_bucket(&child, &entry_path, needle, limit, hits)?;
                }
            }
            Some(value) => {
                if !name.to_lowercase().contains(needle) {
                    continue;
                }
                let classified = classify(&name, value, PreviewMode::Bounded);
                hits.push(SearchHit {
                    bucket: path.to_string(),
                    key: name,
                    path: entry_path,
                    kind: classified.value_type,
                    size: classified.value_size,
                    preview: truncate_chars(classified.preview, HIT_PREVIEW_CHARS, "..."),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Tx};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .bucket_mut(["v1", "default", "containers", "web"])
            .put("Image", "nginx")
            .put("labels", "{}");
        store
            .bucket_mut(["v1", "default", "images", "nginx:latest"])
            .put("image_digest", "sha256:aa");
        store.bucket_mut(["v1"]).put("version", "3");
        store
    }

    #[test]
    fn test_case_insensitive_match() {
        let store = store();
        let hits = search(&store.root().unwrap(), "IMAGE", DEFAULT_LIMIT).unwrap();
        let paths: Vec<_> = hits.iter().map(|hit| hit.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "v1/default/containers/web/Image",
                "v1/default/images/nginx:latest/image_digest",
            ]
        );
        assert_eq!(hits[0].bucket, "v1/default/containers/web");
        assert_eq!(hits[0].key, "Image");
        assert_eq!(hits[0].kind, ValueKind::Text);
        assert_eq!(hits[0].size, 5);
    }

    #[test]
    fn test_bucket_names_do_not_match() {
        let store = store();
        let hits = search(&store.root().unwrap(), "containers", DEFAULT_LIMIT).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_limit_across_sibling_buckets() {
        let mut store = MemoryStore::new();
        for bucket in ["a", "b", "c"] {
            let node = store.bucket_mut(["root", bucket]);
            for i in 0..4 {
                node.put(format!("key-{}", i), "x");
            }
        }
        let root = store.root().unwrap();
        let hits = search(&root, "key", 6).unwrap();
        assert_eq!(hits.len(), 6);
        assert_eq!(hits[5].path, "root/b/key-1");

        assert_eq!(search(&root, "key", 100).unwrap().len(), 12);
        assert!(search(&root, "key", 0).unwrap().is_empty());
    }

    #[test]
    fn test_preview_cut() {
        let mut store = MemoryStore::new();
        store.bucket_mut(["b"]).put("long", "y".repeat(500));
        let hits = search(&store.root().unwrap(), "long", DEFAULT_LIMIT).unwrap();
        assert_eq!(hits[0].preview.chars().count(), HIT_PREVIEW_CHARS + 3);
        assert!(hits[0].preview.ends_with("..."));
    }

    #[test]
    fn test_serialized_shape() {
        let store = store();
        let hits = search(&store.root().unwrap(), "version", DEFAULT_LIMIT).unwrap();
        let json = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(json["type"], "JSON");
        assert_eq!(json["bucket"], "v1");
        assert_eq!(json["path"], "v1/version");
    }
}
