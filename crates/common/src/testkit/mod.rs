//! Test support: a bolt file writer and a sample database shaped like a
//! containerd metadata store.
//!
//! ```rust,ignore
//! use common::testkit::sample_db;
//!
//! let (_dir, path) = sample_db()?;
//! let tree = Inspector::new(&path).list_buckets()?;
//! ```

use std::path::PathBuf;

use prost::Message;
use tempfile::TempDir;

pub mod writer;

pub use writer::{BoltWriter, Node, Tree, PAGE_SIZE};

/// Seconds between 0001-01-01 and the unix epoch.
const UNIX_TO_INTERNAL: i64 = 62_135_596_800;

pub const SPEC_TYPE_URL: &str = "types.containerd.io/opencontainers/runtime-spec/1/Spec";
pub const REDIS_IMAGE: &str = "docker.io/library/redis:7-alpine";
pub const CREATED_AT: i64 = 1_709_292_605;
pub const BLOB_COUNT: usize = 150;

/// Marshalled timestamp (version 1) at `unix` seconds.
pub fn marshal_time(unix: i64, offset_minutes: i16) -> Vec<u8> {
    let mut raw = vec![1u8];
    raw.extend_from_slice(&(unix + UNIX_TO_INTERNAL).to_be_bytes());
    raw.extend_from_slice(&0i32.to_be_bytes());
    raw.extend_from_slice(&offset_minutes.to_be_bytes());
    raw
}

pub fn envelope(type_url: &str, payload: &[u8]) -> Vec<u8> {
    prost_types::Any {
        type_url: type_url.to_string(),
        value: payload.to_vec(),
    }
    .encode_to_vec()
}

/// ```text
/// v1/
///   k8s.io/
///     containers/redis-1/     image, createdat, spec, snapshotKey, labels/
///     images/docker.io/library/redis:7-alpine/   digest, raw (5000 bytes)
///     content/blob/           150 digests, split over three leaves
///   default/                  empty
/// x/y/                        top-level name containing a slash
/// ```
pub fn sample_tree() -> Tree {
    let mut root = Tree::new();

    root.path(&["v1", "k8s.io", "containers", "redis-1"])
        .put("image", REDIS_IMAGE)
        .put("createdat", marshal_time(CREATED_AT, -1))
        .put("spec", envelope(SPEC_TYPE_URL, br#"{"ociVersion":"1.1.0"}"#))
        .put("snapshotKey", "")
        .bucket("labels")
        .put("io.cri-containerd.kind", "container");

    let raw: Vec<u8> = (0..5000).map(|i| i as u8).collect();
    root.path(&["v1", "k8s.io", "images", REDIS_IMAGE])
        .put("digest", "sha256:0123abcd")
        .put("raw", raw);

    let blobs = root.path(&["v1", "k8s.io", "content", "blob"]);
    for i in 0..BLOB_COUNT {
        blobs.put(format!("sha256:{:064x}", i), format!("{{\"size\":{}}}", i));
    }

    root.path(&["v1", "default"]);
    root.path(&["x/y"]).put("k", "v");
    root
}

/// Write `tree` into a fresh temp dir. The file lives as long as the
/// returned `TempDir`.
pub fn write_db(writer: BoltWriter, tree: &Tree) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("meta.db");
    std::fs::write(&path, writer.finish(tree))?;
    Ok((dir, path))
}

/// [`sample_tree`] with two free pages.
pub fn sample_db() -> std::io::Result<(TempDir, PathBuf)> {
    write_db(BoltWriter::new().free_pages(2), &sample_tree())
}
