//! Reading real bolt files produced by the test writer

mod common;

use ::common::inspect::{InspectError, Inspector};
use ::common::store::bolt::meta::{Meta, NO_FREELIST};
use ::common::store::bolt::page::META_PAGE;
use ::common::store::{Bucket, Snapshot, StoreError, Tx};
use crate::common::{sample_db, write_db, BoltWriter, Tree, BLOB_COUNT, PAGE_SIZE, REDIS_IMAGE};

fn open_path<'tx>(snapshot: &'tx Snapshot, names: &[&str]) -> <Snapshot as Tx>::Bucket<'tx> {
    names.iter().fold(snapshot.root().unwrap(), |bucket, name| {
        bucket.bucket(name.as_bytes()).unwrap().unwrap()
    })
}

#[test]
fn test_top_level_buckets() {
    common::init_tracing();
    let (_dir, path) = sample_db();
    let snapshot = Snapshot::open(&path).unwrap();
    let names = snapshot.root().unwrap().bucket_names().unwrap();
    assert_eq!(names, vec!["v1", "x/y"]);
    assert_eq!(snapshot.meta().txid, 42);
    assert_eq!(snapshot.page_size(), PAGE_SIZE);
}

#[test]
fn test_nested_values() {
    let (_dir, path) = sample_db();
    let snapshot = Snapshot::open(&path).unwrap();

    let container = open_path(&snapshot, &["v1", "k8s.io", "containers", "redis-1"]);
    assert_eq!(container.get(b"image").unwrap(), Some(REDIS_IMAGE.as_bytes()));
    assert_eq!(container.get(b"snapshotKey").unwrap(), Some(&b""[..]));
    assert_eq!(container.get(b"missing").unwrap(), None);
    // a nested bucket is not a value
    assert_eq!(container.get(b"labels").unwrap(), None);

    let labels = container.bucket(b"labels").unwrap().unwrap();
    assert_eq!(
        labels.get(b"io.cri-containerd.kind").unwrap(),
        Some(&b"container"[..])
    );
}

#[test]
fn test_entries_in_key_order() {
    let (_dir, path) = sample_db();
    let snapshot = Snapshot::open(&path).unwrap();
    let container = open_path(&snapshot, &["v1", "k8s.io", "containers", "redis-1"]);
    let entries = container.entries().unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["createdat", "image", "labels", "snapshotKey", "spec"]);
    assert!(entries[2].is_bucket());
    assert_eq!(entries.iter().filter(|e| e.is_bucket()).count(), 1);
}

#[test]
fn test_overflow_value() {
    let (_dir, path) = sample_db();
    let snapshot = Snapshot::open(&path).unwrap();
    let image = open_path(&snapshot, &["v1", "k8s.io", "images", REDIS_IMAGE]);
    let raw = image.get(b"raw").unwrap().unwrap();
    assert_eq!(raw.len(), 5000);
    assert!(raw.iter().enumerate().all(|(i, b)| *b == i as u8));

    let stats = image.stats().unwrap();
    assert_eq!(stats.leaf_page_n, 1);
    assert_eq!(stats.leaf_overflow_n, 1);
    assert_eq!(stats.key_n, 2);
}

#[test]
fn test_branch_pages() {
    let (_dir, path) = sample_db();
    let snapshot = Snapshot::open(&path).unwrap();
    let blobs = open_path(&snapshot, &["v1", "k8s.io", "content", "blob"]);

    let entries = blobs.entries().unwrap();
    assert_eq!(entries.len(), BLOB_COUNT);
    assert!(entries.windows(2).all(|w| w[0].key < w[1].key));

    for i in [0, 63, 64, 100, BLOB_COUNT - 1] {
        let key = format!("sha256:{:064x}", i);
        let expected = format!("{{\"size\":{}}}", i);
        assert_eq!(blobs.get(key.as_bytes()).unwrap(), Some(expected.as_bytes()));
    }
    assert_eq!(blobs.get(b"sha256:").unwrap(), None);
    assert_eq!(blobs.get(b"zzz").unwrap(), None);

    let stats = blobs.stats().unwrap();
    assert_eq!(stats.key_n, BLOB_COUNT);
    assert_eq!(stats.depth, 2);
    assert_eq!(stats.branch_page_n, 1);
    assert_eq!(stats.leaf_page_n, 3);
    assert_eq!(stats.leaf_overflow_n, 2);
    assert!(stats.branch_inuse > 0);
}

#[test]
fn test_inline_bucket_stats() {
    let (_dir, path) = sample_db();
    let snapshot = Snapshot::open(&path).unwrap();

    let xy = open_path(&snapshot, &["x/y"]);
    assert_eq!(xy.get(b"k").unwrap(), Some(&b"v"[..]));
    let stats = xy.stats().unwrap();
    assert_eq!(stats.key_n, 1);
    assert_eq!(stats.depth, 1);
    assert_eq!(stats.leaf_page_n, 0);
    assert!(stats.leaf_inuse > 0);

    let empty = open_path(&snapshot, &["v1", "default"]);
    assert!(empty.entries().unwrap().is_empty());
    assert_eq!(empty.stats().unwrap().key_n, 0);
}

#[test]
fn test_freelist() {
    let (_dir, path) = sample_db();
    let snapshot = Snapshot::open(&path).unwrap();
    assert_eq!(snapshot.free_pages().unwrap(), vec![3, 4]);

    let (_dir, path) = write_db(BoltWriter::new().without_freelist(), &Tree::new());
    let snapshot = Snapshot::open(&path).unwrap();
    assert!(snapshot.free_pages().unwrap().is_empty());
}

#[test]
fn test_empty_database() {
    let (_dir, path) = write_db(BoltWriter::new(), &Tree::new());
    let snapshot = Snapshot::open(&path).unwrap();
    assert!(snapshot.root().unwrap().entries().unwrap().is_empty());
}

#[test]
fn test_newest_valid_meta_wins() {
    let mut tree = Tree::new();
    tree.bucket("a");
    let bytes = BoltWriter::new().txid(7).finish(&tree);

    // corrupt the checksum of meta page 1 (txid 7)
    let mut damaged = bytes.clone();
    damaged[PAGE_SIZE + 16 + 60] ^= 0xff;
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("meta.db");
    std::fs::write(&path, &damaged).unwrap();

    let snapshot = Snapshot::open(&path).unwrap();
    assert_eq!(snapshot.meta().txid, 6);
    assert_eq!(snapshot.root().unwrap().bucket_names().unwrap(), vec!["a"]);
}

#[test]
fn test_missing_file_is_unavailable() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = Snapshot::open(dir.path().join("nope.db")).unwrap_err();
    assert!(matches!(err, StoreError::Unavailable { .. }));
    assert!(err.is_unavailable());
}

#[test]
fn test_truncated_file_is_rejected() {
    let bytes = BoltWriter::new().finish(&common::sample_tree());
    let dir = tempfile::TempDir::new().unwrap();

    for len in [0, 100, PAGE_SIZE, bytes.len() - PAGE_SIZE] {
        let path = dir.path().join(format!("short-{}.db", len));
        std::fs::write(&path, &bytes[..len]).unwrap();
        let err = Snapshot::open(&path).unwrap_err();
        assert!(err.is_unavailable(), "len {}: {}", len, err);
    }
}

#[test]
fn test_wrong_magic_is_rejected() {
    let mut bytes = BoltWriter::new().finish(&Tree::new());
    bytes[16] ^= 0xff;
    bytes[PAGE_SIZE + 16] ^= 0xff;
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("meta.db");
    std::fs::write(&path, &bytes).unwrap();

    let err = Snapshot::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

#[test]
fn test_random_bytes_are_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("junk.db");
    std::fs::write(&path, vec![0x5au8; 3 * PAGE_SIZE]).unwrap();
    assert!(Snapshot::open(&path).unwrap_err().is_unavailable());
}

/// Two meta pages of `meta.page_size` bytes each, and nothing else.
fn meta_only_file(meta: Meta) -> Vec<u8> {
    let page_size = meta.page_size as usize;
    let mut bytes = vec![0u8; 2 * page_size];
    for id in 0..2u64 {
        let page = &mut bytes[id as usize * page_size..];
        page[0..8].copy_from_slice(&id.to_le_bytes());
        page[8..10].copy_from_slice(&META_PAGE.to_le_bytes());
        page[16..16 + 64].copy_from_slice(&meta.encode());
    }
    bytes
}

#[test]
fn test_page_offset_overflow_is_corrupt() {
    // 255 * (u64::MAX / 255) lands exactly on u64::MAX
    let bytes = meta_only_file(Meta {
        page_size: 255,
        flags: 0,
        root: u64::MAX / 255,
        sequence: 0,
        freelist: NO_FREELIST,
        pgid: 2,
        txid: 1,
    });
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("overflow.db");
    std::fs::write(&path, &bytes).unwrap();

    let snapshot = Snapshot::open(&path).unwrap();
    let err = snapshot.page(u64::MAX / 255).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }), "{}", err);
    assert!(matches!(
        snapshot.page(u64::MAX).unwrap_err(),
        StoreError::Corrupt { .. }
    ));

    let err = Inspector::new(&path).list_buckets().unwrap_err();
    assert!(
        matches!(err, InspectError::Store(StoreError::Corrupt { .. })),
        "{}",
        err
    );
}

#[test]
fn test_overflow_count_past_end_is_corrupt() {
    let mut bytes = BoltWriter::new().finish(&Tree::new());
    // the empty root leaf is the first page after both metas and the freelist
    let root = 3 * PAGE_SIZE;
    bytes[root + 12..root + 16].copy_from_slice(&u32::MAX.to_le_bytes());

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("overflow.db");
    std::fs::write(&path, &bytes).unwrap();

    let snapshot = Snapshot::open(&path).unwrap();
    assert_eq!(snapshot.meta().root, 3);
    assert!(matches!(
        snapshot.root().unwrap().entries().unwrap_err(),
        StoreError::Corrupt { .. }
    ));
}
