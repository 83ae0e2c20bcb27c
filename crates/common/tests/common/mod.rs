//! Shared helpers for integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

pub use common::testkit::*;

pub fn sample_db() -> (TempDir, PathBuf) {
    common::testkit::sample_db().unwrap()
}

pub fn write_db(writer: BoltWriter, tree: &Tree) -> (TempDir, PathBuf) {
    common::testkit::write_db(writer, tree).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
