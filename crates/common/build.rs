//! Bakes the build metadata read by `common::version` into the crate.

use std::env;
use std::process::Command;

const UNKNOWN: &str = "unknown";

fn emit(name: &str, value: &str) {
    println!("cargo:rustc-env={}={}", name, value);
}

/// Trimmed stdout of a successful command.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// CI ref, then the nearest tag, then the crate version.
fn repository_version() -> String {
    env::var("CI_BUILD_REF")
        .ok()
        .filter(|reference| !reference.is_empty())
        .or_else(|| {
            command_output(
                "git",
                &["describe", "--always", "--dirty", "--long", "--tags"],
            )
        })
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

fn enabled_features() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_").map(str::to_lowercase))
        .collect();
    if features.is_empty() {
        return "none".to_string();
    }
    features.sort();
    features.join(",")
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-env-changed=CI_BUILD_REF");

    let var = |name: &str| env::var(name).unwrap_or_else(|_| UNKNOWN.to_string());

    emit("BUILD_PROFILE", &var("PROFILE"));
    emit("BUILD_TARGET", &var("TARGET"));
    emit("BUILD_FEATURES", &enabled_features());
    emit("REPO_VERSION", &repository_version());
    emit("BUILD_TIMESTAMP", &chrono::Utc::now().to_rfc3339());
    emit(
        "RUST_VERSION",
        &command_output("rustc", &["--version"]).unwrap_or_else(|| UNKNOWN.to_string()),
    );
}
