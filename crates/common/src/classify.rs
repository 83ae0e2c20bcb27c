//! Value classification.
//!
//! Raw values are checked in a fixed order, first match wins:
//! 1. a complete JSON document
//! 2. binary: empty, larger than [`MAX_TEXT_SCAN`], containing NUL, or not UTF-8
//! 3. text

use serde::{Deserialize, Serialize};

use crate::hexdump;

/// Character budget for bounded JSON and text previews.
pub const PREVIEW_CHAR_LIMIT: usize = 1000;
/// Bytes shown by a bounded binary preview.
pub const BINARY_PREVIEW_BYTES: usize = 256;
/// Values above this size are treated as binary without being scanned.
pub const MAX_TEXT_SCAN: usize = 1024 * 1024;

pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "String")]
    Text,
    Binary,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Json => "JSON",
            ValueKind::Text => "String",
            ValueKind::Binary => "Binary",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of a value the preview may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewMode {
    /// Listing views: previews are cut to a fixed budget
    #[default]
    Bounded,
    /// Single-value views: nothing is cut
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedValue {
    pub key: String,
    /// Parsed document for JSON, the string for text, a size placeholder for binary
    pub value: serde_json::Value,
    pub value_type: ValueKind,
    pub value_size: usize,
    pub is_json: bool,
    pub is_binary: bool,
    pub preview: String,
}

impl ClassifiedValue {
    pub fn kind(&self) -> ValueKind {
        self.value_type
    }
}

/// Classify `raw`, stored under `key`, and render its preview.
pub fn classify(key: &str, raw: &[u8], mode: PreviewMode) -> ClassifiedValue {
    let (kind, value, preview) = if let Ok(document) = serde_json::from_slice::<serde_json::Value>(raw) {
        let preview = match serde_json::to_string_pretty(&document) {
            Ok(pretty) => bound_text(pretty, mode),
            Err(e) => {
                tracing::warn!(key, "failed to re-serialize JSON value: {}", e);
                bound_text(String::from_utf8_lossy(raw).into_owned(), mode)
            }
        };
        (ValueKind::Json, document, preview)
    } else {
        match as_text(raw) {
            Some(text) => {
                let preview = bound_text(text.to_string(), mode);
                (ValueKind::Text, serde_json::Value::String(text.to_string()), preview)
            }
            None => {
                let cap = match mode {
                    PreviewMode::Bounded => Some(BINARY_PREVIEW_BYTES),
                    PreviewMode::Full => None,
                };
                (
                    ValueKind::Binary,
                    serde_json::Value::String(binary_placeholder(raw.len())),
                    hexdump::dump(raw, cap),
                )
            }
        }
    };

    ClassifiedValue {
        key: key.to_string(),
        value,
        value_type: kind,
        value_size: raw.len(),
        is_json: kind == ValueKind::Json,
        is_binary: kind == ValueKind::Binary,
        preview,
    }
}

/// `raw` as text, or `None` if it must be treated as binary.
pub fn as_text(raw: &[u8]) -> Option<&str> {
    if raw.is_empty() || raw.len() > MAX_TEXT_SCAN || raw.contains(&0) {
        return None;
    }
    std::str::from_utf8(raw).ok()
}

pub fn binary_placeholder(len: usize) -> String {
    format!("<{} bytes binary data>", len)
}

fn bound_text(text: String, mode: PreviewMode) -> String {
    match mode {
        PreviewMode::Full => text,
        PreviewMode::Bounded => truncate_chars(text, PREVIEW_CHAR_LIMIT, TRUNCATION_MARKER),
    }
}

/// Cut `text` to at most `limit` characters, appending `marker` when
/// anything was removed. Never splits a code point.
pub fn truncate_chars(mut text: String, limit: usize, marker: &str) -> String {
    if let Some((cut, _)) = text.char_indices().nth(limit) {
        text.truncate(cut);
        text.push_str(marker);
    }
    text
}
