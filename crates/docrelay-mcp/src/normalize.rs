//! Turns upstream content blocks into one readable string.
//!
//! Upstream results usually arrive as a single text block holding JSON that is
//! wrapped in a `{"content": {"result": {...}}}` envelope. The envelope is
//! peeled off, `null` pagination noise is dropped, and the remainder is
//! pretty-printed. Text that is not JSON passes through untouched, and
//! non-text blocks are skipped. None of this can fail.

use crate::protocol::ContentBlock;
use serde_json::{Map, Value};

/// Fields removed from a result object when their value is `null`.
const NULLABLE_FIELDS: [&str; 2] = ["next_token", "failed_regions"];

/// Render every text block in order and join them with newlines.
pub fn format_content(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(format_text(text)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a single text payload.
pub fn format_text(text: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(text) else {
        return text.to_string();
    };

    let mut value = unwrap_envelope(parsed);
    if let Value::Object(map) = &mut value {
        strip_null_fields(map);
    }

    serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string())
}

/// Replace `{"content": {"result": {...}}}` with the inner result object.
///
/// `pointer` only resolves when both `content` and the root are objects, so a
/// non-object at any level leaves the value as it was.
fn unwrap_envelope(value: Value) -> Value {
    match value.pointer("/content/result") {
        Some(result @ Value::Object(_)) => result.clone(),
        _ => value,
    }
}

fn strip_null_fields(map: &mut Map<String, Value>) {
    map.retain(|key, value| !(value.is_null() && NULLABLE_FIELDS.contains(&key.as_str())));
}
