//! Gallery metadata parsing
//!
//! The metadata entry is relaxed JSON (comments, unquoted keys, trailing
//! commas) shaped like `{"gallery_info": {"source": {"gid": ...}}}`.

use serde_json::Value;
use std::path::Path;

use crate::error::MetadataError;

/// Extract `gallery_info.source.gid` as a file-name-safe string
pub fn gallery_identifier(bytes: &[u8], entry: &str) -> Result<String, MetadataError> {
    let text = std::str::from_utf8(bytes).map_err(|e| MetadataError::Parse {
        entry: entry.to_string(),
        reason: e.to_string(),
    })?;
    let text = text.trim_start_matches('\u{feff}');

    let document: Value = json5::from_str(text).map_err(|e| MetadataError::Parse {
        entry: entry.to_string(),
        reason: e.to_string(),
    })?;

    let gid = document
        .pointer("/gallery_info/source/gid")
        .ok_or_else(|| MetadataError::MissingIdentifier {
            entry: entry.to_string(),
        })?;

    let identifier = match gid {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => render_number(n),
        Value::Null => {
            return Err(MetadataError::MissingIdentifier {
                entry: entry.to_string(),
            })
        }
        other => other.to_string(),
    };

    if !is_safe_file_stem(&identifier) {
        return Err(MetadataError::InvalidIdentifier {
            entry: entry.to_string(),
            value: identifier,
        });
    }

    Ok(identifier)
}

/// `<identifier>.<original extension>`, or just the identifier when the
/// original has no extension
pub fn destination_name(identifier: &str, original: &Path) -> String {
    match original.extension() {
        Some(ext) => format!("{}.{}", identifier, ext.to_string_lossy()),
        None => identifier.to_string(),
    }
}

/// Relaxed JSON parsers may hand back integral ids as floats
fn render_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_u64() {
        return i.to_string();
    }
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

fn is_safe_file_stem(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control())
}
