//! File-name helpers: timestamped names, name validation, base64 payloads.

use super::StorageError;
use crate::fsutil::is_temp_file_name;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::sync::LazyLock;

static UNSAFE_TIMESTAMP_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:.]").unwrap());

static DATA_URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:[^;,]+;base64,").unwrap());

/// `<prefix>_<ISO-8601 timestamp>.<extension>`, with `:` and `.` in the
/// timestamp replaced by `-` so the name is valid on every filesystem.
///
/// Two calls inside the same millisecond produce the same name.
pub fn generate_timestamp_file_name(prefix: &str, extension: &str) -> String {
    timestamp_file_name_at(prefix, extension, Utc::now())
}

pub(crate) fn timestamp_file_name_at(prefix: &str, extension: &str, at: DateTime<Utc>) -> String {
    let iso = at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let stamp = UNSAFE_TIMESTAMP_CHARS.replace_all(&iso, "-");
    let extension = extension.trim_start_matches('.');
    format!("{}_{}.{}", prefix, stamp, extension)
}

/// Reject names that would escape the category folder.
pub fn validate_file_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
        || is_temp_file_name(name);
    if invalid {
        return Err(StorageError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Decode a base64 string, accepting an optional `data:<mime>;base64,` prefix.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, StorageError> {
    let body = DATA_URL_PREFIX.replace(payload.trim(), "");
    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| StorageError::InvalidBase64(e.to_string()))
}
