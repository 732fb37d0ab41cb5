// src/config/validate.rs

use std::path::MAIN_SEPARATOR;

use crate::config::model::RunSpec;
use crate::errors::SyncError;

/// Validate a run spec and normalize it in place.
///
/// Checks:
/// - there is at least one mapping
/// - every prefix and path is non-empty after normalization
///
/// Normalization:
/// - blank store address falls back to the local agent
/// - one leading `/` is stripped from each prefix
/// - a stray trailing `"` is stripped from each path (a Windows quoting
///   artifact when the configured path contains spaces and ends with a
///   backslash)
/// - a trailing platform separator is ensured on each path
pub fn validate_and_normalize(spec: &mut RunSpec) -> Result<(), SyncError> {
    if spec.store.addr.is_empty() {
        spec.store.addr = "127.0.0.1:8500".to_string();
    }

    if spec.mappings.is_empty() {
        return Err(SyncError::Config(
            "at least one mapping is required".to_string(),
        ));
    }

    for mapping in &mut spec.mappings {
        if let Some(stripped) = mapping.prefix.strip_prefix('/') {
            mapping.prefix = stripped.to_string();
        }

        if let Some(stripped) = mapping.path.strip_suffix('"') {
            mapping.path = stripped.to_string();
        }
        if !mapping.path.is_empty() && !mapping.path.ends_with(MAIN_SEPARATOR) {
            mapping.path.push(MAIN_SEPARATOR);
        }

        if mapping.prefix.is_empty() {
            return Err(SyncError::Config(format!(
                "mapping for path '{}' has an empty prefix",
                mapping.path
            )));
        }
        if mapping.path.is_empty() {
            return Err(SyncError::Config(format!(
                "mapping for prefix '{}' has an empty path",
                mapping.prefix
            )));
        }
    }

    Ok(())
}
