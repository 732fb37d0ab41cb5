// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::model::RunSpec;

/// Why loading the config file failed.
///
/// Read and parse failures carry distinct process exit codes, so the loader
/// keeps them apart instead of collapsing both into one error.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing JSON config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load a run spec from a JSON config file.
///
/// This only performs deserialization; it does **not** validate or normalize
/// the spec. Use [`crate::config::validate::validate_and_normalize`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RunSpec, LoadError> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let spec: RunSpec = serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(spec)
}
