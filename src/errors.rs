// src/errors.rs

//! Failure taxonomy and exit codes.
//!
//! Most plumbing uses `anyhow::Result`; [`SyncError`] classifies the failures
//! that matter to a mapping unit's fate and to operator diagnosis. The exit
//! code constants are the process's only machine-readable success/failure
//! signal.

use std::path::PathBuf;

use thiserror::Error;

/// Bad command line or malformed run configuration.
pub const EXIT_USAGE: i32 = 1;
/// The config file could not be read.
pub const EXIT_CONFIG_READ: i32 = 2;
/// The config file could not be parsed.
pub const EXIT_CONFIG_PARSE: i32 = 3;
/// At least one mapping unit returned nonzero.
pub const EXIT_MAPPING_FAILED: i32 = 4;
/// Unit code: the initial read of the mapping's prefix failed.
pub const EXIT_CONNECT_FAILED: i32 = 10;
/// Unit code: the on-change command failed to launch or exited nonzero.
pub const EXIT_COMMAND_FAILED: i32 = 111;

/// Errors raised while synchronizing one mapping.
///
/// Only `Connectivity` (on the very first read), `Config` and `Command` are
/// fatal; `Io` and `Transform` are logged per key and the cycle continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote store could not be read, after retries where applicable.
    #[error("store read for prefix '{prefix}' failed: {source}")]
    Connectivity {
        prefix: String,
        #[source]
        source: anyhow::Error,
    },

    /// Malformed run configuration; fatal before any watcher starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A single file or directory operation failed.
    #[error("{op} failed for {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transform pipeline failed for a single key.
    #[error("transform failed for key '{key}': {source}")]
    Transform {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The on-change command failed to spawn or exited nonzero.
    #[error("on-change command failed: {0}")]
    Command(String),
}

impl SyncError {
    /// Exit code reported by a mapping unit that stopped on this error.
    pub fn unit_code(&self) -> i32 {
        match self {
            SyncError::Command(_) => EXIT_COMMAND_FAILED,
            SyncError::Connectivity { .. } => EXIT_CONNECT_FAILED,
            SyncError::Config(_) | SyncError::Io { .. } | SyncError::Transform { .. } => {
                EXIT_MAPPING_FAILED
            }
        }
    }
}
