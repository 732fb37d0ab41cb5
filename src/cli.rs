// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::model::{MappingSpec, RunSpec, StoreConfig};
use crate::errors::SyncError;

/// Command-line arguments for `kvsync`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "kvsync",
    version,
    about = "Write files from a remote KV prefix and run a command on any change.",
    long_about = "Write files to the specified locations on the local system by reading \
                  key/values from the remote store under the given prefixes and executing \
                  a program on any change. Prefixes and paths must be pipe-delimited if \
                  more than one mapping is given on the command line."
)]
pub struct CliArgs {
    /// Store HTTP API address with port.
    ///
    /// Defaults to the local agent (`127.0.0.1:8500`) when blank.
    #[arg(long, value_name = "HOST:PORT", default_value = "")]
    pub addr: String,

    /// Store datacenter; uses the agent-local datacenter when blank.
    #[arg(long, value_name = "NAME", default_value = "")]
    pub dc: String,

    /// Token to use for ACL access.
    #[arg(long, value_name = "TOKEN", default_value = "")]
    pub token: String,

    /// Directory of keys used for decrypting values.
    #[arg(long, value_name = "DIR")]
    pub keystore: Option<String>,

    /// Run one sync cycle per mapping and exit.
    #[arg(long)]
    pub once: bool,

    /// JSON file containing all configuration (if this is provided, all
    /// other options are ignored).
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `KVSYNC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// KV prefix to watch; pipe-delimited for multiple mappings.
    #[arg(value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Filesystem root to write under; pipe-delimited, paired with PREFIX.
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Command to run after each sync cycle, as an explicit argument list.
    #[arg(value_name = "ONCHANGE", trailing_var_arg = true, allow_hyphen_values = true)]
    pub on_change: Vec<String>,
}

impl CliArgs {
    /// Build a [`RunSpec`] from the command-line surface.
    ///
    /// `prefix` and `path` may be pipe-delimited lists; they must pair up
    /// one-to-one. The trailing arguments form the on-change argv for every
    /// mapping — passed through verbatim, never re-split or shell-interpreted.
    pub fn to_run_spec(&self) -> Result<RunSpec, SyncError> {
        let (Some(prefix), Some(path)) = (&self.prefix, &self.path) else {
            return Err(SyncError::Config(
                "a prefix and a path are required unless --config-file is given".to_string(),
            ));
        };

        let prefixes: Vec<&str> = prefix.split('|').collect();
        let paths: Vec<&str> = path.split('|').collect();

        if prefixes.len() != paths.len() {
            return Err(SyncError::Config(
                "there must be an identical number of prefixes and paths".to_string(),
            ));
        }

        let mappings = prefixes
            .iter()
            .zip(&paths)
            .map(|(prefix, path)| MappingSpec {
                prefix: (*prefix).to_string(),
                path: (*path).to_string(),
                on_change: self.on_change.clone(),
                keystore: self.keystore.clone(),
            })
            .collect();

        Ok(RunSpec {
            run_once: self.once,
            store: StoreConfig {
                addr: self.addr.clone(),
                dc: self.dc.clone(),
                token: self.token.clone(),
                ..StoreConfig::default()
            },
            mappings,
        })
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
