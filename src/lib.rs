// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod store;
pub mod sync;
pub mod transform;
pub mod watch;

use tracing::{error, info};

use crate::cli::CliArgs;
use crate::config::loader::{self, LoadError};
use crate::config::model::RunSpec;
use crate::config::validate::validate_and_normalize;
use crate::errors::{EXIT_CONFIG_PARSE, EXIT_CONFIG_READ, EXIT_USAGE};
use crate::sync::supervisor::watch_and_exec;

/// High-level entry point used by `main.rs`.
///
/// Resolves the run configuration — the config file wins over flags and
/// positionals, matching the `--config-file` help text — validates and
/// normalizes it, then hands off to the mapping supervisor. Returns the
/// process exit code.
pub async fn run(args: CliArgs) -> i32 {
    info!("kvsync initializing");

    let mut spec = match resolve_spec(&args) {
        Ok(spec) => spec,
        Err(code) => return code,
    };

    if let Err(err) = validate_and_normalize(&mut spec) {
        error!(error = %err, "invalid configuration");
        return EXIT_USAGE;
    }

    info!(
        mappings = spec.mappings.len(),
        run_once = spec.run_once,
        addr = %spec.store.addr,
        "starting mapping supervisor"
    );

    watch_and_exec(&spec).await
}

/// Resolve the run spec from the config file or the command line.
fn resolve_spec(args: &CliArgs) -> Result<RunSpec, i32> {
    if let Some(path) = &args.config_file {
        return match loader::load_from_path(path) {
            Ok(spec) => Ok(spec),
            Err(err @ LoadError::Read { .. }) => {
                error!(error = %err, "failed to read config file");
                Err(EXIT_CONFIG_READ)
            }
            Err(err @ LoadError::Parse { .. }) => {
                error!(error = %err, "failed to parse config file");
                Err(EXIT_CONFIG_PARSE)
            }
        };
    }

    args.to_run_spec().map_err(|err| {
        error!(error = %err, "invalid command line");
        EXIT_USAGE
    })
}
