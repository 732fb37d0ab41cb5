// src/sync/reconciler.rs

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{PathBuf, MAIN_SEPARATOR_STR};
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::model::MappingSpec;
use crate::errors::SyncError;
use crate::store::Snapshot;
use crate::transform::TransformPipeline;
use crate::watch::WatcherEvent;

/// A mapping's last-applied state: relative key → raw value bytes.
///
/// Empty at reconciler start, replaced wholesale on every accepted snapshot,
/// never partially mutated.
pub type Environment = HashMap<String, Vec<u8>>;

/// What one reconcile cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The candidate matched the current environment; nothing was touched.
    Unchanged,
    /// Files were synchronized and the on-change command (if any) succeeded.
    Applied,
}

/// Sequential reconciler for one mapping.
///
/// Consumes snapshots in arrival order and applies them strictly one at a
/// time: the next snapshot is not looked at while a cycle — including its
/// on-change command — is still in progress.
pub struct Reconciler {
    mapping: MappingSpec,
    pipeline: Option<TransformPipeline>,
    env: Environment,
}

impl Reconciler {
    pub fn new(mapping: MappingSpec) -> Self {
        let pipeline = mapping
            .keystore
            .as_deref()
            .filter(|keystore| !keystore.is_empty())
            .map(TransformPipeline::new);

        Self {
            mapping,
            pipeline,
            env: Environment::new(),
        }
    }

    /// Drive the reconciler until the watcher ends, the watcher reports a
    /// fatal error, the on-change command fails, or (in run-once mode) one
    /// cycle completes.
    ///
    /// Returns the mapping unit's exit code.
    pub async fn run(
        &mut self,
        mut events_rx: mpsc::Receiver<WatcherEvent>,
        stop_tx: &watch::Sender<bool>,
        run_once: bool,
    ) -> i32 {
        while let Some(event) = events_rx.recv().await {
            let snapshot = match event {
                WatcherEvent::Snapshot(snapshot) => snapshot,
                WatcherEvent::Failed(err) => {
                    error!(
                        mapping = %self.mapping.prefix,
                        error = %err,
                        "watcher reported fatal error"
                    );
                    return err.unit_code();
                }
            };

            match self.apply_snapshot(snapshot).await {
                Ok(CycleOutcome::Unchanged) => {}
                Ok(CycleOutcome::Applied) => {
                    if run_once {
                        let _ = stop_tx.send(true);
                        info!(mapping = %self.mapping.prefix, "single pass complete");
                        return 0;
                    }
                }
                Err(err) => {
                    error!(
                        mapping = %self.mapping.prefix,
                        error = %err,
                        "stopping mapping"
                    );
                    let _ = stop_tx.send(true);
                    return err.unit_code();
                }
            }
        }

        debug!(mapping = %self.mapping.prefix, "snapshot channel closed; reconciler done");
        0
    }

    /// Apply one snapshot: diff against the current environment, delete
    /// vanished keys, rewrite every current key, then run the on-change
    /// command.
    ///
    /// Returns `Unchanged` when the candidate environment is structurally
    /// equal to the current one — same key set, byte-identical values — in
    /// which case nothing is touched. A failed on-change command is the only
    /// error; file-level failures are logged and skipped.
    pub async fn apply_snapshot(&mut self, snapshot: Snapshot) -> Result<CycleOutcome, SyncError> {
        let candidate = self.build_environment(&snapshot);

        if candidate == self.env {
            debug!(
                mapping = %self.mapping.prefix,
                "snapshot matches current state; skipping cycle"
            );
            return Ok(CycleOutcome::Unchanged);
        }

        // Keys that vanished remotely are removed locally.
        for key in self.env.keys() {
            if candidate.contains_key(key) {
                continue;
            }
            debug!(mapping = %self.mapping.prefix, key = %key, "key no longer present in source");

            let path = self.key_path(key);
            if let Err(err) = fs::remove_file(&path) {
                let err = SyncError::Io {
                    op: "remove",
                    path,
                    source: err,
                };
                warn!(mapping = %self.mapping.prefix, key = %key, error = %err, "failed to remove key");
            }
        }

        // Full rewrite of every current key, changed or not.
        for (key, value) in &candidate {
            self.write_key(key, value);
        }

        // The new baseline reflects the intended state even if individual
        // file operations above failed.
        self.env = candidate;

        self.run_on_change().await?;

        Ok(CycleOutcome::Applied)
    }

    /// Map snapshot pairs to relative keys: the mapping prefix and any
    /// leading separators are stripped.
    fn build_environment(&self, snapshot: &Snapshot) -> Environment {
        let mut env = Environment::with_capacity(snapshot.pairs.len());

        for pair in &snapshot.pairs {
            debug!(mapping = %self.mapping.prefix, key = %pair.key, "key present in source");
            let rel = pair
                .key
                .strip_prefix(&self.mapping.prefix)
                .unwrap_or(&pair.key);
            let rel = rel.trim_start_matches('/');
            env.insert(rel.to_string(), pair.value.clone());
        }

        env
    }

    /// Absolute path for a relative key. Key fragments use `/`; on platforms
    /// with a different separator they are translated before any filesystem
    /// call.
    fn key_path(&self, key: &str) -> PathBuf {
        let joined = format!("{}{}", self.mapping.path, key);
        if MAIN_SEPARATOR_STR == "/" {
            PathBuf::from(joined)
        } else {
            PathBuf::from(joined.replace('/', MAIN_SEPARATOR_STR))
        }
    }

    /// Write one key's file: ensure parent directories, apply the transform
    /// pipeline when configured, then create/truncate, write and flush to
    /// stable storage. Each step's failure is logged independently and skips
    /// only this key; the handle is released on every exit path.
    fn write_key(&self, key: &str, raw: &[u8]) {
        let path = self.key_path(key);

        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                let err = SyncError::Io {
                    op: "create directory",
                    path: parent.to_path_buf(),
                    source: err,
                };
                warn!(
                    mapping = %self.mapping.prefix,
                    key = %key,
                    error = %err,
                    "failed to create parent directory for key"
                );
                // The write below is still attempted; create reports its own
                // failure.
            }
        }

        let bytes = match &self.pipeline {
            Some(pipeline) => match pipeline.apply(raw) {
                Ok(bytes) => bytes,
                Err(err) => {
                    let err = SyncError::Transform {
                        key: key.to_string(),
                        source: err,
                    };
                    warn!(mapping = %self.mapping.prefix, error = %err, "skipping key");
                    return;
                }
            },
            None => raw.to_vec(),
        };

        let mut file = match File::create(&path) {
            Ok(file) => file,
            Err(err) => {
                let err = SyncError::Io {
                    op: "create",
                    path,
                    source: err,
                };
                warn!(mapping = %self.mapping.prefix, key = %key, error = %err, "failed to create file");
                return;
            }
        };

        if let Err(err) = file.write_all(&bytes) {
            let err = SyncError::Io {
                op: "write",
                path,
                source: err,
            };
            warn!(mapping = %self.mapping.prefix, key = %key, error = %err, "failed to write to file");
            return;
        }

        if let Err(err) = file.sync_all() {
            let err = SyncError::Io {
                op: "sync",
                path,
                source: err,
            };
            warn!(mapping = %self.mapping.prefix, key = %key, error = %err, "failed to sync file");
            return;
        }

        debug!(
            mapping = %self.mapping.prefix,
            key = %key,
            file = ?path,
            length = bytes.len(),
            "wrote value to file"
        );
    }

    /// Run the configured on-change command to completion, with stdout and
    /// stderr inherited from this process.
    ///
    /// A launch failure or nonzero exit is fatal to the mapping. Waiting for
    /// the child before touching the next snapshot bounds concurrent command
    /// invocations per mapping to exactly one.
    async fn run_on_change(&self) -> Result<(), SyncError> {
        let Some((program, args)) = self.mapping.on_change.split_first() else {
            return Ok(());
        };

        info!(
            mapping = %self.mapping.prefix,
            command = ?self.mapping.on_change,
            "running on-change command"
        );

        let status = Command::new(program)
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|err| SyncError::Command(format!("failed to launch '{program}': {err}")))?;

        if !status.success() {
            return Err(SyncError::Command(format!(
                "'{program}' exited with {status}"
            )));
        }

        Ok(())
    }
}
