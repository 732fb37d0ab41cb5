// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::store::{KvRead, Snapshot};
use crate::watch::retry::list_with_retries;

/// What a watcher sends to its reconciler.
#[derive(Debug)]
pub enum WatcherEvent {
    /// A full-subtree snapshot, in the order the watcher received it.
    Snapshot(Snapshot),
    /// The watcher stopped on a fatal error (only the initial read).
    Failed(SyncError),
}

/// Long-poll loop producing snapshots for one mapping's prefix.
///
/// The initial read deliberately has no retry policy, so misconfiguration
/// surfaces immediately; its failure is reported as [`WatcherEvent::Failed`]
/// and ends the watcher. Inside the main loop a retry-exhausted read is
/// logged and the loop continues.
///
/// `stop_rx` is only consulted at the top of the loop: an in-flight long poll
/// is never interrupted mid-call.
pub async fn run_watcher<S: KvRead>(
    store: Arc<S>,
    prefix: String,
    root: PathBuf,
    events_tx: mpsc::Sender<WatcherEvent>,
    stop_rx: watch::Receiver<bool>,
) {
    // Make sure the mapping root exists before the first write cycle.
    if let Err(err) = std::fs::create_dir_all(&root) {
        warn!(prefix = %prefix, dir = ?root, error = %err, "failed to create mapping root directory");
    }

    let initial = match store.list(&prefix, None).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            let failure = SyncError::Connectivity {
                prefix: prefix.clone(),
                source: err,
            };
            let _ = events_tx.send(WatcherEvent::Failed(failure)).await;
            return;
        }
    };

    let mut index = initial.index;
    if events_tx.send(WatcherEvent::Snapshot(initial)).await.is_err() {
        debug!(prefix = %prefix, "event receiver gone before initial snapshot");
        return;
    }

    loop {
        if *stop_rx.borrow() {
            info!(prefix = %prefix, "watcher stopping");
            return;
        }

        let snapshot = match list_with_retries(store.as_ref(), &prefix, Some(index)).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // Connectivity trouble mid-run is not fatal to the mapping.
                warn!(prefix = %prefix, error = %err, "store read retries exhausted; continuing");
                continue;
            }
        };

        debug!(
            prefix = %prefix,
            cur_index = index,
            last_index = snapshot.index,
            "potential index update observed"
        );

        // Advance the wait point on every successful read, changed or not.
        // The stored index never moves backwards.
        index = index.max(snapshot.index);

        if events_tx.send(WatcherEvent::Snapshot(snapshot)).await.is_err() {
            debug!(prefix = %prefix, "event receiver gone; stopping watcher");
            return;
        }
    }
}
