// src/sync/supervisor.rs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

use crate::config::model::{MappingSpec, RunSpec};
use crate::errors::{EXIT_CONNECT_FAILED, EXIT_MAPPING_FAILED};
use crate::store::{HttpKvStore, KvRead};
use crate::sync::reconciler::Reconciler;
use crate::watch::{run_watcher, WatcherEvent};

/// Build the store client and supervise all mappings.
///
/// Returns the process exit code.
pub async fn watch_and_exec(spec: &RunSpec) -> i32 {
    let store = match HttpKvStore::new(&spec.store) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(error = %err, "failed to build store client");
            return EXIT_CONNECT_FAILED;
        }
    };

    supervise(store, spec).await
}

/// Launch one watcher + reconciler pair per mapping and block until every
/// unit has reported its completion code.
///
/// The aggregate is 0 only when every unit returned 0. A failing unit never
/// cancels its siblings; each runs to its own natural completion. In
/// continuous mode units never complete and this call blocks forever.
pub async fn supervise<S: KvRead + 'static>(store: Arc<S>, spec: &RunSpec) -> i32 {
    let (result_tx, mut result_rx) = mpsc::channel::<i32>(spec.mappings.len().max(1));

    for mapping in spec.mappings.iter().cloned() {
        let store = Arc::clone(&store);
        let result_tx = result_tx.clone();
        let run_once = spec.run_once;

        tokio::spawn(async move {
            debug!(
                prefix = %mapping.prefix,
                path = %mapping.path,
                on_change = ?mapping.on_change,
                "starting mapping unit"
            );
            let code = run_mapping(store, mapping, run_once).await;
            let _ = result_tx.send(code).await;
        });
    }
    drop(result_tx);

    let mut failures = false;
    while let Some(code) = result_rx.recv().await {
        debug!(code, "mapping unit finished");
        if code != 0 {
            failures = true;
        }
    }

    if failures {
        EXIT_MAPPING_FAILED
    } else {
        0
    }
}

/// Run a single mapping unit: spawn its watcher, then drive the reconciler
/// to completion. Returns the unit's exit code.
///
/// The watcher task is signalled to stop rather than cancelled; an in-flight
/// long poll is left to finish on its own.
pub async fn run_mapping<S: KvRead + 'static>(
    store: Arc<S>,
    mapping: MappingSpec,
    run_once: bool,
) -> i32 {
    // Single-slot handoff: the watcher produces the next snapshot only after
    // the reconciler has taken the previous one.
    let (events_tx, events_rx) = mpsc::channel::<WatcherEvent>(1);
    let (stop_tx, stop_rx) = watch::channel(false);

    tokio::spawn(run_watcher(
        Arc::clone(&store),
        mapping.prefix.clone(),
        PathBuf::from(&mapping.path),
        events_tx,
        stop_rx,
    ));

    let mut reconciler = Reconciler::new(mapping);
    let code = reconciler.run(events_rx, &stop_tx, run_once).await;

    let _ = stop_tx.send(true);
    code
}
