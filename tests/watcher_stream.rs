mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use common::{init_tracing, snapshot, ScriptedStore};
use kvsync::watch::{run_watcher, WatcherEvent};

fn expect_snapshot(event: WatcherEvent) -> kvsync::store::Snapshot {
    match event {
        WatcherEvent::Snapshot(snapshot) => snapshot,
        WatcherEvent::Failed(err) => panic!("unexpected watcher failure: {err}"),
    }
}

#[tokio::test]
async fn snapshots_arrive_in_order_with_advancing_wait_indexes() {
    init_tracing();
    let root = tempdir().unwrap();

    let store = Arc::new(ScriptedStore::new().script(
        "app",
        vec![
            Ok(snapshot(&[("app/a", "1")], 5)),
            Ok(snapshot(&[("app/a", "2")], 9)),
        ],
    ));

    let (events_tx, mut events_rx) = mpsc::channel(1);
    let (_stop_tx, stop_rx) = watch::channel(false);

    tokio::spawn(run_watcher(
        Arc::clone(&store),
        "app".to_string(),
        root.path().to_path_buf(),
        events_tx,
        stop_rx,
    ));

    let first = expect_snapshot(events_rx.recv().await.unwrap());
    assert_eq!(first.index, 5);

    let second = expect_snapshot(events_rx.recv().await.unwrap());
    assert_eq!(second.index, 9);

    // First call reads current state, the next ones resume from the last
    // observed index.
    let indexes = store.wait_indexes("app");
    assert_eq!(indexes[0], None);
    assert_eq!(indexes[1], Some(5));
}

#[tokio::test]
async fn stop_signal_is_honored_before_the_next_poll() {
    init_tracing();
    let root = tempdir().unwrap();

    let store = Arc::new(ScriptedStore::new().script(
        "app",
        vec![
            Ok(snapshot(&[("app/a", "1")], 1)),
            Ok(snapshot(&[("app/a", "2")], 2)),
        ],
    ));

    let (events_tx, mut events_rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);

    // Stop is already set when the watcher starts: the initial snapshot is
    // still emitted, but no long poll is ever issued.
    stop_tx.send(true).unwrap();

    tokio::spawn(run_watcher(
        Arc::clone(&store),
        "app".to_string(),
        root.path().to_path_buf(),
        events_tx,
        stop_rx,
    ));

    let closed = timeout(Duration::from_secs(5), async {
        assert_eq!(expect_snapshot(events_rx.recv().await.unwrap()).index, 1);
        assert!(events_rx.recv().await.is_none(), "watcher should stop");
    })
    .await;

    assert!(closed.is_ok(), "watcher did not stop after the stop signal");
    assert_eq!(store.call_count("app"), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_do_not_end_the_watcher_mid_run() {
    init_tracing();
    let root = tempdir().unwrap();

    // Initial read, one fully exhausted retry batch (1 + 3 attempts), then a
    // successful read: the watcher must keep going and emit the late
    // snapshot.
    let store = Arc::new(ScriptedStore::new().script(
        "app",
        vec![
            Ok(snapshot(&[("app/a", "1")], 1)),
            Err("agent down".into()),
            Err("agent down".into()),
            Err("agent down".into()),
            Err("agent down".into()),
            Ok(snapshot(&[("app/a", "2")], 8)),
        ],
    ));

    let (events_tx, mut events_rx) = mpsc::channel(1);
    let (_stop_tx, stop_rx) = watch::channel(false);

    tokio::spawn(run_watcher(
        Arc::clone(&store),
        "app".to_string(),
        root.path().to_path_buf(),
        events_tx,
        stop_rx,
    ));

    assert_eq!(expect_snapshot(events_rx.recv().await.unwrap()).index, 1);
    assert_eq!(expect_snapshot(events_rx.recv().await.unwrap()).index, 8);

    // One initial read, one exhausted batch of four attempts, one success.
    // The watcher may already be parked in its next poll by now.
    assert!(store.call_count("app") >= 6);
    assert_eq!(store.wait_indexes("app")[..6], [
        None,
        Some(1),
        Some(1),
        Some(1),
        Some(1),
        Some(1),
    ]);
}

#[tokio::test]
async fn initial_read_failure_is_reported_not_retried() {
    init_tracing();
    let root = tempdir().unwrap();

    let store = Arc::new(
        ScriptedStore::new().script("app", vec![Err("no route to host".into())]),
    );

    let (events_tx, mut events_rx) = mpsc::channel(1);
    let (_stop_tx, stop_rx) = watch::channel(false);

    tokio::spawn(run_watcher(
        Arc::clone(&store),
        "app".to_string(),
        root.path().to_path_buf(),
        events_tx,
        stop_rx,
    ));

    match events_rx.recv().await.unwrap() {
        WatcherEvent::Failed(err) => {
            assert_eq!(err.unit_code(), kvsync::errors::EXIT_CONNECT_FAILED);
        }
        WatcherEvent::Snapshot(_) => panic!("expected a failure event"),
    }

    assert!(events_rx.recv().await.is_none(), "watcher should stop");
    assert_eq!(store.call_count("app"), 1);
}
