#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, Once};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing_subscriber::{fmt, EnvFilter};

use kvsync::config::model::MappingSpec;
use kvsync::store::{KvPair, KvRead, Snapshot};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// One scripted response: a snapshot, or an error message.
pub type ScriptedResponse = Result<Snapshot, String>;

/// In-memory store that serves prepared responses per prefix.
///
/// Once a prefix's script runs out, further reads never return — like a long
/// poll over a subtree that never changes again — so a watcher parks instead
/// of erroring.
#[derive(Default)]
pub struct ScriptedStore {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    calls: Mutex<Vec<(String, Option<u64>)>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses for a prefix; builder-style so tests read top-down.
    pub fn script(self, prefix: &str, responses: Vec<ScriptedResponse>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(prefix.to_string(), responses.into());
        self
    }

    /// Number of list calls observed for the given prefix.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == prefix)
            .count()
    }

    /// Wait indexes observed for the given prefix, in call order.
    pub fn wait_indexes(&self, prefix: &str) -> Vec<Option<u64>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == prefix)
            .map(|(_, index)| *index)
            .collect()
    }
}

#[async_trait]
impl KvRead for ScriptedStore {
    async fn list(&self, prefix: &str, wait_index: Option<u64>) -> Result<Snapshot> {
        self.calls
            .lock()
            .unwrap()
            .push((prefix.to_string(), wait_index));

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(prefix)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(message)) => Err(anyhow!(message)),
            None => std::future::pending().await,
        }
    }
}

/// Build a snapshot from (key, value) pairs and a consistency index.
pub fn snapshot(pairs: &[(&str, &str)], index: u64) -> Snapshot {
    Snapshot::new(
        pairs
            .iter()
            .map(|(key, value)| KvPair {
                key: (*key).to_string(),
                value: value.as_bytes().to_vec(),
            })
            .collect(),
        index,
    )
}

/// Mapping spec rooted at a directory, with the path normalized the way
/// `validate_and_normalize` would leave it (trailing separator included).
pub fn mapping(prefix: &str, root: &Path) -> MappingSpec {
    MappingSpec {
        prefix: prefix.to_string(),
        path: format!("{}{}", root.display(), std::path::MAIN_SEPARATOR),
        on_change: Vec::new(),
        keystore: None,
    }
}
