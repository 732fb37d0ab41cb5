// src/sync/mod.rs

//! Snapshot reconciliation and per-mapping supervision.
//!
//! - [`reconciler`] holds the per-mapping state machine: diff each incoming
//!   snapshot against the last applied environment, mutate the filesystem,
//!   and run the on-change command.
//! - [`supervisor`] launches one watcher + reconciler pair per mapping and
//!   aggregates their completion codes into the process result.

pub mod reconciler;
pub mod supervisor;

pub use reconciler::{CycleOutcome, Environment, Reconciler};
pub use supervisor::{run_mapping, supervise, watch_and_exec};
