// src/watch/mod.rs

//! Change watching against the remote store.
//!
//! This module turns the store's blocking list API into an ordered stream of
//! full-subtree snapshots, one watcher per mapping:
//!
//! - [`retry`] wraps the read call with bounded retries and linear backoff.
//! - [`watcher`] owns the long-poll loop and the stop signal handling.
//!
//! It knows nothing about the filesystem layout or the on-change command;
//! that is the reconciler's job.

pub mod retry;
pub mod watcher;

pub use retry::list_with_retries;
pub use watcher::{run_watcher, WatcherEvent};
