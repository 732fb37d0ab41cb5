// src/config/mod.rs

//! Configuration loading and validation for kvsync.
//!
//! Responsibilities:
//! - Define the JSON-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and normalize a run spec before any watcher starts
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, LoadError};
pub use model::{MappingSpec, RunSpec, StoreConfig};
pub use validate::validate_and_normalize;
