// src/config/model.rs

use serde::Deserialize;

/// Connection parameters for the remote KV store.
///
/// Immutable once the run starts; every mapping unit shares the same store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// HTTP API address with port.
    pub addr: String,

    /// Datacenter; the agent-local datacenter is used when empty.
    pub dc: String,

    /// ACL token sent with every read.
    pub token: String,

    /// PEM file with the client private key.
    pub key_file: String,

    /// PEM file with the client certificate.
    pub cert_file: String,

    /// PEM file with the CA root certificate used to verify the store.
    pub ca_file: String,

    /// Enforce use of a secure connection to the store.
    pub use_tls: bool,
}

/// One watched subtree: KV prefix mapped onto a filesystem root, with an
/// optional on-change command and decryption keystore.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MappingSpec {
    /// Key prefix to watch, without a leading `/` after normalization.
    pub prefix: String,

    /// Filesystem root the keys are written under; normalization ensures a
    /// trailing separator.
    pub path: String,

    /// Command to run after each sync cycle, as an explicit argv.
    ///
    /// Never re-split or shell-interpreted.
    pub on_change: Vec<String>,

    /// Directory of keys used for decrypting this mapping's values.
    pub keystore: Option<String>,
}

/// Root configuration object for one run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunSpec {
    /// Run one sync cycle per mapping, then exit.
    pub run_once: bool,

    /// Shared store connection parameters.
    pub store: StoreConfig,

    /// Ordered list of watched mappings; must be non-empty.
    pub mappings: Vec<MappingSpec>,
}
