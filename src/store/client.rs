// src/store/client.rs

use std::fs;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Certificate, Client, Identity, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::model::StoreConfig;
use crate::store::snapshot::{KvPair, Snapshot};

/// Read access to the remote KV store.
///
/// `wait_index = None` reads the current state immediately. `Some(i)` blocks
/// server-side until the subtree changes past `i` or the store's own wait
/// timeout elapses, then returns the current full set either way. No
/// client-side timeout is imposed on top of that. All reads are idempotent.
#[async_trait]
pub trait KvRead: Send + Sync {
    async fn list(&self, prefix: &str, wait_index: Option<u64>) -> Result<Snapshot>;
}

/// Wire shape of one entry in the store's recursive list response.
///
/// Directory placeholders carry no value and are skipped.
#[derive(Debug, Deserialize)]
struct RawKvEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: Option<String>,
}

/// KV client over the store's HTTP API.
pub struct HttpKvStore {
    http: Client,
    base_url: String,
    dc: String,
    token: String,
}

impl HttpKvStore {
    /// Build a client from the run's store configuration.
    ///
    /// TLS material is loaded eagerly so that misconfiguration surfaces
    /// before any watcher starts.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut builder = Client::builder();

        if !config.ca_file.is_empty() {
            let pem = fs::read(&config.ca_file)
                .with_context(|| format!("reading CA file {}", config.ca_file))?;
            let cert = Certificate::from_pem(&pem)
                .with_context(|| format!("invalid certificate file: {}", config.ca_file))?;
            builder = builder.add_root_certificate(cert);
        }

        if !config.cert_file.is_empty() && !config.key_file.is_empty() {
            let mut pem = fs::read(&config.cert_file)
                .with_context(|| format!("reading certificate file {}", config.cert_file))?;
            let key = fs::read(&config.key_file)
                .with_context(|| format!("reading key file {}", config.key_file))?;
            pem.extend_from_slice(&key);
            let identity = Identity::from_pem(&pem).with_context(|| {
                format!(
                    "invalid client identity from {} + {}",
                    config.cert_file, config.key_file
                )
            })?;
            builder = builder.identity(identity);
        }

        let scheme = if config.use_tls { "https" } else { "http" };

        Ok(Self {
            http: builder.build().context("building HTTP client")?,
            base_url: format!("{scheme}://{}", config.addr),
            dc: config.dc.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl KvRead for HttpKvStore {
    async fn list(&self, prefix: &str, wait_index: Option<u64>) -> Result<Snapshot> {
        let url = format!("{}/v1/kv/{}", self.base_url, prefix);

        let mut req = self.http.get(&url).query(&[("recurse", "true")]);
        if !self.dc.is_empty() {
            req = req.query(&[("dc", self.dc.as_str())]);
        }
        if let Some(index) = wait_index {
            req = req.query(&[("index", index)]);
        }
        if !self.token.is_empty() {
            req = req.header("X-Consul-Token", &self.token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("listing prefix '{prefix}'"))?;

        let index = consistency_index(&resp);

        // No keys under the prefix yet; an empty subtree is a valid state.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Snapshot::new(Vec::new(), index));
        }

        let resp = resp
            .error_for_status()
            .with_context(|| format!("listing prefix '{prefix}'"))?;

        let entries: Vec<RawKvEntry> = resp
            .json()
            .await
            .with_context(|| format!("decoding list response for prefix '{prefix}'"))?;

        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(encoded) = entry.value else {
                continue;
            };
            let value = BASE64
                .decode(encoded.as_bytes())
                .with_context(|| format!("decoding value for key '{}'", entry.key))?;
            pairs.push(KvPair {
                key: entry.key,
                value,
            });
        }

        debug!(prefix = %prefix, keys = pairs.len(), index, "listed prefix");
        Ok(Snapshot::new(pairs, index))
    }
}

/// Consistency index from the response headers; 0 when absent or malformed.
fn consistency_index(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get("X-Consul-Index")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}
