// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed read/merge/write access to the persisted [`Config`] document.
//!
//! The store is built on top of an assumed collaborator: a plain
//! KV-like `get(key)`/`put(key, value)` backend (see [`KvStore`]). This
//! crate never talks to a concrete database; it only depends on that
//! narrow contract, per the scope boundary in `spec.md` §1.

use super::Config;
use crate::errors::{ConfigError, Error};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// The narrow KV contract this crate assumes of its persistence layer.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the raw bytes stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    /// Store `value` at `key`, overwriting any prior value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), Error>;
}

/// In-memory [`KvStore`] used by tests and local development.
///
/// Grounded on the teacher's preference for small, explicit test doubles
/// (`tempfile`-backed fixtures) over mocking frameworks.
#[derive(Default)]
pub struct MemoryKvStore {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        self.data.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// A [`KvStore`] backed by one JSON file per key in a directory, used for
/// single-operator local deployments where a full database is overkill.
pub struct FileKvStore {
    dir: std::path::PathBuf,
}

impl FileKvStore {
    /// Create a store rooted at `dir`. The directory must already exist.
    #[must_use]
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> std::path::PathBuf {
        // Keys are owner-scoped settings paths like "owner123/settings";
        // flatten the separator so each key maps to one file.
        self.dir.join(key.replace('/', "_"))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::App(crate::errors::AppError(format!(
                "reading config key '{key}': {e}"
            )))),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(|e| Error::App(crate::errors::AppError(format!(
                "writing config key '{key}': {e}"
            ))))
    }
}

/// Typed read/merge/write access to one owner's [`Config`] document.
#[derive(Clone)]
pub struct ConfigStore {
    kv: Arc<dyn KvStore>,
}

fn settings_key(owner_id: &str) -> String {
    format!("{owner_id}/settings")
}

/// Secret-string fields checked for the "all one mask character" pattern on
/// write. A value that is entirely a repeated non-alphanumeric character is
/// treated as "unchanged" and replaced with the prior document's value.
fn is_masked_value(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let mut chars = value.chars();
    let first = chars.next().unwrap();
    !first.is_alphanumeric() && value.chars().all(|c| c == first)
}

impl ConfigStore {
    /// Wrap a [`KvStore`] backend.
    pub fn new(kv: impl KvStore + 'static) -> Self {
        Self { kv: Arc::new(kv) }
    }

    /// Read the configuration document for `owner_id` as a raw JSON value,
    /// preserving fields [`Config`] does not know about.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no document has ever been
    /// written for this owner.
    async fn read_raw(&self, owner_id: &str) -> Result<Value, Error> {
        let raw = self
            .kv
            .get(&settings_key(owner_id))
            .await?
            .ok_or_else(|| ConfigError::NotFound {
                owner_id: owner_id.to_string(),
            })?;
        serde_json::from_slice(&raw)
            .map_err(|e| Error::App(crate::errors::AppError(format!("corrupt config: {e}"))))
    }

    /// Read the configuration document for `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no document has ever been
    /// written for this owner.
    pub async fn read(&self, owner_id: &str) -> Result<Config, Error> {
        let raw = self.read_raw(owner_id).await?;
        serde_json::from_value(raw)
            .map_err(|e| Error::App(crate::errors::AppError(format!("corrupt config: {e}"))))
    }

    /// Validate and persist a full replacement document.
    ///
    /// Before writing, the document is schema-validated; invalid input
    /// fails with [`ConfigError::Invalid`] and no change is persisted.
    /// Secret fields equal to the mask literal are substituted from the
    /// prior document, byte-exactly. Fields not present on [`Config`] that
    /// exist in the prior stored document are preserved: the merge happens
    /// against the raw JSON, not a round trip through the typed struct.
    pub async fn write(&self, owner_id: &str, config: Config) -> Result<Config, Error> {
        let patch = serde_json::to_value(&config)
            .map_err(|e| Error::App(crate::errors::AppError(format!("serializing config: {e}"))))?;
        self.merge_and_persist(owner_id, patch).await
    }

    /// Read-modify-write: apply `patch` (a raw JSON merge patch) to the
    /// current document and persist the result. Fields not present in
    /// [`Config`] round-trip untouched, since the merge operates on the raw
    /// JSON value rather than a typed projection.
    pub async fn patch(&self, owner_id: &str, patch: Value) -> Result<Config, Error> {
        self.merge_and_persist(owner_id, patch).await
    }

    /// Merge `patch` onto the raw stored document (or an empty document, if
    /// none exists yet), validate the resulting typed view, unmask any
    /// secret fields carrying the mask literal, and persist the merged raw
    /// document — never the typed struct directly, so unknown fields
    /// survive.
    async fn merge_and_persist(&self, owner_id: &str, patch: Value) -> Result<Config, Error> {
        let mut raw = match self.read_raw(owner_id).await {
            Ok(raw) => raw,
            Err(Error::Config(ConfigError::NotFound { .. })) => Value::Object(serde_json::Map::new()),
            Err(err) => return Err(err),
        };
        let prior: Config = serde_json::from_value(raw.clone()).unwrap_or_default();

        merge_json(&mut raw, patch);

        let mut config: Config = serde_json::from_value(raw.clone())
            .map_err(|e| Error::App(crate::errors::AppError(format!("applying patch: {e}"))))?;

        unmask_secrets(&mut config, &prior);
        config
            .validate()
            .map_err(|e| Error::Config(ConfigError::Invalid(e)))?;

        if let Some(map) = raw.as_object_mut() {
            map.insert("inventoryApiKey".to_string(), Value::String(config.inventory_api_key.clone()));
            map.insert("dnsApiToken".to_string(), Value::String(config.dns_api_token.clone()));
            match &config.webhook_secret {
                Some(secret) => {
                    map.insert("webhookSecret".to_string(), Value::String(secret.clone()));
                }
                None => {
                    map.remove("webhookSecret");
                }
            }
            // Both fields use `skip_serializing_if`, so a merge-patch that
            // omits a now-cleared field would otherwise leave its stale
            // value behind in the raw document.
            match &config.webhook_url {
                Some(url) => {
                    map.insert("webhookUrl".to_string(), Value::String(url.clone()));
                }
                None => {
                    map.remove("webhookUrl");
                }
            }
        }

        let bytes = serde_json::to_vec(&raw)
            .map_err(|e| Error::App(crate::errors::AppError(format!("serializing config: {e}"))))?;
        self.kv.put(&settings_key(owner_id), bytes).await?;
        Ok(config)
    }
}

fn unmask_secrets(config: &mut Config, prior: &Config) {
    if is_masked_value(&config.inventory_api_key) {
        config.inventory_api_key = prior.inventory_api_key.clone();
    }
    if is_masked_value(&config.dns_api_token) {
        config.dns_api_token = prior.dns_api_token.clone();
    }
    if let Some(secret) = &config.webhook_secret {
        if is_masked_value(secret) {
            config.webhook_secret = prior.webhook_secret.clone();
        }
    }
}

fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                merge_json(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value;
        }
    }
}

/// Mask a secret for UI-facing reads: true secrets are never returned
/// except masked.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    crate::constants::SECRET_MASK_CHAR
        .to_string()
        .repeat(secret.len().max(8))
}
