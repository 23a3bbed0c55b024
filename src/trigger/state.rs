// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared application state: the config store, upstream client factory, and
//! the per-owner sync lock registry.

use crate::config::store::ConfigStore;
use crate::config::Config;
use crate::constants::{DNS_BACKEND_API_BASE_URL, INVENTORY_API_BASE_URL};
use crate::dns_backend::{DnsBackendClient, HttpDnsBackendClient};
use crate::inventory::{HttpInventoryClient, InventoryClient};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// A cached [`HttpDnsBackendClient`] plus the token it was built with, so a
/// credential rotation is detected without discarding the client on every
/// call.
struct DnsClientEntry {
    token: String,
    client: Arc<HttpDnsBackendClient>,
}

/// Shared, cloneable handle to everything the trigger layer needs.
#[derive(Clone)]
pub struct AppState {
    /// Per-owner configuration document store.
    pub config_store: ConfigStore,
    /// Owner-id used when a request does not specify one.
    pub default_owner_id: String,
    sync_locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    /// One long-lived DNS backend client per owner, so its zone-listing
    /// cache (see [`crate::dns_backend::zone_cache::TtlCache`]) survives
    /// across syncs instead of starting cold on every call.
    dns_clients: Arc<Mutex<HashMap<String, DnsClientEntry>>>,
}

impl AppState {
    /// Build application state around `config_store`, defaulting unscoped
    /// requests to `default_owner_id`.
    #[must_use]
    pub fn new(config_store: ConfigStore, default_owner_id: impl Into<String>) -> Self {
        Self {
            config_store,
            default_owner_id: default_owner_id.into(),
            sync_locks: Arc::new(Mutex::new(HashMap::new())),
            dns_clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build the inventory client for one owner's stored credentials. A
    /// fresh client is built per call: it holds no cache worth keeping
    /// alive, and credentials may change between syncs.
    #[must_use]
    pub fn build_inventory_client(config: &Config) -> Box<dyn InventoryClient> {
        Box::new(HttpInventoryClient::new(INVENTORY_API_BASE_URL, &config.account_id, &config.inventory_api_key))
    }

    /// Return this owner's long-lived DNS backend client, building it (and
    /// its zone cache) once and reusing it on every subsequent call. Rebuilt
    /// only when the stored API token has changed since the client was
    /// cached, which also resets the zone cache — a rotated token may point
    /// at a different account.
    pub fn dns_backend_client(&self, owner_id: &str, config: &Config) -> Arc<dyn DnsBackendClient> {
        let mut clients = self.dns_clients.lock().unwrap();
        if let Some(entry) = clients.get(owner_id) {
            if entry.token == config.dns_api_token {
                return entry.client.clone();
            }
        }

        let client = Arc::new(HttpDnsBackendClient::new(DNS_BACKEND_API_BASE_URL, &config.dns_api_token));
        clients.insert(
            owner_id.to_string(),
            DnsClientEntry {
                token: config.dns_api_token.clone(),
                client: client.clone(),
            },
        );
        client
    }

    /// Acquire the per-owner sync lock, reducing redundant concurrent work
    /// without risking deadlock: the lock is only ever held at the top of a
    /// single sync, never nested.
    pub async fn acquire_sync_lock(&self, owner_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.sync_locks.lock().unwrap();
            locks
                .entry(owner_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
