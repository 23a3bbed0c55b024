// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Inbound inventory event webhook: signature validation, then an
//! unconditional resync (the payload is treated as a change notification,
//! not a delta to apply).

use super::state::AppState;
use crate::constants::{WEBHOOK_PATH, WEBHOOK_SIGNATURE_HEADER};
use crate::errors::Error;
use crate::inventory::webhook::{ensure_webhook, normalize_webhook_url, verify_signature};
use crate::reconciler::{sync, SyncResult};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub(crate) owner: Option<String>,
}

fn resolve_owner(state: &AppState, query: &OwnerQuery) -> String {
    query.owner.clone().unwrap_or_else(|| state.default_owner_id.clone())
}

/// `POST /webhook`: validate the HMAC signature (when a secret is
/// configured), then always run a full, non-dry-run sync regardless of the
/// event payload's contents.
pub async fn receive(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<serde_json::Value> {
    let owner_id = resolve_owner(&state, &query);

    let config = match state.config_store.read(&owner_id).await {
        Ok(config) => config,
        Err(err) => return error_envelope(&Error::from(err)),
    };

    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !verify_signature(config.webhook_secret.as_deref(), &body, signature) {
        return Json(json!({ "success": false, "error": { "message": "invalid webhook signature" } }));
    }

    match run_sync(&state, &owner_id, &config, false).await {
        Ok(result) => Json(json!({ "success": true, "result": result })),
        Err(err) => error_envelope(&err),
    }
}

/// `GET /webhook`: operator convenience that ensures the webhook
/// registration against this server's own externally-visible URL, persists
/// the derived URL, then runs a full sync.
pub async fn ensure_and_sync(State(state): State<AppState>, Query(query): Query<OwnerQuery>) -> Json<serde_json::Value> {
    let owner_id = resolve_owner(&state, &query);

    let mut config = match state.config_store.read(&owner_id).await {
        Ok(config) => config,
        Err(err) => return error_envelope(&Error::from(err)),
    };

    let Some(base_url) = config.webhook_url.clone() else {
        return Json(json!({ "success": false, "error": { "message": "webhookUrl is not configured" } }));
    };
    let target_url = normalize_webhook_url(&base_url, WEBHOOK_PATH);

    let inventory = AppState::build_inventory_client(&config);
    match ensure_webhook(inventory.as_ref(), &target_url).await {
        Ok(outcome) => {
            if let crate::inventory::webhook::EnsureOutcome::Created { secret: Some(secret), .. } = outcome {
                config.webhook_secret = Some(secret);
                config.webhook_url = Some(target_url);
                if let Err(err) = state.config_store.write(&owner_id, config.clone()).await {
                    tracing::warn!(%owner_id, error = %err, "failed to persist webhook secret");
                }
            }
        }
        Err(err) => {
            // Webhook ensure failures are logged but never fail the sync.
            tracing::warn!(%owner_id, error = %err, "webhook ensure failed");
        }
    }

    match run_sync(&state, &owner_id, &config, false).await {
        Ok(result) => Json(json!({ "success": true, "result": result })),
        Err(err) => error_envelope(&err),
    }
}

pub(super) async fn run_sync(state: &AppState, owner_id: &str, config: &crate::config::Config, dry_run: bool) -> Result<SyncResult, Error> {
    let _guard = state.acquire_sync_lock(owner_id).await;
    let inventory = AppState::build_inventory_client(config);
    let dns_backend = state.dns_backend_client(owner_id, config);
    sync(config, owner_id, dry_run, inventory.as_ref(), dns_backend.as_ref()).await
}

fn error_envelope(err: &Error) -> Json<serde_json::Value> {
    Json(json!({ "success": false, "error": { "message": err.to_string(), "statusCode": err.status_code() } }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_owner_from_query_or_default() {
        let state = AppState::new(crate::config::store::ConfigStore::new(crate::config::store::MemoryKvStore::default()), "default-owner");
        assert_eq!(resolve_owner(&state, &OwnerQuery { owner: None }), "default-owner");
        assert_eq!(
            resolve_owner(&state, &OwnerQuery { owner: Some("explicit".to_string()) }),
            "explicit"
        );
    }
}
