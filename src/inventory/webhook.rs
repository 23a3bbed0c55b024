// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ensure-webhook protocol and inbound signature validation.

use super::{InventoryClient, Webhook};
use crate::constants::REQUIRED_WEBHOOK_SUBSCRIPTIONS;
use crate::errors::ApiError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Normalize a webhook target URL: strip a trailing slash, then append the
/// receiver path if it is not already present.
#[must_use]
pub fn normalize_webhook_url(base_url: &str, receiver_path: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(receiver_path) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{receiver_path}")
    }
}

/// Outcome of the ensure-webhook protocol, telling the caller what (if
/// anything) needs to be persisted into the [`crate::config::Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A matching webhook already had sufficient subscriptions.
    AlreadySatisfied { endpoint_id: String },
    /// An existing webhook's subscriptions were updated in place.
    Updated { endpoint_id: String },
    /// A new webhook was created; `secret` must be persisted immediately.
    Created { endpoint_id: String, secret: Option<String> },
}

/// Find an existing webhook whose normalized URL equals `target_url`; if its
/// subscription set is a superset of the required set, no-op; else update
/// it; else create a new one. Required subscriptions are fixed
/// (`nodeCreated`, `nodeDeleted`).
pub async fn ensure_webhook(client: &dyn InventoryClient, target_url: &str) -> Result<EnsureOutcome, ApiError> {
    let required: Vec<String> = REQUIRED_WEBHOOK_SUBSCRIPTIONS.iter().map(|s| s.to_string()).collect();
    let webhooks = client.list_webhooks().await?;

    if let Some(existing) = find_matching(&webhooks, target_url) {
        let has_all = required.iter().all(|sub| existing.subscriptions.contains(sub));
        if has_all {
            return Ok(EnsureOutcome::AlreadySatisfied {
                endpoint_id: existing.endpoint_id.clone(),
            });
        }

        let mut subscriptions = existing.subscriptions.clone();
        for sub in &required {
            if !subscriptions.contains(sub) {
                subscriptions.push(sub.clone());
            }
        }
        client.update_webhook(&existing.endpoint_id, &subscriptions).await?;
        return Ok(EnsureOutcome::Updated {
            endpoint_id: existing.endpoint_id.clone(),
        });
    }

    let created = client.create_webhook(target_url, &required).await?;
    Ok(EnsureOutcome::Created {
        endpoint_id: created.endpoint_id,
        secret: created.secret,
    })
}

fn find_matching<'a>(webhooks: &'a [Webhook], target_url: &str) -> Option<&'a Webhook> {
    webhooks.iter().find(|w| w.url.trim_end_matches('/') == target_url.trim_end_matches('/'))
}

/// Validate an inbound webhook's HMAC-SHA256 signature against `secret`,
/// over the raw request body, in constant time.
///
/// Returns `true` when `secret` is absent: the caller is expected to log a
/// warning and still proceed, per the configurable missing-secret fallback.
#[must_use]
pub fn verify_signature(secret: Option<&str>, raw_body: &[u8], signature_header: Option<&str>) -> bool {
    let Some(secret) = secret else {
        tracing::warn!("webhook secret not configured; accepting unsigned payload");
        return true;
    };
    let Some(signature_hex) = signature_header else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();
    let expected_hex = hex::encode(expected);

    constant_time_eq(expected_hex.as_bytes(), signature_hex.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
