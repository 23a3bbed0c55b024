// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The scheduled tick: a fixed-period `tokio::time::interval` loop rather
//! than a cron-expression parser, since the spec calls only for a single
//! periodic trigger.

use super::state::AppState;
use super::webhook_receiver::run_sync;
use crate::inventory::webhook::{ensure_webhook, normalize_webhook_url};
use std::time::Duration;

/// Run the scheduled-tick loop forever: on every tick, load the owner's
/// config, best-effort ensure the webhook registration, then run a full,
/// non-dry-run sync. A sync failure is logged and recorded in metrics; it
/// never stops the loop — the next tick is the retry.
pub async fn run(state: AppState, owner_id: String, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        tick(&state, &owner_id).await;
    }
}

async fn tick(state: &AppState, owner_id: &str) {
    let config = match state.config_store.read(owner_id).await {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(%owner_id, error = %err, "scheduled tick: no config for owner, skipping");
            return;
        }
    };

    if let Some(base_url) = &config.webhook_url {
        let target_url = normalize_webhook_url(base_url, crate::constants::WEBHOOK_PATH);
        let inventory = AppState::build_inventory_client(&config);
        if let Err(err) = ensure_webhook(inventory.as_ref(), &target_url).await {
            tracing::warn!(%owner_id, error = %err, "scheduled tick: webhook ensure failed, continuing");
        }
    }

    let started = std::time::Instant::now();
    match run_sync(state, owner_id, &config, false).await {
        Ok(result) => {
            crate::metrics::record_sync(
                owner_id,
                "cron",
                true,
                started.elapsed().as_secs_f64(),
                result.added.len() as i64,
                result.deleted.len() as i64,
            );
            tracing::info!(%owner_id, added = result.added.len(), deleted = result.deleted.len(), "scheduled sync complete");
        }
        Err(err) => {
            crate::metrics::record_sync(owner_id, "cron", false, started.elapsed().as_secs_f64(), 0, 0);
            tracing::error!(%owner_id, error = %err, "scheduled sync failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::{ConfigStore, MemoryKvStore};

    #[tokio::test]
    async fn tick_skips_silently_when_owner_has_no_config() {
        let store = ConfigStore::new(MemoryKvStore::default());
        let state = AppState::new(store, "owner1");
        // Should not panic even though "owner1" has no saved config yet.
        tick(&state, "owner1").await;
    }
}
