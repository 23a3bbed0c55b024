// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wires the operator REST surface, the webhook receiver, and the metrics
//! endpoint into one `axum::Router`, mirroring the teacher's use of
//! `axum::Router` for its own metrics server.

use super::state::AppState;
use super::{operator_api, webhook_receiver};
use axum::routing::{delete, get, post, put};
use axum::Router;

/// Build the full operator HTTP surface for `state`.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route(crate::constants::WEBHOOK_PATH, post(webhook_receiver::receive).get(webhook_receiver::ensure_and_sync))
        .route("/manual-sync", post(operator_api::manual_sync))
        .route("/sync-status", get(operator_api::sync_status))
        .route("/preview", post(operator_api::preview))
        .route("/cidr-lists", get(operator_api::list_cidr_lists).put(operator_api::upsert_cidr_list))
        .route("/cidr-lists/{name}", delete(operator_api::delete_cidr_list))
        .route("/generation-tasks", get(operator_api::list_generation_tasks).put(operator_api::upsert_generation_task))
        .route("/generation-tasks/{id}", delete(operator_api::delete_generation_task))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics() -> String {
    crate::metrics::encode()
}
