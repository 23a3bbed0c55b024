// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator-facing REST surface: manual sync/status, generator-only
//! preview, and CRUD for CIDR lists and generation tasks.

use super::state::AppState;
use super::webhook_receiver::{run_sync, OwnerQuery};
use crate::config::{Config, GenerationTask, NamedCidrList};
use crate::constants::PREVIEW_MAX_RECORDS;
use crate::errors::{ConfigError, Error};
use crate::generator::generate_task_records;
use crate::inventory::InventoryClient;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

fn envelope_ok(body: serde_json::Value) -> Json<serde_json::Value> {
    let mut map = serde_json::Map::new();
    map.insert("success".to_string(), json!(true));
    if let serde_json::Value::Object(fields) = body {
        map.extend(fields);
    }
    Json(serde_json::Value::Object(map))
}

fn envelope_err(err: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "success": false, "error": { "message": err.to_string() } })))
}

async fn owner_config(state: &AppState, owner_id: &str) -> Result<Config, Error> {
    state.config_store.read(owner_id).await
}

/// `POST /manual-sync`
pub async fn manual_sync(State(state): State<AppState>, Query(query): Query<OwnerQuery>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = query.owner.unwrap_or_else(|| state.default_owner_id.clone());
    match owner_config(&state, &owner_id).await {
        Ok(config) => match run_sync(&state, &owner_id, &config, false).await {
            Ok(result) => (StatusCode::OK, envelope_ok(json!({ "result": result }))),
            Err(err) => envelope_err(&err),
        },
        Err(err) => envelope_err(&err),
    }
}

/// `GET /sync-status`
pub async fn sync_status(State(state): State<AppState>, Query(query): Query<OwnerQuery>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = query.owner.unwrap_or_else(|| state.default_owner_id.clone());
    match owner_config(&state, &owner_id).await {
        Ok(config) => match run_sync(&state, &owner_id, &config, true).await {
            Ok(result) => (StatusCode::OK, envelope_ok(json!({ "result": result }))),
            Err(err) => envelope_err(&err),
        },
        Err(err) => envelope_err(&err),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct PreviewRequest {
    owner: Option<String>,
    task: GenerationTask,
}

/// `POST /preview`: generator-only, no backend read/write. Evaluates the
/// supplied unpersisted task draft against the owner's current named CIDR
/// lists and live inventory, returning at most
/// [`PREVIEW_MAX_RECORDS`] records.
pub async fn preview(State(state): State<AppState>, Json(request): Json<PreviewRequest>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = request.owner.unwrap_or_else(|| state.default_owner_id.clone());
    let config = match owner_config(&state, &owner_id).await {
        Ok(config) => config,
        Err(err) => return envelope_err(&err),
    };

    let inventory = AppState::build_inventory_client(&config);
    let machines = match inventory.list_machines().await {
        Ok(machines) => machines,
        Err(err) => return envelope_err(&Error::Api(err)),
    };

    let mut records = generate_task_records(&request.task, &machines, &owner_id, &config);
    records.truncate(PREVIEW_MAX_RECORDS);

    (StatusCode::OK, envelope_ok(json!({ "records": records })))
}

/// `GET /cidr-lists`
pub async fn list_cidr_lists(State(state): State<AppState>, Query(query): Query<OwnerQuery>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = query.owner.unwrap_or_else(|| state.default_owner_id.clone());
    match owner_config(&state, &owner_id).await {
        Ok(config) => (StatusCode::OK, envelope_ok(json!({ "cidrLists": config.named_cidr_lists }))),
        Err(err) => envelope_err(&err),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct CidrListUpsert {
    owner: Option<String>,
    list: NamedCidrList,
}

/// `PUT /cidr-lists` (upsert by name)
pub async fn upsert_cidr_list(State(state): State<AppState>, Json(request): Json<CidrListUpsert>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = request.owner.unwrap_or_else(|| state.default_owner_id.clone());
    let mut config = match owner_config(&state, &owner_id).await {
        Ok(config) => config,
        Err(_) => Config::default(),
    };

    if let Some(existing) = config.named_cidr_lists.iter_mut().find(|l| l.name == request.list.name) {
        *existing = request.list;
    } else {
        config.named_cidr_lists.push(request.list);
    }

    match state.config_store.write(&owner_id, config).await {
        Ok(saved) => (StatusCode::OK, envelope_ok(json!({ "cidrLists": saved.named_cidr_lists }))),
        Err(err) => envelope_err(&err),
    }
}

/// `DELETE /cidr-lists/{name}`: fails with `CidrListInUse` while any
/// template references the list.
pub async fn delete_cidr_list(State(state): State<AppState>, Path(name): Path<String>, Query(query): Query<OwnerQuery>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = query.owner.unwrap_or_else(|| state.default_owner_id.clone());
    let mut config = match owner_config(&state, &owner_id).await {
        Ok(config) => config,
        Err(err) => return envelope_err(&err),
    };

    if let Some(task_id) = crate::config::validation::cidr_list_referenced_by(&config, &name) {
        let err = Error::Config(ConfigError::CidrListInUse { name: name.clone(), task_id });
        return envelope_err(&err);
    }

    config.named_cidr_lists.retain(|l| l.name != name);
    match state.config_store.write(&owner_id, config).await {
        Ok(saved) => (StatusCode::OK, envelope_ok(json!({ "cidrLists": saved.named_cidr_lists }))),
        Err(err) => envelope_err(&err),
    }
}

/// `GET /generation-tasks`
pub async fn list_generation_tasks(State(state): State<AppState>, Query(query): Query<OwnerQuery>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = query.owner.unwrap_or_else(|| state.default_owner_id.clone());
    match owner_config(&state, &owner_id).await {
        Ok(config) => (StatusCode::OK, envelope_ok(json!({ "generationTasks": config.generation_tasks }))),
        Err(err) => envelope_err(&err),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct GenerationTaskUpsert {
    owner: Option<String>,
    task: GenerationTask,
}

/// `PUT /generation-tasks` (upsert by id)
pub async fn upsert_generation_task(State(state): State<AppState>, Json(request): Json<GenerationTaskUpsert>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = request.owner.unwrap_or_else(|| state.default_owner_id.clone());
    let mut config = match owner_config(&state, &owner_id).await {
        Ok(config) => config,
        Err(_) => Config::default(),
    };

    if let Some(existing) = config.generation_tasks.iter_mut().find(|t| t.id == request.task.id) {
        *existing = request.task;
    } else {
        config.generation_tasks.push(request.task);
    }

    match state.config_store.write(&owner_id, config).await {
        Ok(saved) => (StatusCode::OK, envelope_ok(json!({ "generationTasks": saved.generation_tasks }))),
        Err(err) => envelope_err(&err),
    }
}

/// `DELETE /generation-tasks/{id}`
pub async fn delete_generation_task(State(state): State<AppState>, Path(id): Path<String>, Query(query): Query<OwnerQuery>) -> (StatusCode, Json<serde_json::Value>) {
    let owner_id = query.owner.unwrap_or_else(|| state.default_owner_id.clone());
    let mut config = match owner_config(&state, &owner_id).await {
        Ok(config) => config,
        Err(err) => return envelope_err(&err),
    };

    config.generation_tasks.retain(|t| t.id != id);
    match state.config_store.write(&owner_id, config).await {
        Ok(saved) => (StatusCode::OK, envelope_ok(json!({ "generationTasks": saved.generation_tasks }))),
        Err(err) => envelope_err(&err),
    }
}
