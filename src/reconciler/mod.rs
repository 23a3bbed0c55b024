// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The reconciler: builds the desired record set, reads the owned set,
//! diffs them, and converges the backend.
//!
//! State machine per record key (informative, not enforced by types):
//! `Absent -> Pending-Create -> Present-Correct -> Present-Drifted ->
//! Pending-Replace -> Present-Correct -> Pending-Delete -> Absent`.
//! Transitions are driven only by a full sync; nothing here is stateful
//! between runs.

pub mod batch;
pub mod diff;

use crate::config::Config;
use crate::constants::OWNERSHIP_PREFIX;
use crate::dns_backend::DnsBackendClient;
use crate::errors::Error;
use crate::generator::generate_task_records;
use crate::inventory::InventoryClient;
use crate::records::{DesiredRecord, OwnedRecord};
use crate::selector::matches as selector_matches;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate counts describing one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Records created (or, in dry-run, that would be created).
    pub added_count: usize,
    /// Records deleted (or, in dry-run, that would be deleted).
    pub deleted_count: usize,
    /// Total machines returned by the inventory source.
    pub total_machines: usize,
    /// Distinct machines matched by at least one enabled task's selector.
    pub matched_machines: usize,
}

/// The result of one `sync` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// Records created, or that would be created under `dry_run`.
    pub added: Vec<DesiredRecord>,
    /// Records deleted, or that would be deleted under `dry_run`.
    pub deleted: Vec<OwnedRecord>,
    /// Total records this controller owns after the sync (desired-set size).
    pub managed: usize,
    /// Aggregate counts.
    pub summary: SyncSummary,
}

/// Run one full reconciliation pass for `owner_id`.
///
/// 1. Fetch machines and owned records (via the comment-prefix filter)
///    concurrently, since neither depends on the other; fatal on error.
///    Owned records are grouped by key to surface duplicates.
/// 2. Generate the desired-record map in task declaration order, last task
///    wins on key collision.
/// 3. Diff.
/// 4. If `dry_run`, return the diff unexecuted; else converge the backend in
///    chunks of at most [`crate::constants::MAX_BATCH_OPERATIONS`].
pub async fn sync(
    config: &Config,
    owner_id: &str,
    dry_run: bool,
    inventory: &dyn InventoryClient,
    dns_backend: &dyn DnsBackendClient,
) -> Result<SyncResult, Error> {
    let comment_prefix = format!("{OWNERSHIP_PREFIX}:{owner_id}:");

    // Inventory and owned-records are independent reads; fetch them
    // concurrently rather than paying both round trips sequentially.
    let (machines, owned_records) = futures::try_join!(inventory.list_machines(), dns_backend.list_owned_records(&comment_prefix))
        .map_err(Error::Api)?;

    let mut desired: HashMap<String, DesiredRecord> = HashMap::new();
    let mut matched_machine_ids = std::collections::HashSet::new();

    for task in &config.generation_tasks {
        if !task.enabled {
            continue;
        }
        for machine in &machines {
            if selector_matches(machine, &task.machine_selector).is_some() {
                matched_machine_ids.insert(machine.id.clone());
            }
        }
        for record in generate_task_records(task, &machines, owner_id, config) {
            desired.insert(record.key(), record);
        }
    }

    let owned_by_key = diff::group_owned_by_key(&owned_records);

    let computed_diff = diff::diff(&desired, &owned_by_key, owner_id);

    let summary = SyncSummary {
        added_count: computed_diff.creates.len(),
        deleted_count: computed_diff.deletes.len(),
        total_machines: machines.len(),
        matched_machines: matched_machine_ids.len(),
    };

    if dry_run {
        return Ok(SyncResult {
            added: computed_diff.creates,
            deleted: computed_diff.deletes,
            managed: desired.len(),
            summary,
        });
    }

    let outcomes = batch::execute(dns_backend, &computed_diff).await;
    for outcome in &outcomes {
        if let Some(error) = &outcome.error {
            tracing::warn!(zone_id = %outcome.zone_id, error = %error, "zone batch failed, other zones unaffected");
        }
    }

    Ok(SyncResult {
        added: computed_diff.creates,
        deleted: computed_diff.deletes,
        managed: desired.len(),
        summary,
    })
}
