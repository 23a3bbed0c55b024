// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Chunked batch execution: at most
//! [`MAX_BATCH_OPERATIONS`](crate::constants::MAX_BATCH_OPERATIONS)
//! create/delete operations per call to the DNS backend, deletes ordered
//! before creates within each chunk.

use super::diff::Diff;
use crate::constants::MAX_BATCH_OPERATIONS;
use crate::dns_backend::{client::ZoneApplyOutcome, DnsBackendClient};
use crate::records::{DesiredRecord, OwnedRecord};

enum Op {
    Delete(OwnedRecord),
    Create(DesiredRecord),
}

/// Split a [`Diff`] into chunks of at most `MAX_BATCH_OPERATIONS`
/// operations, each chunk ordering its deletes before its creates.
fn chunk(diff: &Diff) -> Vec<(Vec<OwnedRecord>, Vec<DesiredRecord>)> {
    let mut ops: Vec<Op> = Vec::with_capacity(diff.deletes.len() + diff.creates.len());
    ops.extend(diff.deletes.iter().cloned().map(Op::Delete));
    ops.extend(diff.creates.iter().cloned().map(Op::Create));

    ops.chunks(MAX_BATCH_OPERATIONS)
        .map(|chunk| {
            let mut deletes = Vec::new();
            let mut creates = Vec::new();
            for op in chunk {
                match op {
                    Op::Delete(r) => deletes.push(r.clone()),
                    Op::Create(r) => creates.push(r.clone()),
                }
            }
            (deletes, creates)
        })
        .collect()
}

/// Execute a diff's deletes/creates against the DNS backend, chunked to
/// respect the per-call operation limit. Returns every per-zone outcome
/// across every chunk; a failure in one zone's chunk does not stop the
/// remaining chunks or zones from being attempted.
pub async fn execute(client: &dyn DnsBackendClient, diff: &Diff) -> Vec<ZoneApplyOutcome> {
    let mut outcomes = Vec::new();
    for (deletes, creates) in chunk(diff) {
        outcomes.extend(client.batch_apply_multi(deletes, creates).await);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordType;

    fn desired(n: usize) -> DesiredRecord {
        DesiredRecord {
            record_type: RecordType::A,
            name: format!("h{n}.example.com"),
            content: "1.1.1.1".to_string(),
            ttl: 300,
            proxied: false,
            priority: 0,
            weight: 0,
            port: 0,
            comment: "cf-ts-dns:owner:x".to_string(),
        }
    }

    #[test]
    fn chunks_respect_max_batch_operations() {
        let diff = Diff {
            creates: (0..450).map(desired).collect(),
            deletes: vec![],
        };
        let chunks = chunk(&diff);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].1.len(), MAX_BATCH_OPERATIONS);
        assert_eq!(chunks[2].1.len(), 450 - 2 * MAX_BATCH_OPERATIONS);
    }

    #[test]
    fn deletes_ordered_before_creates_within_a_chunk() {
        let diff = Diff {
            creates: vec![desired(1)],
            deletes: vec![crate::records::OwnedRecord {
                id: "1".to_string(),
                zone_id: "z1".to_string(),
                record_type: RecordType::A,
                name: "old.example.com".to_string(),
                content: "9.9.9.9".to_string(),
                ttl: 300,
                proxied: false,
                priority: 0,
                weight: 0,
                port: 0,
                comment: "cf-ts-dns:owner:old".to_string(),
            }],
        };
        let chunks = chunk(&diff);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].0.len(), 1);
        assert_eq!(chunks[0].1.len(), 1);
    }
}
