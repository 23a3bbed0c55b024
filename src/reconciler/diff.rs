// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired/owned diffing.
//!
//! Preserves two documented, possibly-surprising behaviors rather than
//! "fixing" them: duplicate owned records sharing a key are always deleted
//! without checking whether one of them already matches the desired record,
//! and a content-identical owned record with a different comment is treated
//! as drift and replaced even if that comment belongs to a different
//! controller.

use crate::records::{DesiredRecord, OwnedRecord};
use std::collections::HashMap;

/// The result of diffing a desired-record map against an owned-record map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Records to create at the backend.
    pub creates: Vec<DesiredRecord>,
    /// Records to delete at the backend.
    pub deletes: Vec<OwnedRecord>,
}

/// Diff `desired` against `owned`, both keyed by
/// [`crate::records::record_key`].
///
/// `owned_by_key` may contain more than one [`OwnedRecord`] per key: a
/// duplicate is any key with more than one owned record, and every record
/// sharing that key is deleted unconditionally.
#[must_use]
pub fn diff(desired: &HashMap<String, DesiredRecord>, owned_by_key: &HashMap<String, Vec<OwnedRecord>>, owner_id: &str) -> Diff {
    let mut result = Diff::default();

    for (key, desired_record) in desired {
        match owned_by_key.get(key) {
            None => result.creates.push(desired_record.clone()),
            Some(owned) if owned.len() > 1 => {
                // Duplicate: delete every copy unconditionally, then create
                // the single desired record fresh.
                result.deletes.extend(owned.iter().cloned());
                result.creates.push(desired_record.clone());
            }
            Some(owned) => {
                let existing = &owned[0];
                if existing.comment != desired_record.comment || existing.proxied != desired_record.proxied {
                    result.deletes.push(existing.clone());
                    result.creates.push(desired_record.clone());
                }
                // else: present and correct, nothing to do.
            }
        }
    }

    for (key, owned) in owned_by_key {
        if desired.contains_key(key) {
            continue;
        }
        for record in owned {
            if record.is_owned_by(owner_id) {
                result.deletes.push(record.clone());
            }
        }
    }

    result
}

/// Group a flat list of owned records by their record key, preserving
/// every record sharing a key so [`diff`] can detect duplicates.
#[must_use]
pub fn group_owned_by_key(owned: &[OwnedRecord]) -> HashMap<String, Vec<OwnedRecord>> {
    let mut map: HashMap<String, Vec<OwnedRecord>> = HashMap::new();
    for record in owned {
        map.entry(record.key()).or_default().push(record.clone());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordType;

    fn desired(name: &str, content: &str, comment: &str) -> DesiredRecord {
        DesiredRecord {
            record_type: RecordType::A,
            name: name.to_string(),
            content: content.to_string(),
            ttl: 300,
            proxied: false,
            priority: 0,
            weight: 0,
            port: 0,
            comment: comment.to_string(),
        }
    }

    fn owned(name: &str, content: &str, comment: &str, proxied: bool) -> OwnedRecord {
        OwnedRecord {
            id: format!("{name}-{content}"),
            zone_id: "z1".to_string(),
            record_type: RecordType::A,
            name: name.to_string(),
            content: content.to_string(),
            ttl: 300,
            proxied,
            priority: 0,
            weight: 0,
            port: 0,
            comment: comment.to_string(),
        }
    }

    #[test]
    fn missing_owned_record_is_created() {
        let d = desired("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x");
        let mut map = HashMap::new();
        map.insert(d.key(), d.clone());
        let result = diff(&map, &HashMap::new(), "owner");
        assert_eq!(result.creates, vec![d]);
        assert!(result.deletes.is_empty());
    }

    #[test]
    fn matching_record_produces_no_diff() {
        let d = desired("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x");
        let o = owned("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x", false);
        let mut desired_map = HashMap::new();
        desired_map.insert(d.key(), d);
        let owned_map = group_owned_by_key(&[o]);
        let result = diff(&desired_map, &owned_map, "owner");
        assert!(result.creates.is_empty());
        assert!(result.deletes.is_empty());
    }

    #[test]
    fn scenario_s3_proxied_flip_replaces_in_one_batch() {
        let d = desired("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x");
        let mut proxied_desired = d.clone();
        proxied_desired.proxied = true;
        let o = owned("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x", false);

        let mut desired_map = HashMap::new();
        desired_map.insert(proxied_desired.key(), proxied_desired.clone());
        let owned_map = group_owned_by_key(&[o.clone()]);

        let result = diff(&desired_map, &owned_map, "owner");
        assert_eq!(result.deletes, vec![o]);
        assert_eq!(result.creates, vec![proxied_desired]);
    }

    #[test]
    fn scenario_s4_stale_machine_removal_deletes_owned_record() {
        let o = owned("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x", false);
        let owned_map = group_owned_by_key(&[o.clone()]);
        let result = diff(&HashMap::new(), &owned_map, "owner");
        assert_eq!(result.deletes, vec![o]);
        assert!(result.creates.is_empty());
    }

    #[test]
    fn scenario_s5_unrelated_foreign_record_is_left_untouched() {
        let d = desired("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x");
        // Different name entirely, so it shares no key with anything desired.
        let foreign = owned("unrelated.example.com", "9.9.9.9", "other-controller:blah", false);

        let mut desired_map = HashMap::new();
        desired_map.insert(d.key(), d.clone());
        let owned_map = group_owned_by_key(&[foreign.clone()]);

        let result = diff(&desired_map, &owned_map, "owner");
        assert_eq!(result.creates, vec![d]);
        assert!(result.deletes.is_empty());
    }

    #[test]
    fn comment_mismatch_drift_steals_content_identical_foreign_record() {
        let d = desired("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x");
        let foreign = owned("x.example.com", "1.1.1.1", "other-controller:blah", false);

        let mut desired_map = HashMap::new();
        desired_map.insert(d.key(), d.clone());
        // Same key (type:name:content) as desired, but a different owner's
        // comment. This is the documented "steals foreign records" drift
        // behavior, not a safe no-op.
        let owned_map = group_owned_by_key(&[foreign.clone()]);

        let result = diff(&desired_map, &owned_map, "owner");
        assert_eq!(result.deletes, vec![foreign]);
        assert_eq!(result.creates, vec![d]);
    }

    #[test]
    fn property_3_never_deletes_unowned_record_unless_it_is_a_duplicate() {
        let foreign = owned("y.example.com", "2.2.2.2", "other-controller:blah", false);
        let owned_map = group_owned_by_key(&[foreign]);
        // y.example.com is not in desired and not owned by "owner" -> must not be deleted.
        let result = diff(&HashMap::new(), &owned_map, "owner");
        assert!(result.deletes.is_empty());
    }

    #[test]
    fn duplicate_owned_records_are_deleted_unconditionally() {
        let d = desired("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x");
        let o1 = owned("x.example.com", "1.1.1.1", "cf-ts-dns:owner:x", false);
        let mut o2 = o1.clone();
        o2.id = "duplicate-twin".to_string();

        let mut desired_map = HashMap::new();
        desired_map.insert(d.key(), d.clone());
        let owned_map = group_owned_by_key(&[o1.clone(), o2.clone()]);

        let result = diff(&desired_map, &owned_map, "owner");
        assert_eq!(result.deletes.len(), 2);
        assert_eq!(result.creates, vec![d]);
    }
}
