// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record types, record-key computation, and ownership-comment generation.
//!
//! Record kinds are a tagged sum type rather than a structurally-typed
//! union: the record-key function dispatches on the tag, per the
//! re-architecture notes.

use crate::config::RecordType;
use serde::{Deserialize, Serialize};

/// A record this controller wants to exist at the DNS backend, computed
/// fresh on every sync and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredRecord {
    /// A, AAAA, CNAME, SRV, or TXT.
    pub record_type: RecordType,
    /// Fully-resolved record name.
    pub name: String,
    /// Fully-resolved record content (address, target, or text).
    pub content: String,
    /// Time-to-live in seconds.
    pub ttl: u32,
    /// Only meaningful for A/AAAA/CNAME.
    pub proxied: bool,
    /// SRV priority; unused for other record types.
    pub priority: u32,
    /// SRV weight; unused for other record types.
    pub weight: u32,
    /// SRV port; unused for other record types.
    pub port: u32,
    /// Ownership comment identifying the controller and owner-id.
    pub comment: String,
}

/// A record as returned by the DNS backend's listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedRecord {
    /// Backend-assigned identifier.
    pub id: String,
    /// Zone the record lives in.
    pub zone_id: String,
    /// A, AAAA, CNAME, SRV, or TXT.
    pub record_type: RecordType,
    /// Record name as stored at the backend.
    pub name: String,
    /// Record content as stored at the backend.
    pub content: String,
    /// Time-to-live in seconds.
    pub ttl: u32,
    /// Only meaningful for A/AAAA/CNAME.
    pub proxied: bool,
    /// SRV priority; unused for other record types.
    pub priority: u32,
    /// SRV weight; unused for other record types.
    pub weight: u32,
    /// SRV port; unused for other record types.
    pub port: u32,
    /// Comment as stored at the backend.
    pub comment: String,
}

fn record_type_tag(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::A => "A",
        RecordType::AAAA => "AAAA",
        RecordType::CNAME => "CNAME",
        RecordType::SRV => "SRV",
        RecordType::TXT => "TXT",
    }
}

/// Compute the canonical record key used for diffing.
///
/// A/AAAA/CNAME/TXT: `type:name:content`. SRV: `type:name:priority:weight:port:target`
/// (`content` doubles as the SRV target).
#[must_use]
pub fn record_key(
    record_type: RecordType,
    name: &str,
    content: &str,
    priority: u32,
    weight: u32,
    port: u32,
) -> String {
    match record_type {
        RecordType::SRV => format!(
            "{}:{name}:{priority}:{weight}:{port}:{content}",
            record_type_tag(record_type)
        ),
        other => format!("{}:{name}:{content}", record_type_tag(other)),
    }
}

impl DesiredRecord {
    /// This record's canonical key (see [`record_key`]).
    #[must_use]
    pub fn key(&self) -> String {
        record_key(
            self.record_type,
            &self.name,
            &self.content,
            self.priority,
            self.weight,
            self.port,
        )
    }
}

impl OwnedRecord {
    /// This record's canonical key (see [`record_key`]).
    #[must_use]
    pub fn key(&self) -> String {
        record_key(
            self.record_type,
            &self.name,
            &self.content,
            self.priority,
            self.weight,
            self.port,
        )
    }

    /// `true` if this record's comment marks it as owned by `owner_id`.
    #[must_use]
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.comment.starts_with(&ownership_prefix(owner_id))
    }
}

fn ownership_prefix(owner_id: &str) -> String {
    format!("{}:{owner_id}:", crate::constants::OWNERSHIP_PREFIX)
}

/// Build the ownership comment for a record belonging to `owner_id` and
/// `machine_name`, clipped to
/// [`OWNERSHIP_COMMENT_MAX_LEN`](crate::constants::OWNERSHIP_COMMENT_MAX_LEN)
/// bytes by truncating the trailing machine name. Two sufficiently long
/// machine names sharing a 100-byte prefix will collide on this comment;
/// that collision is accepted, not guarded against.
#[must_use]
pub fn ownership_comment(owner_id: &str, machine_name: &str) -> String {
    let prefix = ownership_prefix(owner_id);
    let mut comment = format!("{prefix}{machine_name}");
    if comment.len() > crate::constants::OWNERSHIP_COMMENT_MAX_LEN {
        comment.truncate(crate::constants::OWNERSHIP_COMMENT_MAX_LEN);
        while !comment.is_char_boundary(comment.len()) {
            comment.pop();
        }
    }
    comment
}
