// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration data model for the DNS reconciliation controller.
//!
//! A single JSON document per owner-id holds everything an operator has
//! declared: upstream credentials, named CIDR lists, and generation tasks.
//! The document is mutated only through explicit read-modify-write calls
//! (see [`crate::config::store`]); it is never partially updated in place.
//!
//! # Example
//!
//! ```rust
//! use dns_reconciler::config::{Config, NamedCidrList, CidrListMode};
//!
//! let mut config = Config::default();
//! config.named_cidr_lists.push(NamedCidrList {
//!     name: "home-lan".to_string(),
//!     description: None,
//!     cidrs: vec!["192.168.0.0/16".to_string()],
//!     mode: CidrListMode::Multiple,
//!     inverse: false,
//! });
//! assert!(config.validate().is_ok());
//! ```

pub mod store;
pub mod validation;

use serde::{Deserialize, Serialize};

/// Matching mode for a [`NamedCidrList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CidrListMode {
    /// Return only the first matching IP per device.
    Single,
    /// Return all matching IPs per device.
    Multiple,
}

/// A user-defined, ordered set of IPv4 ranges with a matching mode.
///
/// Order is semantically significant: [`crate::cidr::select_from_named_list`]
/// walks `cidrs` in declaration order, so the first range in the list "wins"
/// when resolving endpoint priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCidrList {
    /// Immutable identifier, must match `[A-Za-z0-9_-]+`.
    pub name: String,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Non-empty ordered sequence of IPv4 CIDR strings.
    pub cidrs: Vec<String>,
    /// Single or multiple selection mode.
    pub mode: CidrListMode,
    /// When true, matching is the complement: IPs in none of the ranges.
    #[serde(default)]
    pub inverse: bool,
}

/// Selects which machines a [`GenerationTask`] applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSelector {
    /// `tag`, `name`, `hostname`, or any other field present on a machine.
    pub field: String,
    /// A literal string for exact match, or `/regex/` for regex match.
    pub pattern: String,
}

/// DNS record type a [`RecordTemplate`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    AAAA,
    /// Canonical name (alias) record.
    CNAME,
    /// Service locator record.
    SRV,
    /// Text record.
    TXT,
}

/// A template that projects a matched machine into one or more desired
/// records (see [`crate::generator`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTemplate {
    /// A, AAAA, CNAME, SRV, or TXT.
    pub record_type: RecordType,
    /// Template string with `{{var}}` placeholders, evaluated for the record name.
    pub name: String,
    /// Template string with `{{var}}` placeholders, evaluated for the record value.
    pub value: String,
    /// Time-to-live in seconds. Defaults to 300.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Only meaningful for A/AAAA/CNAME records at the DNS backend.
    #[serde(default)]
    pub proxied: bool,
    /// SRV priority. Defaults to 10.
    #[serde(default = "default_srv_priority")]
    pub priority: u32,
    /// SRV weight. Defaults to 10.
    #[serde(default = "default_srv_weight")]
    pub weight: u32,
    /// SRV port. Defaults to 80.
    #[serde(default = "default_srv_port")]
    pub port: u32,
    /// When set on a non-SRV template, an associated SRV record is emitted
    /// alongside the primary record, named `<srv_prefix>.<resolved name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv_prefix: Option<String>,
    /// Template string for the associated SRV's target. Defaults to the
    /// primary record's resolved name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv_target: Option<String>,
}

fn default_ttl() -> u32 {
    crate::constants::DEFAULT_RECORD_TTL_SECS
}

fn default_srv_priority() -> u32 {
    u32::from(crate::constants::DEFAULT_SRV_PRIORITY)
}

fn default_srv_weight() -> u32 {
    u32::from(crate::constants::DEFAULT_SRV_WEIGHT)
}

fn default_srv_port() -> u32 {
    u32::from(crate::constants::DEFAULT_SRV_PORT)
}

/// A tuple of (selector, record templates) that projects matching machines
/// into desired records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationTask {
    /// Stable identifier, unique within a [`Config`].
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Disabled tasks are skipped entirely during a sync.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The single selector used to pick machines for this task.
    pub machine_selector: MachineSelector,
    /// One or more templates evaluated per matched machine.
    pub record_templates: Vec<RecordTemplate>,
}

fn default_true() -> bool {
    true
}

/// The full per-owner configuration document.
///
/// Unknown fields are preserved on round-trip by the [`store`] layer, which
/// operates on the raw JSON value rather than this typed projection when
/// merging partial patches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Credential for the mesh/VPN inventory source's API.
    #[serde(default)]
    pub inventory_api_key: String,
    /// Credential for the cloud DNS backend's API.
    #[serde(default)]
    pub dns_api_token: String,
    /// Tailnet/account identifier used to scope inventory API calls.
    #[serde(default)]
    pub account_id: String,
    /// Named CIDR lists, keyed by unique `name`.
    #[serde(default)]
    pub named_cidr_lists: Vec<NamedCidrList>,
    /// Ordered sequence of generation tasks.
    #[serde(default)]
    pub generation_tasks: Vec<GenerationTask>,
    /// Webhook URL registered with the inventory source, if ensured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Shared secret used to validate inbound webhook signatures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
}

impl Config {
    /// Look up a named CIDR list by name.
    #[must_use]
    pub fn cidr_list(&self, name: &str) -> Option<&NamedCidrList> {
        self.named_cidr_lists.iter().find(|l| l.name == name)
    }

    /// Find the generation task with the given id.
    #[must_use]
    pub fn task(&self, id: &str) -> Option<&GenerationTask> {
        self.generation_tasks.iter().find(|t| t.id == id)
    }

    /// Validate the document, returning every accumulated field error.
    pub fn validate(&self) -> Result<(), crate::errors::ValidationError> {
        validation::validate_config(self)
    }
}
