// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The inventory's machine model and the field lookups the selector and
//! template engines project from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connectivity info reported by the inventory source for a single machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConnectivity {
    /// `IP:port` strings, IPv4 or bracketed IPv6.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// A single machine as reported by the mesh/VPN inventory source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Stable inventory identifier.
    pub id: String,
    /// Full dotted machine name, e.g. `web01.tailnet`.
    pub name: String,
    /// Raw hostname, used when `name` has no dotted component.
    #[serde(default)]
    pub hostname: String,
    /// Mesh IPs assigned to this machine, e.g. `100.x.y.z`.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Free-form tags attached in the inventory source, e.g. `tag:web`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Endpoint list used by the CIDR engine to classify reachable IPs.
    #[serde(default)]
    pub client_connectivity: ClientConnectivity,
    /// Arbitrary additional fields the inventory source reports, addressable
    /// by [`MachineSelector::field`](crate::config::MachineSelector::field)
    /// and by template variables beyond the well-known ones.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Machine {
    /// The machine name used in templates and record generation: the first
    /// dotted component of `name`, falling back to `hostname` when `name`
    /// has no dot or is empty.
    #[must_use]
    pub fn machine_name(&self) -> String {
        match self.name.split('.').next() {
            Some(first) if !first.is_empty() => first.to_string(),
            _ => self.hostname.clone(),
        }
    }

    /// Look up a named field on this machine for selector matching:
    /// `tag`/`tags` → comma-joined tag list, `name` → [`Self::machine_name`],
    /// `hostname` → raw hostname, anything else → direct property access on
    /// `extra`, rendered as a string or comma-joined string sequence.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" | "machineName" => Some(self.machine_name()),
            "hostname" => Some(self.hostname.clone()),
            "id" => Some(self.id.clone()),
            "tag" | "tags" => Some(self.tags.join(",")),
            other => self.extra.get(other).map(render_value),
        }
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Machine {
        Machine {
            id: "m1".to_string(),
            name: "web01.tailnet".to_string(),
            hostname: "web01".to_string(),
            addresses: vec!["100.64.0.1".to_string()],
            tags: vec!["tag:web".to_string(), "tag:prod".to_string()],
            client_connectivity: ClientConnectivity {
                endpoints: vec!["192.168.1.10:41641".to_string(), "8.8.8.8:41641".to_string()],
            },
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn machine_name_is_first_dotted_component() {
        assert_eq!(sample().machine_name(), "web01");
    }

    #[test]
    fn machine_name_falls_back_to_hostname() {
        let mut m = sample();
        m.name = String::new();
        assert_eq!(m.machine_name(), "web01");
    }

    #[test]
    fn resolves_well_known_fields() {
        let m = sample();
        assert_eq!(m.field("name"), Some("web01".to_string()));
        assert_eq!(m.field("hostname"), Some("web01".to_string()));
        assert_eq!(m.field("tag"), Some("tag:web,tag:prod".to_string()));
    }

    #[test]
    fn missing_field_is_none() {
        assert_eq!(sample().field("nonexistent"), None);
    }

    #[test]
    fn extra_field_is_addressable() {
        let mut m = sample();
        m.extra
            .insert("os".to_string(), serde_json::json!("linux"));
        assert_eq!(m.field("os"), Some("linux".to_string()));
    }

    #[test]
    fn extra_sequence_field_joins() {
        let mut m = sample();
        m.extra.insert(
            "roles".to_string(),
            serde_json::json!(["web", "cache"]),
        );
        assert_eq!(m.field("roles"), Some("web,cache".to_string()));
    }
}
