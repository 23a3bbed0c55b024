// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! IP classification and CIDR range selection.
//!
//! IPv4 only in the current revision: IPv6 endpoints are parsed and
//! discarded with a trace log, matching the source behavior this crate
//! preserves rather than silently extending.

use crate::config::{CidrListMode, NamedCidrList};
use crate::machine::Machine;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// `true` if `ip` falls within any of `cidrs`, scanning in order and
/// returning on the first match.
#[must_use]
pub fn in_range(ip: Ipv4Addr, cidrs: &[String]) -> bool {
    cidrs.iter().any(|cidr| {
        cidr.parse::<Ipv4Network>()
            .map(|net| net.contains(ip))
            .unwrap_or(false)
    })
}

/// Parse `IP:port` / `[IPv6]:port` endpoint strings into their IPv4
/// addresses, in input order. IPv6 endpoints are dropped.
#[must_use]
pub fn extract_endpoint_ips(endpoints: &[String]) -> Vec<Ipv4Addr> {
    endpoints
        .iter()
        .filter_map(|endpoint| {
            let host = endpoint.rsplit_once(':').map_or(endpoint.as_str(), |(h, _)| h);
            match host.parse::<Ipv4Addr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::trace!(endpoint = %endpoint, "dropping non-IPv4 endpoint");
                    None
                }
            }
        })
        .collect()
}

/// Select the IPs a machine exposes against one or more named CIDR lists.
///
/// When `list_names` has more than one entry, the union is taken with each
/// list's own range ordering preserved, lists concatenated in the order
/// given.
#[must_use]
pub fn select_from_named_list(
    machine: &Machine,
    list_names: &[&str],
    lists: &[NamedCidrList],
) -> Vec<Ipv4Addr> {
    let endpoint_ips = extract_endpoint_ips(&machine.client_connectivity.endpoints);
    let mut result = Vec::new();

    for list_name in list_names {
        let Some(list) = lists.iter().find(|l| l.name == *list_name) else {
            continue;
        };
        let mut matched = select_from_one_list(&endpoint_ips, list);
        if list.mode == CidrListMode::Single {
            matched.truncate(1);
        }
        for ip in matched {
            if !result.contains(&ip) {
                result.push(ip);
            }
        }
    }

    result
}

fn select_from_one_list(endpoint_ips: &[Ipv4Addr], list: &NamedCidrList) -> Vec<Ipv4Addr> {
    if list.inverse {
        return endpoint_ips
            .iter()
            .copied()
            .filter(|ip| !in_range(*ip, &list.cidrs))
            .collect();
    }

    let mut ordered = Vec::new();
    for cidr in &list.cidrs {
        for ip in endpoint_ips {
            if in_range(*ip, std::slice::from_ref(cidr)) && !ordered.contains(ip) {
                ordered.push(*ip);
            }
        }
    }
    ordered
}
