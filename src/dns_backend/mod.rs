// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The cloud DNS backend: zone resolution, owned-record listing, and
//! batched convergence.

pub mod client;
pub mod zone_cache;

pub use client::{DnsBackendClient, HttpDnsBackendClient};

use serde::{Deserialize, Serialize};

/// A zone as reported by the DNS backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Backend-assigned zone identifier.
    pub id: String,
    /// Zone apex, e.g. `example.com`.
    pub name: String,
}
