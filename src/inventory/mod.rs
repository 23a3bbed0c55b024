// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The mesh/VPN inventory source: machine listing and event-subscription
//! webhook management.

pub mod client;
pub mod webhook;

pub use client::{HttpInventoryClient, InventoryClient};

use serde::{Deserialize, Serialize};

/// A webhook endpoint as reported by the inventory source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    /// Inventory-assigned endpoint identifier.
    pub endpoint_id: String,
    /// The URL the inventory source will POST events to.
    pub url: String,
    /// Event names this endpoint is subscribed to.
    pub subscriptions: Vec<String>,
}

/// Result of creating a new webhook: the secret is returned only this once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWebhook {
    /// Inventory-assigned endpoint identifier.
    pub endpoint_id: String,
    /// Shared secret for HMAC-signing future event payloads, present only
    /// on the response to the create call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}
