// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared wiremock scaffolding for the inventory source and DNS backend
//! doubles used across the integration suite.

use dns_reconciler::dns_backend::HttpDnsBackendClient;
use dns_reconciler::inventory::HttpInventoryClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub async fn mock_inventory_with_machines(machines: serde_json::Value) -> (MockServer, HttpInventoryClient) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tailnet/acct1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "devices": machines })))
        .mount(&server)
        .await;

    let client = HttpInventoryClient::new(server.uri(), "acct1", "test-key");
    (server, client)
}

pub async fn mock_dns_backend_with_zone_and_records(zone_name: &str, zone_id: &str, records: serde_json::Value) -> (MockServer, HttpDnsBackendClient) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{ "id": zone_id, "name": zone_name }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": records, "cursor": "" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/zones/{zone_id}/dns_records/batch")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&server)
        .await;

    let client = HttpDnsBackendClient::new(server.uri(), "test-token");
    (server, client)
}
