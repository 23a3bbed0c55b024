// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

mod common;

use dns_reconciler::config::{CidrListMode, Config, GenerationTask, MachineSelector, NamedCidrList, RecordTemplate, RecordType};
use dns_reconciler::reconciler::sync;
use serde_json::json;

fn config_with_web_task() -> Config {
    let mut config = Config::default();
    config.named_cidr_lists.push(NamedCidrList {
        name: "home-lan".to_string(),
        description: None,
        cidrs: vec!["192.168.0.0/16".to_string()],
        mode: CidrListMode::Multiple,
        inverse: false,
    });
    config.generation_tasks.push(GenerationTask {
        id: "t1".to_string(),
        name: "web".to_string(),
        description: None,
        enabled: true,
        machine_selector: MachineSelector { field: "tag".to_string(), pattern: "tag:web".to_string() },
        record_templates: vec![RecordTemplate {
            record_type: RecordType::A,
            name: "{{machineName}}.example.com".to_string(),
            value: "{{cidr.home-lan}}".to_string(),
            ttl: 300,
            proxied: false,
            priority: 10,
            weight: 10,
            port: 80,
            srv_prefix: None,
            srv_target: None,
        }],
    });
    config
}

fn web01() -> serde_json::Value {
    json!([{
        "id": "m1",
        "name": "web01.tailnet",
        "hostname": "web01",
        "addresses": [],
        "tags": ["tag:web"],
        "clientConnectivity": { "endpoints": ["192.168.1.10:41641", "8.8.8.8:41641"] }
    }])
}

#[tokio::test]
async fn scenario_s1_first_sync_creates_one_record_over_http() {
    let (_inv_server, inventory) = common::mock_inventory_with_machines(web01()).await;
    let (_dns_server, dns_backend) = common::mock_dns_backend_with_zone_and_records("example.com", "zone1", json!([])).await;

    let result = sync(&config_with_web_task(), "owner", false, &inventory, &dns_backend).await.unwrap();

    assert_eq!(result.added.len(), 1);
    assert_eq!(result.added[0].name, "web01.example.com");
    assert_eq!(result.added[0].content, "192.168.1.10");
    assert_eq!(result.added[0].comment, "cf-ts-dns:owner:web01");
    assert!(result.deleted.is_empty());
}

#[tokio::test]
async fn scenario_s2_idempotent_resync_over_http() {
    let (_inv_server, inventory) = common::mock_inventory_with_machines(web01()).await;
    let existing = json!([{
        "id": "r1",
        "zoneId": "zone1",
        "recordType": "A",
        "name": "web01.example.com",
        "content": "192.168.1.10",
        "ttl": 300,
        "proxied": false,
        "priority": 0,
        "weight": 0,
        "port": 0,
        "comment": "cf-ts-dns:owner:web01"
    }]);
    let (_dns_server, dns_backend) = common::mock_dns_backend_with_zone_and_records("example.com", "zone1", existing).await;

    let result = sync(&config_with_web_task(), "owner", false, &inventory, &dns_backend).await.unwrap();

    assert!(result.added.is_empty());
    assert!(result.deleted.is_empty());
}

#[tokio::test]
async fn scenario_s4_stale_machine_removal_over_http() {
    let (_inv_server, inventory) = common::mock_inventory_with_machines(json!([])).await;
    let existing = json!([{
        "id": "r1",
        "zoneId": "zone1",
        "recordType": "A",
        "name": "web01.example.com",
        "content": "192.168.1.10",
        "ttl": 300,
        "proxied": false,
        "priority": 0,
        "weight": 0,
        "port": 0,
        "comment": "cf-ts-dns:owner:web01"
    }]);
    let (_dns_server, dns_backend) = common::mock_dns_backend_with_zone_and_records("example.com", "zone1", existing).await;

    let result = sync(&config_with_web_task(), "owner", false, &inventory, &dns_backend).await.unwrap();

    assert!(result.added.is_empty());
    assert_eq!(result.deleted.len(), 1);
    assert_eq!(result.deleted[0].name, "web01.example.com");
}

#[tokio::test]
async fn dry_run_computes_diff_without_mutating_backend() {
    let (_inv_server, inventory) = common::mock_inventory_with_machines(web01()).await;
    let (dns_server, dns_backend) = common::mock_dns_backend_with_zone_and_records("example.com", "zone1", json!([])).await;

    sync(&config_with_web_task(), "owner", true, &inventory, &dns_backend).await.unwrap();

    let batch_requests = dns_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path().ends_with("/batch"))
        .count();
    assert_eq!(batch_requests, 0);
}
