// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-task projection from matched machines to [`DesiredRecord`]s,
//! including associated SRV generation.

use crate::config::{Config, GenerationTask, RecordTemplate, RecordType};
use crate::machine::Machine;
use crate::records::{ownership_comment, DesiredRecord};
use crate::selector::{matches, Captures};
use crate::template::evaluate;

/// Run one task's selector against every machine, then project each match
/// through the task's record templates.
///
/// Template evaluation failures (a variable that resolves to nothing)
/// suppress only the single affected record; they never abort the task or
/// the enclosing sync.
#[must_use]
pub fn generate_task_records(task: &GenerationTask, machines: &[Machine], owner_id: &str, config: &Config) -> Vec<DesiredRecord> {
    if !task.enabled {
        return Vec::new();
    }

    let mut records = Vec::new();
    for machine in machines {
        let Some(selector_match) = matches(machine, &task.machine_selector) else {
            continue;
        };
        for template in &task.record_templates {
            records.extend(generate_template_records(
                template,
                machine,
                &selector_match.captures,
                owner_id,
                config,
            ));
        }
    }
    records
}

fn generate_template_records(
    template: &RecordTemplate,
    machine: &Machine,
    captures: &Captures,
    owner_id: &str,
    config: &Config,
) -> Vec<DesiredRecord> {
    let names = evaluate(&template.name, machine, captures, config);
    let values = evaluate(&template.value, machine, captures, config);

    if names.is_empty() || values.is_empty() {
        return Vec::new();
    }

    let comment = ownership_comment(owner_id, &machine.machine_name());
    let mut records = Vec::new();

    for (name, value) in pair_up(&names, &values) {
        let primary = DesiredRecord {
            record_type: template.record_type,
            name: name.clone(),
            content: value,
            ttl: template.ttl,
            proxied: template.proxied,
            priority: template.priority,
            weight: template.weight,
            port: template.port,
            comment: comment.clone(),
        };

        if let Some(srv_prefix) = &template.srv_prefix {
            if let Some(srv) = generate_associated_srv(template, srv_prefix, &name, machine, captures, owner_id, config, &comment) {
                records.push(srv);
            }
        }

        records.push(primary);
    }

    records
}

/// Names and values are independently-expanded sequences; pairing them
/// index-wise mirrors how the source system zips a template's resolved
/// name/value sequences rather than taking their cross product.
fn pair_up(names: &[String], values: &[String]) -> Vec<(String, String)> {
    let len = names.len().max(values.len());
    (0..len)
        .map(|i| {
            let name = names.get(i).or_else(|| names.first()).cloned().unwrap_or_default();
            let value = values.get(i).or_else(|| values.first()).cloned().unwrap_or_default();
            (name, value)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn generate_associated_srv(
    template: &RecordTemplate,
    srv_prefix: &str,
    resolved_name: &str,
    machine: &Machine,
    captures: &Captures,
    owner_id: &str,
    config: &Config,
    comment: &str,
) -> Option<DesiredRecord> {
    let target = match &template.srv_target {
        Some(srv_template) => evaluate(srv_template, machine, captures, config).into_iter().next()?,
        None => resolved_name.to_string(),
    };

    Some(DesiredRecord {
        record_type: RecordType::SRV,
        name: format!("{srv_prefix}.{resolved_name}"),
        content: target,
        ttl: template.ttl,
        proxied: false,
        priority: template.priority,
        weight: template.weight,
        port: template.port,
        comment: comment.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MachineSelector, RecordType};
    use std::collections::BTreeMap;

    fn machine() -> Machine {
        Machine {
            id: "m1".to_string(),
            name: "web01.tailnet".to_string(),
            hostname: "web01".to_string(),
            addresses: vec![],
            tags: vec!["tag:web".to_string()],
            client_connectivity: crate::machine::ClientConnectivity {
                endpoints: vec!["192.168.1.10:41641".to_string(), "8.8.8.8:41641".to_string()],
            },
            extra: BTreeMap::new(),
        }
    }

    fn config_with_home_lan() -> Config {
        let mut config = Config::default();
        config.named_cidr_lists.push(crate::config::NamedCidrList {
            name: "home-lan".to_string(),
            description: None,
            cidrs: vec!["192.168.0.0/16".to_string()],
            mode: crate::config::CidrListMode::Multiple,
            inverse: false,
        });
        config
    }

    fn web_task() -> GenerationTask {
        GenerationTask {
            id: "t1".to_string(),
            name: "web".to_string(),
            description: None,
            enabled: true,
            machine_selector: MachineSelector {
                field: "tag".to_string(),
                pattern: "tag:web".to_string(),
            },
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
        }
    }

    #[test]
    fn scenario_s1_first_sync_one_machine_one_a_template() {
        let config = config_with_home_lan();
        let records = generate_task_records(&web_task(), &[machine()], "owner", &config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "web01.example.com");
        assert_eq!(records[0].content, "192.168.1.10");
        assert_eq!(records[0].comment, "cf-ts-dns:owner:web01");
    }

    #[test]
    fn disabled_task_generates_nothing() {
        let mut task = web_task();
        task.enabled = false;
        let records = generate_task_records(&task, &[machine()], "owner", &config_with_home_lan());
        assert!(records.is_empty());
    }

    #[test]
    fn scenario_s6_associated_srv_defaults_target_to_primary_name() {
        let mut task = web_task();
        task.record_templates = vec![RecordTemplate {
            record_type: RecordType::A,
            name: "{{machineName}}".to_string(),
            value: "1.2.3.4".to_string(),
            ttl: 300,
            proxied: false,
            priority: 10,
            weight: 10,
            port: 80,
            srv_prefix: Some("_http._tcp".to_string()),
            srv_target: None,
        }];

        let records = generate_task_records(&task, &[machine()], "owner", &Config::default());
        assert_eq!(records.len(), 2);

        let srv = records.iter().find(|r| r.record_type == RecordType::SRV).unwrap();
        assert_eq!(srv.name, "_http._tcp.web01");
        assert_eq!(srv.content, "web01");
        assert_eq!(srv.priority, 10);

        let primary = records.iter().find(|r| r.record_type == RecordType::A).unwrap();
        assert_eq!(primary.name, "web01");
    }

    #[test]
    fn non_matching_machine_produces_no_records() {
        let mut m = machine();
        m.tags = vec!["tag:db".to_string()];
        let records = generate_task_records(&web_task(), &[m], "owner", &config_with_home_lan());
        assert!(records.is_empty());
    }
}
