// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hand-rolled validator for [`Config`] documents.
//!
//! The source system used a Zod-like declarative schema; per the
//! re-architecture notes we replace that with a plain validator that walks
//! the data shape and accumulates field-path-qualified errors, rather than
//! deriving validation from an annotation-driven schema library.

use super::{CidrListMode, Config};
use crate::errors::{FieldError, ValidationError};
use std::collections::HashSet;

const NAME_CHARS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-";

fn is_valid_list_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| NAME_CHARS.contains(c))
}

/// Validate a full configuration document.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every field that failed, not just
/// the first.
pub fn validate_config(config: &Config) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    validate_cidr_lists(config, &mut errors);
    validate_tasks(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(errors))
    }
}

fn validate_cidr_lists(config: &Config, errors: &mut Vec<FieldError>) {
    let mut seen_names = HashSet::new();

    for (idx, list) in config.named_cidr_lists.iter().enumerate() {
        let path = format!("namedCidrLists[{idx}]");

        if !is_valid_list_name(&list.name) {
            errors.push(FieldError::new(
                format!("{path}.name"),
                format!("'{}' must match [A-Za-z0-9_-]+", list.name),
            ));
        } else if !seen_names.insert(list.name.clone()) {
            errors.push(FieldError::new(
                format!("{path}.name"),
                format!("duplicate named CIDR list '{}'", list.name),
            ));
        }

        if list.cidrs.is_empty() {
            errors.push(FieldError::new(
                format!("{path}.cidrs"),
                "must contain at least one CIDR".to_string(),
            ));
        }

        for (cidr_idx, cidr) in list.cidrs.iter().enumerate() {
            if cidr.parse::<ipnetwork::Ipv4Network>().is_err() {
                errors.push(FieldError::new(
                    format!("{path}.cidrs[{cidr_idx}]"),
                    format!("'{cidr}' is not a valid IPv4 CIDR"),
                ));
            }
        }

        // `single`/`multiple` enum values are enforced by serde at the
        // deserialization boundary; `inverse` is a plain bool, nothing to
        // validate beyond presence.
        let _ = matches!(list.mode, CidrListMode::Single | CidrListMode::Multiple);
    }
}

fn validate_tasks(config: &Config, errors: &mut Vec<FieldError>) {
    let mut seen_ids = HashSet::new();
    let cidr_list_names: HashSet<&str> = config
        .named_cidr_lists
        .iter()
        .map(|l| l.name.as_str())
        .collect();

    for (idx, task) in config.generation_tasks.iter().enumerate() {
        let path = format!("generationTasks[{idx}]");

        if task.id.is_empty() {
            errors.push(FieldError::new(format!("{path}.id"), "must not be empty"));
        } else if !seen_ids.insert(task.id.clone()) {
            errors.push(FieldError::new(
                format!("{path}.id"),
                format!("duplicate task id '{}'", task.id),
            ));
        }

        if task.record_templates.is_empty() {
            errors.push(FieldError::new(
                format!("{path}.recordTemplates"),
                "must contain at least one template",
            ));
        }

        for (t_idx, template) in task.record_templates.iter().enumerate() {
            let t_path = format!("{path}.recordTemplates[{t_idx}]");
            for list_name in crate::template::referenced_cidr_lists(&template.value) {
                if !cidr_list_names.contains(list_name.as_str()) {
                    errors.push(FieldError::new(
                        format!("{t_path}.value"),
                        format!("references unknown named CIDR list '{list_name}'"),
                    ));
                }
            }
        }
    }
}

/// Check whether a named CIDR list is still referenced by any template in
/// the document. Used to enforce the delete-while-referenced invariant from
/// the CRUD operator endpoints.
#[must_use]
pub fn cidr_list_referenced_by(config: &Config, list_name: &str) -> Option<String> {
    for task in &config.generation_tasks {
        for template in &task.record_templates {
            if crate::template::referenced_cidr_lists(&template.value).contains(list_name) {
                return Some(task.id.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationTask, MachineSelector, NamedCidrList, RecordTemplate, RecordType};

    fn sample_list() -> NamedCidrList {
        NamedCidrList {
            name: "home-lan".to_string(),
            description: None,
            cidrs: vec!["192.168.0.0/16".to_string()],
            mode: CidrListMode::Multiple,
            inverse: false,
        }
    }

    fn sample_task(value: &str) -> GenerationTask {
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
                value: value.to_string(),
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
    fn rejects_invalid_cidr() {
        let mut config = Config::default();
        config.named_cidr_lists.push(NamedCidrList {
            cidrs: vec!["not-a-cidr".to_string()],
            ..sample_list()
        });
        let err = config.validate().unwrap_err();
        assert!(err.0.iter().any(|e| e.path.contains("cidrs[0]")));
    }

    #[test]
    fn rejects_duplicate_list_names() {
        let mut config = Config::default();
        config.named_cidr_lists.push(sample_list());
        config.named_cidr_lists.push(sample_list());
        let err = config.validate().unwrap_err();
        assert!(err.0.iter().any(|e| e.message.contains("duplicate")));
    }

    #[test]
    fn rejects_unknown_cidr_list_reference() {
        let mut config = Config::default();
        config
            .generation_tasks
            .push(sample_task("{{cidr.missing-list}}"));
        let err = config.validate().unwrap_err();
        assert!(err.0.iter().any(|e| e.message.contains("unknown")));
    }

    #[test]
    fn accepts_valid_config() {
        let mut config = Config::default();
        config.named_cidr_lists.push(sample_list());
        config
            .generation_tasks
            .push(sample_task("{{cidr.home-lan}}"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn detects_cidr_list_in_use() {
        let mut config = Config::default();
        config.named_cidr_lists.push(sample_list());
        config
            .generation_tasks
            .push(sample_task("{{cidr.home-lan}}"));
        assert_eq!(
            cidr_list_referenced_by(&config, "home-lan"),
            Some("t1".to_string())
        );
        assert_eq!(cidr_list_referenced_by(&config, "other"), None);
    }
}
