// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `{{var}}` template evaluation.
//!
//! A template resolves to a *sequence* of strings, not a single string:
//! each `{{var}}` token resolves to a sequence of candidate values, and the
//! template as a whole expands once per value of (at most) one "multi"
//! variable. See [`evaluate`] for the exact algorithm, including the
//! documented one-axis expansion limitation.

use crate::cidr::select_from_named_list;
use crate::config::Config;
use crate::machine::Machine;
use crate::selector::Captures;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Var(String),
}

fn tokenize(template: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            tokens.push(Token::Literal(rest[..start].to_string()));
        }
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                tokens.push(Token::Var(after_open[..end].trim().to_string()));
                rest = &after_open[end + 2..];
            }
            None => {
                // Unterminated token: treat the rest as a literal.
                tokens.push(Token::Literal(rest[start..].to_string()));
                rest = "";
                break;
            }
        }
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest.to_string()));
    }
    tokens
}

/// Parse the `cidr.<list>[,<list>...]` list names referenced by `template`,
/// regardless of whether it resolves successfully. Used by config
/// validation to reject templates that reference undeclared CIDR lists.
#[must_use]
pub fn referenced_cidr_lists(template: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    for token in tokenize(template) {
        if let Token::Var(identifier) = token {
            if let Some(lists) = identifier.strip_prefix("cidr.") {
                for name in lists.split(',') {
                    names.insert(name.trim().to_string());
                }
            }
        }
    }
    names
}

fn resolve_variable(identifier: &str, machine: &Machine, captures: &Captures, config: &Config) -> Vec<String> {
    match identifier {
        "machineName" => vec![machine.machine_name()],
        "tailscaleIP" => machine.addresses.clone(),
        "tags" => vec![machine.tags.join(",")],
        other => {
            if let Some(lists) = other.strip_prefix("cidr.") {
                let names: Vec<&str> = lists.split(',').map(str::trim).collect();
                return select_from_named_list(machine, &names, &config.named_cidr_lists)
                    .into_iter()
                    .map(|ip| ip.to_string())
                    .collect();
            }
            let key = other.strip_prefix('$').unwrap_or(other);
            captures.get(key).cloned().into_iter().collect()
        }
    }
}

/// Evaluate `template` against one matched machine, returning the expanded
/// sequence of strings. An empty result means the record this template
/// feeds into should be suppressed: at least one referenced variable
/// resolved to nothing.
///
/// If more than one variable in the template has more than one resolved
/// value, only the first such variable (in order of first appearance) is
/// expanded; the others contribute their first value only. This mirrors a
/// known limitation in the source system and is pinned by tests rather than
/// "fixed".
#[must_use]
pub fn evaluate(template: &str, machine: &Machine, captures: &Captures, config: &Config) -> Vec<String> {
    let tokens = tokenize(template);

    let mut resolved: Vec<(String, Vec<String>)> = Vec::new();
    let mut seen = HashSet::new();
    for token in &tokens {
        if let Token::Var(identifier) = token {
            if seen.insert(identifier.clone()) {
                let values = resolve_variable(identifier, machine, captures, config);
                if values.is_empty() {
                    return Vec::new();
                }
                resolved.push((identifier.clone(), values));
            }
        }
    }

    let multi_axis = resolved.iter().find(|(_, values)| values.len() > 1);

    let expansion_count = multi_axis.map_or(1, |(_, values)| values.len());
    let mut results = Vec::with_capacity(expansion_count);

    for i in 0..expansion_count {
        let mut out = String::new();
        for token in &tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Var(identifier) => {
                    let (_, values) = resolved.iter().find(|(name, _)| name == identifier).unwrap();
                    let is_multi_axis = multi_axis
                        .map(|(name, _)| name == identifier)
                        .unwrap_or(false);
                    let value = if is_multi_axis {
                        &values[i]
                    } else {
                        &values[0]
                    };
                    out.push_str(value);
                }
            }
        }
        results.push(out);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CidrListMode, NamedCidrList};
    use std::collections::BTreeMap;

    fn machine() -> Machine {
        Machine {
            id: "m1".to_string(),
            name: "web01.tailnet".to_string(),
            hostname: "web01".to_string(),
            addresses: vec!["100.64.0.1".to_string()],
            tags: vec!["tag:web".to_string()],
            client_connectivity: crate::machine::ClientConnectivity {
                endpoints: vec!["192.168.1.10:1".to_string(), "192.168.1.11:1".to_string()],
            },
            extra: BTreeMap::new(),
        }
    }

    fn config_with_list() -> Config {
        let mut config = Config::default();
        config.named_cidr_lists.push(NamedCidrList {
            name: "home-lan".to_string(),
            description: None,
            cidrs: vec!["192.168.0.0/16".to_string()],
            mode: CidrListMode::Multiple,
            inverse: false,
        });
        config
    }

    #[test]
    fn substitutes_machine_name() {
        let result = evaluate(
            "{{machineName}}.example.com",
            &machine(),
            &Captures::new(),
            &Config::default(),
        );
        assert_eq!(result, vec!["web01.example.com".to_string()]);
    }

    #[test]
    fn expands_over_multi_valued_cidr_variable() {
        let result = evaluate("{{cidr.home-lan}}", &machine(), &Captures::new(), &config_with_list());
        assert_eq!(result, vec!["192.168.1.10".to_string(), "192.168.1.11".to_string()]);
    }

    #[test]
    fn empty_variable_suppresses_template() {
        let result = evaluate("{{cidr.missing}}", &machine(), &Captures::new(), &Config::default());
        assert!(result.is_empty());
    }

    #[test]
    fn only_first_multi_valued_variable_expands() {
        let mut config = config_with_list();
        config.named_cidr_lists.push(NamedCidrList {
            name: "wan".to_string(),
            description: None,
            cidrs: vec!["0.0.0.0/0".to_string()],
            mode: CidrListMode::Multiple,
            inverse: false,
        });
        let result = evaluate(
            "{{cidr.home-lan}}-{{cidr.wan}}",
            &machine(),
            &Captures::new(),
            &config,
        );
        // home-lan appears first and has 2 values; wan also resolves to 2
        // values but only contributes its first value per the pinned
        // one-axis expansion limitation.
        assert_eq!(
            result,
            vec!["192.168.1.10-192.168.1.10".to_string(), "192.168.1.11-192.168.1.10".to_string()]
        );
    }

    #[test]
    fn referenced_cidr_lists_extracts_union_names() {
        let names = referenced_cidr_lists("{{cidr.a,b}} {{machineName}}");
        assert_eq!(names, ["a", "b"].into_iter().map(String::from).collect());
    }

    #[test]
    fn capture_variable_is_substituted() {
        let mut captures = Captures::new();
        captures.insert("env".to_string(), "prod".to_string());
        let result = evaluate("{{env}}.example.com", &machine(), &captures, &Config::default());
        assert_eq!(result, vec!["prod.example.com".to_string()]);
    }
}
