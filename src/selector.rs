// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Machine selector matching: field extraction plus exact/regex match with
//! capture propagation into the template engine.

use crate::config::MachineSelector;
use crate::machine::Machine;
use regex::Regex;
use std::collections::HashMap;

/// Capture groups extracted from a successful regex match, combining
/// numbered (`"1"`, `"2"`, ...) and named groups in one map.
pub type Captures = HashMap<String, String>;

/// The result of testing one machine against a [`MachineSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorMatch {
    /// Captures extracted from the matching field value, if the pattern was
    /// a regex. Empty for exact-match selectors.
    pub captures: Captures,
}

/// Test `machine` against `selector`.
///
/// A pattern wrapped in `/.../ ` is treated as a regex; an invalid regex
/// fails to match silently rather than raising an error, per the source
/// behavior this crate preserves. Any other pattern is an exact-equality
/// match against the field value.
///
/// When a field resolves to a comma-joined multi-value string (e.g. `tag`),
/// each value is tried in source order and the first match wins.
#[must_use]
pub fn matches(machine: &Machine, selector: &MachineSelector) -> Option<SelectorMatch> {
    let value = machine.field(&selector.field)?;
    let candidates: Vec<&str> = if selector.field == "tag" || selector.field == "tags" {
        value.split(',').collect()
    } else {
        vec![value.as_str()]
    };

    if let Some(pattern) = as_regex_pattern(&selector.pattern) {
        let re = Regex::new(pattern).ok()?;
        for candidate in candidates {
            if let Some(caps) = re.captures(candidate) {
                return Some(SelectorMatch {
                    captures: extract_captures(&re, &caps),
                });
            }
        }
        None
    } else {
        candidates
            .into_iter()
            .find(|c| *c == selector.pattern)
            .map(|_| SelectorMatch {
                captures: Captures::new(),
            })
    }
}

fn as_regex_pattern(pattern: &str) -> Option<&str> {
    pattern
        .strip_prefix('/')
        .and_then(|rest| rest.strip_suffix('/'))
}

fn extract_captures(re: &Regex, caps: &regex::Captures<'_>) -> Captures {
    let mut out = Captures::new();
    for i in 1..caps.len() {
        if let Some(m) = caps.get(i) {
            out.insert(i.to_string(), m.as_str().to_string());
        }
    }
    for name in re.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            out.insert(name.to_string(), m.as_str().to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn machine_with_tags(tags: &[&str]) -> Machine {
        Machine {
            id: "m1".to_string(),
            name: "web01.tailnet".to_string(),
            hostname: "web01".to_string(),
            addresses: vec![],
            tags: tags.iter().map(|s| s.to_string()).collect(),
            client_connectivity: Default::default(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn exact_match_on_tag() {
        let machine = machine_with_tags(&["tag:web", "tag:prod"]);
        let selector = MachineSelector {
            field: "tag".to_string(),
            pattern: "tag:web".to_string(),
        };
        assert!(matches(&machine, &selector).is_some());
    }

    #[test]
    fn exact_match_fails_when_no_tag_equals() {
        let machine = machine_with_tags(&["tag:db"]);
        let selector = MachineSelector {
            field: "tag".to_string(),
            pattern: "tag:web".to_string(),
        };
        assert!(matches(&machine, &selector).is_none());
    }

    #[test]
    fn regex_match_extracts_numbered_and_named_captures() {
        let machine = machine_with_tags(&["tag:env-prod"]);
        let selector = MachineSelector {
            field: "tag".to_string(),
            pattern: r"/tag:env-(?P<env>\w+)/".to_string(),
        };
        let result = matches(&machine, &selector).unwrap();
        assert_eq!(result.captures.get("1"), Some(&"prod".to_string()));
        assert_eq!(result.captures.get("env"), Some(&"prod".to_string()));
    }

    #[test]
    fn invalid_regex_fails_silently() {
        let machine = machine_with_tags(&["tag:web"]);
        let selector = MachineSelector {
            field: "tag".to_string(),
            pattern: "/[/".to_string(),
        };
        assert!(matches(&machine, &selector).is_none());
    }

    #[test]
    fn first_matching_tag_in_source_order_wins() {
        let machine = machine_with_tags(&["tag:env-dev", "tag:env-prod"]);
        let selector = MachineSelector {
            field: "tag".to_string(),
            pattern: r"/tag:env-(\w+)/".to_string(),
        };
        let result = matches(&machine, &selector).unwrap();
        assert_eq!(result.captures.get("1"), Some(&"dev".to_string()));
    }

    #[test]
    fn missing_field_does_not_match() {
        let machine = machine_with_tags(&[]);
        let selector = MachineSelector {
            field: "nonexistent".to_string(),
            pattern: "x".to_string(),
        };
        assert!(matches(&machine, &selector).is_none());
    }
}
