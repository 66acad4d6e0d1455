//! Shows what the evaluator extracts from one policy.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use netpol_compat::{
    Direction, LabelMap, NamespaceSelectorMode, Policy, PolicySource, PortMap,
    peer_namespace_selector_sets, peer_namespace_selectors, peer_pod_selector_sets,
    peer_pod_selectors, ports_by_protocol, subject_selector,
};
use serde::Serialize;

use super::format_ports;
use crate::style::{SemanticStyle, print_info_table};

#[derive(Serialize)]
struct PolicySummary {
    name: String,
    namespace: Option<String>,
    policy_types: Vec<Direction>,
    subject: LabelMap,
    namespace_selector_mode: NamespaceSelectorMode,
    ingress: DirectionSummary,
    egress: DirectionSummary,
}

#[derive(Serialize)]
struct DirectionSummary {
    declared: bool,
    rules: usize,
    pod_selectors: LabelMap,
    pod_selector_sets: Vec<LabelMap>,
    namespace_selectors: LabelMap,
    namespace_selector_sets: Vec<LabelMap>,
    ports: PortMap,
}

impl DirectionSummary {
    fn new(policy: &Policy, direction: Direction, mode: NamespaceSelectorMode) -> Self {
        let rules = policy.rules(direction);
        Self {
            declared: policy.effective_policy_types().contains(&direction),
            rules: rules.len(),
            pod_selectors: peer_pod_selectors(rules),
            pod_selector_sets: peer_pod_selector_sets(rules),
            namespace_selectors: peer_namespace_selectors(rules, mode),
            namespace_selector_sets: peer_namespace_selector_sets(rules, mode),
            ports: ports_by_protocol(rules),
        }
    }
}

pub fn run(
    project: &Path,
    dir: Option<&Path>,
    locator: &str,
    json: bool,
    namespace_selectors: Option<NamespaceSelectorMode>,
) -> Result<ExitCode> {
    let config = super::load_config(project)?;
    let mode = namespace_selectors.unwrap_or(config.evaluation.namespace_selectors);

    let policy = super::policy_source(&config, dir)
        .load_policy(locator)
        .with_context(|| format!("Failed to load policy {locator}"))?;

    let summary = PolicySummary {
        name: policy.name.clone(),
        namespace: policy.namespace.clone(),
        policy_types: policy.effective_policy_types(),
        subject: subject_selector(&policy),
        namespace_selector_mode: mode,
        ingress: DirectionSummary::new(&policy, Direction::Ingress, mode),
        egress: DirectionSummary::new(&policy, Direction::Egress, mode),
    };

    if super::wants_json(&config, json) {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(summary: &PolicySummary) {
    println!("{}", summary.name.header());

    let policy_types: Vec<String> = summary.policy_types.iter().map(ToString::to_string).collect();
    let mut entries = vec![
        (
            "Namespace".to_string(),
            summary.namespace.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Policy types".to_string(), policy_types.join(", ")),
        ("Subject".to_string(), format_labels(&summary.subject)),
        (
            "Namespace selectors".to_string(),
            summary.namespace_selector_mode.as_str().to_string(),
        ),
    ];

    for (direction, section) in [("Ingress", &summary.ingress), ("Egress", &summary.egress)] {
        if !section.declared && section.rules == 0 {
            continue;
        }
        entries.push((format!("{direction} rules"), section.rules.to_string()));
        entries.push((
            format!("{direction} peer pods"),
            format_labels(&section.pod_selectors),
        ));
        entries.push((
            format!("{direction} peer pods (per peer)"),
            format_label_sets(&section.pod_selector_sets),
        ));
        entries.push((
            format!("{direction} peer namespaces"),
            format_labels(&section.namespace_selectors),
        ));
        entries.push((format!("{direction} ports"), format_ports(&section.ports)));
    }

    print_info_table(&entries);
}

fn format_labels(labels: &LabelMap) -> String {
    if labels.is_empty() {
        return "-".to_string();
    }
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_label_sets(sets: &[LabelMap]) -> String {
    if sets.is_empty() {
        return "-".to_string();
    }
    sets.iter()
        .map(|labels| format!("[{}]", format_labels(labels)))
        .collect::<Vec<_>>()
        .join(" ")
}
