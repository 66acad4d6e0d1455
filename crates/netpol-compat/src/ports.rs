//! Port extraction.

use std::collections::BTreeMap;

use crate::model::{PortSpec, Protocol, Rule};

/// Ports grouped by protocol, each list in declaration order.
///
/// A protocol with no entry carries no port restriction. Extraction never
/// produces an entry with an empty list.
pub type PortMap = BTreeMap<Protocol, Vec<PortSpec>>;

/// Groups every port constraint of `rules` by protocol, keeping declaration
/// order and duplicates.
pub fn ports_by_protocol(rules: &[Rule]) -> PortMap {
    let mut ports = PortMap::new();
    for constraint in rules.iter().flat_map(|rule| &rule.ports) {
        ports
            .entry(constraint.protocol)
            .or_default()
            .push(constraint.port.clone());
    }
    ports
}
