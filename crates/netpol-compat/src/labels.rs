//! Selector extraction.
//!
//! Pulls the subject selector of a policy and the peer selectors of a rule
//! set. Peer selectors come in two shapes:
//!
//! - **merged** ([`peer_pod_selectors`], [`peer_namespace_selectors`]): one
//!   map, peers folded in declaration order, later peers overwriting earlier
//!   ones on a key collision;
//! - **per peer** ([`peer_pod_selector_sets`], [`peer_namespace_selector_sets`]):
//!   one map per qualifying peer, nothing lost.

use serde::{Deserialize, Serialize};

use crate::model::{Direction, LabelMap, Peer, Policy, Rule};

/// How namespace-selector labels are read from peers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceSelectorMode {
    /// Read the peer's `namespaceSelector` labels.
    #[default]
    Corrected,
    /// Reproduce the legacy extraction: ingress peers that carry a
    /// `namespaceSelector` contribute their `podSelector` labels instead.
    /// Egress peers are read normally.
    Literal,
}

impl NamespaceSelectorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Corrected => "corrected",
            Self::Literal => "literal",
        }
    }
}

/// Subject selector labels of a policy. Empty when the policy selects all pods.
pub fn subject_selector(policy: &Policy) -> LabelMap {
    policy.pod_selector.clone()
}

/// Pod-selector labels of every peer in `rules` that carries one, merged
/// last-write-wins.
pub fn peer_pod_selectors(rules: &[Rule]) -> LabelMap {
    merge(peer_pod_selector_sets(rules))
}

/// Pod-selector labels per peer, in declaration order.
pub fn peer_pod_selector_sets(rules: &[Rule]) -> Vec<LabelMap> {
    peers(rules)
        .filter_map(|(_, peer)| peer.pod_selector.clone())
        .collect()
}

/// Namespace-selector labels of every peer in `rules` that carries one,
/// merged last-write-wins.
pub fn peer_namespace_selectors(rules: &[Rule], mode: NamespaceSelectorMode) -> LabelMap {
    merge(peer_namespace_selector_sets(rules, mode))
}

/// Namespace-selector labels per peer, in declaration order.
///
/// Only peers with a namespace selector qualify. Under
/// [`NamespaceSelectorMode::Literal`] an ingress peer contributes its pod
/// selector instead, and nothing at all when it has none.
pub fn peer_namespace_selector_sets(rules: &[Rule], mode: NamespaceSelectorMode) -> Vec<LabelMap> {
    peers(rules)
        .filter(|(_, peer)| peer.namespace_selector.is_some())
        .filter_map(|(direction, peer)| match (mode, direction) {
            (NamespaceSelectorMode::Literal, Direction::Ingress) => peer.pod_selector.clone(),
            _ => peer.namespace_selector.clone(),
        })
        .collect()
}

fn peers(rules: &[Rule]) -> impl Iterator<Item = (Direction, &Peer)> {
    rules
        .iter()
        .flat_map(|rule| rule.peers.iter().map(move |peer| (rule.direction, peer)))
}

fn merge(maps: Vec<LabelMap>) -> LabelMap {
    maps.into_iter().fold(LabelMap::new(), |mut merged, labels| {
        merged.extend(labels);
        merged
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Protocol, label_map};

    fn ingress_with_peers(peers: Vec<Peer>) -> Vec<Rule> {
        vec![Rule {
            direction: Direction::Ingress,
            peers,
            ports: Vec::new(),
        }]
    }

    #[test]
    fn subject_selector_returns_pod_selector() {
        let policy = Policy::new("p").with_pod_selector(label_map([("app", "nginx")]));
        assert_eq!(subject_selector(&policy), label_map([("app", "nginx")]));
    }

    #[test]
    fn subject_selector_empty_when_selecting_all_pods() {
        assert!(subject_selector(&Policy::new("p")).is_empty());
    }

    #[test]
    fn pod_selectors_merge_across_rules_and_peers() {
        let rules = vec![
            Rule::ingress()
                .with_peer(Peer::pods(label_map([("pod", "a")])))
                .with_port(Protocol::Tcp, 80),
            Rule::ingress().with_peer(Peer::pods(label_map([("tier", "web")]))),
        ];

        assert_eq!(
            peer_pod_selectors(&rules),
            label_map([("pod", "a"), ("tier", "web")])
        );
    }

    #[test]
    fn pod_selector_collision_is_last_write_wins() {
        let rules = ingress_with_peers(vec![
            Peer::pods(label_map([("app", "api")])),
            Peer::pods(label_map([("app", "worker")])),
        ]);

        assert_eq!(peer_pod_selectors(&rules), label_map([("app", "worker")]));
        assert_eq!(
            peer_pod_selector_sets(&rules),
            vec![label_map([("app", "api")]), label_map([("app", "worker")])]
        );
    }

    #[test]
    fn peers_without_selectors_are_skipped() {
        let rules = ingress_with_peers(vec![
            Peer::default(),
            Peer::namespaces(label_map([("team", "a")])),
            Peer::pods(label_map([("pod", "a")])),
        ]);

        assert_eq!(peer_pod_selector_sets(&rules), vec![label_map([("pod", "a")])]);
    }

    #[test]
    fn empty_pod_selector_is_kept_as_a_peer() {
        let rules = ingress_with_peers(vec![Peer::pods(LabelMap::new())]);
        assert_eq!(peer_pod_selector_sets(&rules), vec![LabelMap::new()]);
        assert!(peer_pod_selectors(&rules).is_empty());
    }

    #[test]
    fn namespace_selectors_corrected_reads_namespace_labels() {
        let rules = ingress_with_peers(vec![
            Peer::pods(label_map([("role", "frontend")]))
                .with_namespace_selector(label_map([("ingress-ns", "ingress-ns-nginx")])),
        ]);

        assert_eq!(
            peer_namespace_selectors(&rules, NamespaceSelectorMode::Corrected),
            label_map([("ingress-ns", "ingress-ns-nginx")])
        );
    }

    #[test]
    fn namespace_selectors_literal_reads_pod_labels_on_ingress() {
        let rules = ingress_with_peers(vec![
            Peer::pods(label_map([("role", "frontend")]))
                .with_namespace_selector(label_map([("ingress-ns", "ingress-ns-nginx")])),
            Peer::pods(label_map([("pod", "a")])),
        ]);

        // The pod-only peer is gated out; the mixed peer leaks its pod labels.
        assert_eq!(
            peer_namespace_selectors(&rules, NamespaceSelectorMode::Literal),
            label_map([("role", "frontend")])
        );
    }

    #[test]
    fn namespace_selectors_literal_without_pod_selector_contributes_nothing() {
        let rules = ingress_with_peers(vec![Peer::namespaces(label_map([("team", "a")]))]);

        assert!(peer_namespace_selector_sets(&rules, NamespaceSelectorMode::Literal).is_empty());
        assert_eq!(
            peer_namespace_selector_sets(&rules, NamespaceSelectorMode::Corrected),
            vec![label_map([("team", "a")])]
        );
    }

    #[test]
    fn namespace_selectors_literal_leaves_egress_alone() {
        let rules = vec![
            Rule::egress().with_peer(
                Peer::pods(label_map([("app", "nginx")]))
                    .with_namespace_selector(label_map([("egress-ns", "egress-ns-nginx")])),
            ),
        ];

        for mode in [NamespaceSelectorMode::Literal, NamespaceSelectorMode::Corrected] {
            assert_eq!(
                peer_namespace_selectors(&rules, mode),
                label_map([("egress-ns", "egress-ns-nginx")]),
                "mode {mode:?}"
            );
        }
    }
}
