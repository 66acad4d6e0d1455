//! Compatibility evaluation.
//!
//! Decides whether an egress policy (`policy_b`) still lets through the
//! traffic an existing ingress policy (`policy_a`) expects to receive.
//!
//! Evaluation runs four gates in order and stops at the first one that
//! decides:
//!
//! 1. Do `policy_a`'s ingress peers select `policy_b`'s subject? If not, the
//!    policies are about unrelated workloads: compatible.
//! 2. Do `policy_b`'s egress peers select `policy_a`'s subject? If not:
//!    compatible.
//! 3. Collect ports per protocol on both sides.
//! 4. Every ingress port must be reachable through the egress ports, or the
//!    change would break traffic.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coverage::{covers, missing_ports, uncovered_protocols};
use crate::labels::{peer_pod_selector_sets, peer_pod_selectors, subject_selector};
use crate::model::{LabelMap, LabelPair, Policy, Protocol, Rule};
use crate::ports::{PortMap, ports_by_protocol};
use crate::selector::{find_overlap, first_matching_peer};

// ============================================================================
// Options
// ============================================================================

/// How peer selectors are compared with a subject selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeerMatching {
    /// Each peer's selector is tested on its own.
    #[default]
    PerPeer,
    /// All peer selectors are merged last-write-wins first. A peer whose
    /// label is overwritten by a later peer can no longer match.
    Merged,
}

impl PeerMatching {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerPeer => "per-peer",
            Self::Merged => "merged",
        }
    }
}

/// Knobs for [`evaluate_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOptions {
    pub peer_matching: PeerMatching,
}

impl EvaluationOptions {
    pub fn with_peer_matching(mut self, peer_matching: PeerMatching) -> Self {
        self.peer_matching = peer_matching;
        self
    }
}

// ============================================================================
// Result
// ============================================================================

/// The gate at which evaluation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Gate 1: ingress peers do not select the egress policy's subject.
    NoSubjectOverlap,
    /// Gate 2: egress peers do not select the ingress policy's subject.
    NoPeerOverlap,
    /// Gate 4: some ingress port is not reachable through egress.
    PortGapFound,
    /// Every gate passed.
    FullyCompatible,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoSubjectOverlap => "no subject overlap",
            Self::NoPeerOverlap => "no peer overlap",
            Self::PortGapFound => "port gap found",
            Self::FullyCompatible => "fully compatible",
        };
        f.write_str(text)
    }
}

/// Verdict for one (ingress policy, egress policy) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub compatible: bool,
    pub stage: Stage,
    /// Label shared by an ingress peer and the egress policy's subject.
    pub witness_label: Option<LabelPair>,
    /// Label shared by an egress peer and the ingress policy's subject.
    pub egress_witness_label: Option<LabelPair>,
    /// Protocols with ingress ports missing on the egress side. Empty unless
    /// `stage` is [`Stage::PortGapFound`].
    pub uncovered_protocols: Vec<Protocol>,
    /// Ingress ports missing on the egress side, per protocol.
    #[serde(default)]
    pub missing_ports: PortMap,
}

impl CompatibilityResult {
    /// Whether rolling out the egress policy would break traffic.
    pub fn breaks_traffic(&self) -> bool {
        !self.compatible
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Evaluates `policy_a` (ingress side) against `policy_b` (egress side)
/// with default options.
pub fn evaluate(policy_a: &Policy, policy_b: &Policy) -> CompatibilityResult {
    evaluate_with(policy_a, policy_b, &EvaluationOptions::default())
}

/// Evaluates `policy_a` (ingress side) against `policy_b` (egress side).
///
/// Never fails and never mutates either policy.
pub fn evaluate_with(
    policy_a: &Policy,
    policy_b: &Policy,
    options: &EvaluationOptions,
) -> CompatibilityResult {
    let subject_b = subject_selector(policy_b);
    let Some(witness) = peer_overlap(&policy_a.ingress, &subject_b, options.peer_matching) else {
        debug!(
            ingress = %policy_a.name,
            egress = %policy_b.name,
            "ingress peers do not select egress subject"
        );
        return verdict(policy_a, policy_b, Stage::NoSubjectOverlap, None, None, Gaps::default());
    };
    debug!(witness = %witness, "ingress peers select egress subject");

    let subject_a = subject_selector(policy_a);
    let Some(egress_witness) = peer_overlap(&policy_b.egress, &subject_a, options.peer_matching)
    else {
        debug!(
            ingress = %policy_a.name,
            egress = %policy_b.name,
            "egress peers do not select ingress subject"
        );
        return verdict(
            policy_a,
            policy_b,
            Stage::NoPeerOverlap,
            Some(witness),
            None,
            Gaps::default(),
        );
    };
    debug!(witness = %egress_witness, "egress peers select ingress subject");

    let ingress_ports = ports_by_protocol(&policy_a.ingress);
    let egress_ports = ports_by_protocol(&policy_b.egress);
    debug!(?ingress_ports, ?egress_ports, "comparing ports");

    if covers(&ingress_ports, &egress_ports) {
        verdict(
            policy_a,
            policy_b,
            Stage::FullyCompatible,
            Some(witness),
            Some(egress_witness),
            Gaps::default(),
        )
    } else {
        verdict(
            policy_a,
            policy_b,
            Stage::PortGapFound,
            Some(witness),
            Some(egress_witness),
            Gaps {
                protocols: uncovered_protocols(&ingress_ports, &egress_ports),
                ports: missing_ports(&ingress_ports, &egress_ports),
            },
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn peer_overlap(rules: &[Rule], subject: &LabelMap, matching: PeerMatching) -> Option<LabelPair> {
    match matching {
        PeerMatching::PerPeer => {
            first_matching_peer(&peer_pod_selector_sets(rules), subject).map(|m| m.witness)
        }
        PeerMatching::Merged => find_overlap(&peer_pod_selectors(rules), subject),
    }
}

#[derive(Default)]
struct Gaps {
    protocols: Vec<Protocol>,
    ports: PortMap,
}

fn verdict(
    policy_a: &Policy,
    policy_b: &Policy,
    stage: Stage,
    witness_label: Option<LabelPair>,
    egress_witness_label: Option<LabelPair>,
    gaps: Gaps,
) -> CompatibilityResult {
    let compatible = stage != Stage::PortGapFound;
    info!(
        ingress = %policy_a.name,
        egress = %policy_b.name,
        compatible,
        %stage,
        uncovered = ?gaps.protocols,
        "compatibility evaluated"
    );

    CompatibilityResult {
        compatible,
        stage,
        witness_label,
        egress_witness_label,
        uncovered_protocols: gaps.protocols,
        missing_ports: gaps.ports,
    }
}

// ============================================================================
// Tests
// ============================================================================
