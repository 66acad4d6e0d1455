//! Policy model.
//!
//! A [`Policy`] is the in-memory form of a Kubernetes `NetworkPolicy`
//! reduced to what compatibility checking needs: the subject pod selector,
//! the ingress and egress rules, and the declared policy types. Policies are
//! built once by a loader and only ever read afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Labels
// ============================================================================

/// Exact-match label selector (`matchLabels`).
///
/// A `BTreeMap` keeps iteration lexicographic, so merges and overlap
/// witnesses are reproducible across runs.
pub type LabelMap = BTreeMap<String, String>;

/// Builds a [`LabelMap`] from `(key, value)` pairs.
pub fn label_map<I, K, V>(pairs: I) -> LabelMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A single `key=value` label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelPair {
    pub key: String,
    pub value: String,
}

impl LabelPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for LabelPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

// ============================================================================
// Ports
// ============================================================================

/// Transport protocol of a port constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Wire name as written in manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Sctp => "SCTP",
        }
    }
}

impl Default for Protocol {
    /// Kubernetes defaults an omitted protocol to TCP.
    fn default() -> Self {
        Self::Tcp
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a protocol name is not one of TCP/UDP/SCTP.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol '{0}' (expected TCP, UDP or SCTP)")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TCP" => Ok(Self::Tcp),
            "UDP" => Ok(Self::Udp),
            "SCTP" => Ok(Self::Sctp),
            other => Err(UnknownProtocol(other.to_string())),
        }
    }
}

/// A port as declared in a rule: a number (`"80"`) or a named port (`"http"`).
///
/// Ports are compared textually; `"80"` and `"http"` are different ports even
/// if a container happens to name port 80 `http`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortSpec(String);

impl PortSpec {
    pub fn new(port: impl Into<String>) -> Self {
        Self(port.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u16> for PortSpec {
    fn from(port: u16) -> Self {
        Self(port.to_string())
    }
}

impl From<&str> for PortSpec {
    fn from(port: &str) -> Self {
        Self(port.to_string())
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `(protocol, port)` pair permitted by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortConstraint {
    pub protocol: Protocol,
    pub port: PortSpec,
}

impl PortConstraint {
    pub fn new(protocol: Protocol, port: impl Into<PortSpec>) -> Self {
        Self {
            protocol,
            port: port.into(),
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Traffic direction of a rule, also used for `policyTypes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ingress,
    Egress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => f.write_str("Ingress"),
            Self::Egress => f.write_str("Egress"),
        }
    }
}

/// A traffic counterpart.
///
/// `None` on either axis means "unrestricted on that axis", which is not the
/// same as `Some` of an empty map. A peer with neither selector (for example
/// an `ipBlock` peer) takes no part in selector aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub pod_selector: Option<LabelMap>,
    pub namespace_selector: Option<LabelMap>,
}

impl Peer {
    /// A peer selecting pods by label.
    pub fn pods(labels: LabelMap) -> Self {
        Self {
            pod_selector: Some(labels),
            namespace_selector: None,
        }
    }

    /// A peer selecting namespaces by label.
    pub fn namespaces(labels: LabelMap) -> Self {
        Self {
            pod_selector: None,
            namespace_selector: Some(labels),
        }
    }

    pub fn with_namespace_selector(mut self, labels: LabelMap) -> Self {
        self.namespace_selector = Some(labels);
        self
    }

    pub fn with_pod_selector(mut self, labels: LabelMap) -> Self {
        self.pod_selector = Some(labels);
        self
    }
}

/// An ingress (`from`) or egress (`to`) rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub direction: Direction,
    pub peers: Vec<Peer>,
    pub ports: Vec<PortConstraint>,
}

impl Rule {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            peers: Vec::new(),
            ports: Vec::new(),
        }
    }

    pub fn ingress() -> Self {
        Self::new(Direction::Ingress)
    }

    pub fn egress() -> Self {
        Self::new(Direction::Egress)
    }

    pub fn with_peer(mut self, peer: Peer) -> Self {
        self.peers.push(peer);
        self
    }

    pub fn with_port(mut self, protocol: Protocol, port: impl Into<PortSpec>) -> Self {
        self.ports.push(PortConstraint::new(protocol, port));
        self
    }
}

// ============================================================================
// Policy
// ============================================================================

/// A network access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub namespace: Option<String>,
    /// Subject selector: the pods this policy governs. Empty selects all pods.
    pub pod_selector: LabelMap,
    pub ingress: Vec<Rule>,
    pub egress: Vec<Rule>,
    /// Declared `policyTypes`. Empty means the manifest did not declare any.
    pub policy_types: Vec<Direction>,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            pod_selector: LabelMap::new(),
            ingress: Vec::new(),
            egress: Vec::new(),
            policy_types: Vec::new(),
        }
    }

    pub fn with_pod_selector(mut self, labels: LabelMap) -> Self {
        self.pod_selector = labels;
        self
    }

    /// Appends an ingress rule, retagging it as ingress.
    pub fn with_ingress_rule(mut self, mut rule: Rule) -> Self {
        rule.direction = Direction::Ingress;
        self.ingress.push(rule);
        self
    }

    /// Appends an egress rule, retagging it as egress.
    pub fn with_egress_rule(mut self, mut rule: Rule) -> Self {
        rule.direction = Direction::Egress;
        self.egress.push(rule);
        self
    }

    pub fn with_policy_types(mut self, types: impl IntoIterator<Item = Direction>) -> Self {
        self.policy_types = types.into_iter().collect();
        self
    }

    /// Rules for one direction.
    pub fn rules(&self, direction: Direction) -> &[Rule] {
        match direction {
            Direction::Ingress => &self.ingress,
            Direction::Egress => &self.egress,
        }
    }

    /// Policy types in effect.
    ///
    /// When none are declared Kubernetes assumes `Ingress`, plus `Egress` if
    /// the policy has any egress rule.
    pub fn effective_policy_types(&self) -> Vec<Direction> {
        if !self.policy_types.is_empty() {
            let mut types = self.policy_types.clone();
            types.sort();
            types.dedup();
            return types;
        }

        let mut types = vec![Direction::Ingress];
        if !self.egress.is_empty() {
            types.push(Direction::Egress);
        }
        types
    }

    pub fn has_ingress_policy(&self) -> bool {
        self.effective_policy_types().contains(&Direction::Ingress)
    }

    pub fn has_egress_policy(&self) -> bool {
        self.effective_policy_types().contains(&Direction::Egress)
    }
}
