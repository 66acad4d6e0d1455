//! `NetworkPolicy` manifest parsing.
//!
//! Mirrors the subset of `networking.k8s.io/v1` `NetworkPolicy` that
//! compatibility checking reads, and converts it into a [`Policy`].
//! `matchExpressions`, `ipBlock` and `endPort` are accepted but not
//! interpreted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Direction, LabelMap, Peer, Policy, PortConstraint, PortSpec, Protocol, Rule};

const KIND: &str = "NetworkPolicy";

/// Encoding of a policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Picks the format from a locator's extension: `.json` is JSON,
    /// anything else YAML.
    pub fn from_locator(locator: &str) -> Self {
        let is_json = std::path::Path::new(locator)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json { Self::Json } else { Self::Yaml }
    }
}

// ============================================================================
// Manifest shape
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicyManifest {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: NetworkPolicySpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPolicySpec {
    #[serde(default)]
    pub pod_selector: Option<LabelSelector>,
    #[serde(default)]
    pub ingress: Option<Vec<IngressRuleManifest>>,
    #[serde(default)]
    pub egress: Option<Vec<EgressRuleManifest>>,
    #[serde(default)]
    pub policy_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: Option<LabelMap>,
    #[serde(default)]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: String,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngressRuleManifest {
    #[serde(default)]
    pub from: Option<Vec<PeerManifest>>,
    #[serde(default)]
    pub ports: Option<Vec<PortManifest>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EgressRuleManifest {
    #[serde(default)]
    pub to: Option<Vec<PeerManifest>>,
    #[serde(default)]
    pub ports: Option<Vec<PortManifest>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerManifest {
    #[serde(default)]
    pub pod_selector: Option<LabelSelector>,
    #[serde(default)]
    pub namespace_selector: Option<LabelSelector>,
    #[serde(default)]
    pub ip_block: Option<IpBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpBlock {
    pub cidr: String,
    #[serde(default)]
    pub except: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortManifest {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port: Option<IntOrString>,
    #[serde(default)]
    pub end_port: Option<i32>,
}

/// Kubernetes `IntOrString`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrString {
    Int(i64),
    String(String),
}

impl IntOrString {
    fn into_port_spec(self) -> PortSpec {
        match self {
            Self::Int(port) => PortSpec::new(port.to_string()),
            Self::String(name) => PortSpec::new(name),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a manifest without converting it.
pub fn parse_manifest(
    text: &str,
    format: DocumentFormat,
    locator: &str,
) -> Result<NetworkPolicyManifest> {
    match format {
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| Error::malformed(locator, e)),
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| Error::malformed(locator, e)),
    }
}

/// Parses a manifest and converts it into a [`Policy`].
pub fn parse_policy(text: &str, format: DocumentFormat, locator: &str) -> Result<Policy> {
    parse_manifest(text, format, locator)?.into_policy(locator)
}

impl NetworkPolicyManifest {
    /// Converts the manifest into a [`Policy`].
    ///
    /// `locator` names the policy when `metadata.name` is absent and is used
    /// in error messages.
    pub fn into_policy(self, locator: &str) -> Result<Policy> {
        if let Some(kind) = self.kind.as_deref().filter(|kind| *kind != KIND) {
            return Err(Error::malformed(
                locator,
                format!("expected kind {KIND}, found {kind}"),
            ));
        }

        let name = self.metadata.name.unwrap_or_else(|| locator.to_string());
        let spec = self.spec;

        let policy_types = spec
            .policy_types
            .unwrap_or_default()
            .iter()
            .map(|t| parse_policy_type(t, locator))
            .collect::<Result<Vec<_>>>()?;

        let ingress = spec
            .ingress
            .unwrap_or_default()
            .into_iter()
            .map(|rule| {
                convert_rule(
                    Direction::Ingress,
                    rule.from.unwrap_or_default(),
                    rule.ports.unwrap_or_default(),
                    locator,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let egress = spec
            .egress
            .unwrap_or_default()
            .into_iter()
            .map(|rule| {
                convert_rule(
                    Direction::Egress,
                    rule.to.unwrap_or_default(),
                    rule.ports.unwrap_or_default(),
                    locator,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Policy {
            name,
            namespace: self.metadata.namespace,
            pod_selector: spec.pod_selector.map(selector_labels).unwrap_or_default(),
            ingress,
            egress,
            policy_types,
        })
    }
}

fn parse_policy_type(value: &str, locator: &str) -> Result<Direction> {
    match value {
        "Ingress" => Ok(Direction::Ingress),
        "Egress" => Ok(Direction::Egress),
        other => Err(Error::malformed(
            locator,
            format!("unknown policy type '{other}'"),
        )),
    }
}

fn convert_rule(
    direction: Direction,
    peers: Vec<PeerManifest>,
    ports: Vec<PortManifest>,
    locator: &str,
) -> Result<Rule> {
    let peers = peers
        .into_iter()
        .map(|peer| Peer {
            pod_selector: peer.pod_selector.map(selector_labels),
            namespace_selector: peer.namespace_selector.map(selector_labels),
        })
        .collect();

    let mut constraints = Vec::with_capacity(ports.len());
    for port in ports {
        let protocol = match port.protocol.as_deref() {
            None => Protocol::default(),
            Some(name) => name.parse().map_err(|e| Error::malformed(locator, e))?,
        };
        match port.port {
            Some(spec) => constraints.push(PortConstraint {
                protocol,
                port: spec.into_port_spec(),
            }),
            None => debug!(
                locator,
                %protocol,
                "skipping port entry without a port number"
            ),
        }
    }

    Ok(Rule {
        direction,
        peers,
        ports: constraints,
    })
}

fn selector_labels(selector: LabelSelector) -> LabelMap {
    if selector
        .match_expressions
        .as_ref()
        .is_some_and(|exprs| !exprs.is_empty())
    {
        debug!("ignoring matchExpressions; only matchLabels are compared");
    }
    selector.match_labels.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::label_map;

    const SERVICE_INGRESS: &str = r"
apiVersion: networking.k8s.io/v1
kind: NetworkPolicy
metadata:
  name: service-ingress
  namespace: default
spec:
  podSelector:
    matchLabels:
      app: nginx
  policyTypes:
    - Ingress
  ingress:
    - from:
        - podSelector:
            matchLabels:
              pod: a
        - namespaceSelector:
            matchLabels:
              ingress-ns: ingress-ns-nginx
          podSelector:
            matchLabels:
              role: frontend
      ports:
        - protocol: TCP
          port: 80
";

    #[test]
    fn parses_yaml_policy() {
        let policy = parse_policy(SERVICE_INGRESS, DocumentFormat::Yaml, "service-ingress.yaml")
            .unwrap();

        assert_eq!(policy.name, "service-ingress");
        assert_eq!(policy.namespace.as_deref(), Some("default"));
        assert_eq!(policy.pod_selector, label_map([("app", "nginx")]));
        assert_eq!(policy.policy_types, vec![Direction::Ingress]);
        assert_eq!(policy.ingress.len(), 1);
        assert!(policy.egress.is_empty());

        let rule = &policy.ingress[0];
        assert_eq!(rule.direction, Direction::Ingress);
        assert_eq!(rule.peers.len(), 2);
        assert_eq!(rule.peers[0].pod_selector, Some(label_map([("pod", "a")])));
        assert_eq!(rule.peers[0].namespace_selector, None);
        assert_eq!(
            rule.peers[1].namespace_selector,
            Some(label_map([("ingress-ns", "ingress-ns-nginx")]))
        );
        assert_eq!(rule.ports, vec![PortConstraint::new(Protocol::Tcp, 80)]);
    }

    #[test]
    fn parses_json_policy() {
        let json = r#"{
            "kind": "NetworkPolicy",
            "metadata": {"name": "egress"},
            "spec": {
                "podSelector": {"matchLabels": {"pod": "a"}},
                "egress": [{
                    "to": [{"podSelector": {"matchLabels": {"app": "nginx"}}}],
                    "ports": [{"protocol": "UDP", "port": 53}, {"port": "dns-tcp"}]
                }]
            }
        }"#;

        let policy = parse_policy(json, DocumentFormat::Json, "egress.json").unwrap();

        assert_eq!(
            policy.egress[0].ports,
            vec![
                PortConstraint::new(Protocol::Udp, 53),
                PortConstraint::new(Protocol::Tcp, "dns-tcp"),
            ]
        );
        assert!(policy.has_egress_policy());
    }

    #[test]
    fn empty_pod_selector_selects_all_pods() {
        let policy = parse_policy(
            "kind: NetworkPolicy\nmetadata: {name: all}\nspec:\n  podSelector: {}\n",
            DocumentFormat::Yaml,
            "all.yaml",
        )
        .unwrap();
        assert!(policy.pod_selector.is_empty());
    }

    #[test]
    fn empty_peer_selector_is_present_but_empty() {
        let policy = parse_policy(
            "spec:\n  ingress:\n    - from:\n        - podSelector: {}\n",
            DocumentFormat::Yaml,
            "p.yaml",
        )
        .unwrap();

        assert_eq!(policy.name, "p.yaml");
        assert_eq!(policy.ingress[0].peers[0].pod_selector, Some(LabelMap::new()));
    }

    #[test]
    fn ip_block_peer_has_no_selectors() {
        let policy = parse_policy(
            "spec:\n  egress:\n    - to:\n        - ipBlock:\n            cidr: 10.0.0.0/8\n",
            DocumentFormat::Yaml,
            "p.yaml",
        )
        .unwrap();

        assert_eq!(policy.egress[0].peers, vec![Peer::default()]);
    }

    #[test]
    fn port_without_number_is_skipped() {
        let policy = parse_policy(
            "spec:\n  ingress:\n    - ports:\n        - protocol: UDP\n",
            DocumentFormat::Yaml,
            "p.yaml",
        )
        .unwrap();

        assert!(policy.ingress[0].ports.is_empty());
    }

    #[test]
    fn wrong_kind_is_malformed() {
        let err = parse_policy("kind: Deployment\n", DocumentFormat::Yaml, "d.yaml").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
        assert!(err.to_string().contains("Deployment"));
    }

    #[test]
    fn unknown_protocol_is_malformed() {
        let err = parse_policy(
            "spec:\n  ingress:\n    - ports:\n        - protocol: ICMP\n          port: 1\n",
            DocumentFormat::Yaml,
            "p.yaml",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn unknown_policy_type_is_malformed() {
        let err = parse_policy(
            "spec:\n  policyTypes: [Sideways]\n",
            DocumentFormat::Yaml,
            "p.yaml",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Sideways"));
    }

    #[test]
    fn invalid_yaml_is_malformed() {
        let err = parse_policy("spec: [unclosed", DocumentFormat::Yaml, "p.yaml").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { locator, .. } if locator == "p.yaml"));
    }

    #[test]
    fn format_from_locator() {
        assert_eq!(DocumentFormat::from_locator("a/b.json"), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_locator("a/b.JSON"), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_locator("a/b.yaml"), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_locator("policy"), DocumentFormat::Yaml);
    }
}
