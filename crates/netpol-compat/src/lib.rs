//! # netpol-compat: NetworkPolicy compatibility checking
//!
//! Answers one question before a policy rollout: would this egress policy
//! silently drop traffic that an existing ingress policy expects to accept?
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  PolicySource (directory / in-memory)        │
//! │  locator ──► manifest ──► Policy             │
//! └─────────────────┬───────────────────────────┘
//!                   │  policy A (ingress), policy B (egress)
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Evaluator                                   │
//! │  ├─ 1. A's ingress peers select B's subject? │
//! │  ├─ 2. B's egress peers select A's subject?  │
//! │  ├─ 3. ports per protocol on both sides      │
//! │  └─ 4. egress ports cover ingress ports?     │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  CompatibilityResult                         │
//! │  - compatible / stage                        │
//! │  - witness labels                            │
//! │  - uncovered protocols                       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use netpol_compat::{Peer, Policy, Protocol, Rule, Stage, evaluate, label_map};
//!
//! let ingress = Policy::new("service-ingress")
//!     .with_pod_selector(label_map([("app", "nginx")]))
//!     .with_ingress_rule(
//!         Rule::ingress()
//!             .with_peer(Peer::pods(label_map([("pod", "a")])))
//!             .with_port(Protocol::Tcp, 80),
//!     );
//!
//! let egress = Policy::new("pod-a-egress")
//!     .with_pod_selector(label_map([("pod", "a")]))
//!     .with_egress_rule(
//!         Rule::egress()
//!             .with_peer(Peer::pods(label_map([("app", "nginx")])))
//!             .with_port(Protocol::Tcp, 53),
//!     );
//!
//! let result = evaluate(&ingress, &egress);
//! assert!(!result.compatible);
//! assert_eq!(result.stage, Stage::PortGapFound);
//! assert_eq!(result.uncovered_protocols, vec![Protocol::Tcp]);
//! ```
//!
//! Loading from disk and checking many pairs:
//!
//! ```no_run
//! use netpol_compat::{BatchOptions, DirectoryPolicySource, PolicyPair, evaluate_batch};
//!
//! let source = DirectoryPolicySource::new("./policies");
//! let pairs = vec![
//!     PolicyPair::new("service-ingress.yaml", "ok-nginx-egress.yaml"),
//!     PolicyPair::new("service-ingress.yaml", "break-nginx-egress.yaml"),
//! ];
//!
//! for report in evaluate_batch(&source, &pairs, &BatchOptions::default()) {
//!     println!("{}: breaks traffic = {}", report.pair, report.breaks_traffic());
//! }
//! ```

pub mod batch;
pub mod coverage;
pub mod error;
pub mod evaluator;
pub mod labels;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod ports;
pub mod selector;


pub use batch::{
    BatchOptions, BatchSummary, InvalidPair, PairOutcome, PairReport, PolicyPair, check_pair,
    evaluate_batch,
};
pub use coverage::{covers, missing_ports, uncovered_protocols};
pub use error::{Error, Result};
pub use evaluator::{
    CompatibilityResult, EvaluationOptions, PeerMatching, Stage, evaluate, evaluate_with,
};
pub use labels::{
    NamespaceSelectorMode, peer_namespace_selector_sets, peer_namespace_selectors,
    peer_pod_selector_sets, peer_pod_selectors, subject_selector,
};
pub use loader::{DirectoryPolicySource, InMemoryPolicySource, PolicySource};
pub use manifest::{DocumentFormat, parse_policy};
pub use model::{
    Direction, LabelMap, LabelPair, Peer, Policy, PortConstraint, PortSpec, Protocol, Rule,
    label_map,
};
pub use ports::{PortMap, ports_by_protocol};
pub use selector::{Overlap, PeerMatch, find_overlap, first_matching_peer, has_overlap};
