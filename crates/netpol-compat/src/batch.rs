//! Batch evaluation of policy pairs.
//!
//! Every pair is independent: a pair whose documents fail to load is
//! reported as an error and the remaining pairs still run. Reports come
//! back in input order whether or not pairs are evaluated in parallel.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::Result;
use crate::evaluator::{CompatibilityResult, EvaluationOptions, evaluate_with};
use crate::loader::PolicySource;
use crate::model::Policy;

/// An (ingress policy, egress policy) pair of locators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyPair {
    pub ingress: String,
    pub egress: String,
}

impl PolicyPair {
    pub fn new(ingress: impl Into<String>, egress: impl Into<String>) -> Self {
        Self {
            ingress: ingress.into(),
            egress: egress.into(),
        }
    }
}

impl fmt::Display for PolicyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.ingress, self.egress)
    }
}

/// Error parsing an `INGRESS=EGRESS` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid policy pair '{0}': expected INGRESS=EGRESS")]
pub struct InvalidPair(pub String);

impl FromStr for PolicyPair {
    type Err = InvalidPair;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((ingress, egress)) if !ingress.is_empty() && !egress.is_empty() => {
                Ok(Self::new(ingress, egress))
            }
            _ => Err(InvalidPair(s.to_string())),
        }
    }
}

/// Outcome for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    Verdict(CompatibilityResult),
    Error { reason: String },
}

/// One pair together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub pair: PolicyPair,
    pub outcome: PairOutcome,
}

impl PairReport {
    pub fn verdict(&self) -> Option<&CompatibilityResult> {
        match &self.outcome {
            PairOutcome::Verdict(result) => Some(result),
            PairOutcome::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, PairOutcome::Error { .. })
    }

    pub fn breaks_traffic(&self) -> bool {
        self.verdict().is_some_and(CompatibilityResult::breaks_traffic)
    }
}

/// Options for [`evaluate_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub evaluation: EvaluationOptions,
    /// Evaluate pairs on the rayon thread pool.
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            evaluation: EvaluationOptions::default(),
            parallel: true,
        }
    }
}

/// Counts over a set of reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub compatible: usize,
    pub breaking: usize,
    pub errors: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[PairReport]) -> Self {
        reports.iter().fold(Self::default(), |mut summary, report| {
            summary.total += 1;
            match report.verdict() {
                Some(result) if result.compatible => summary.compatible += 1,
                Some(_) => summary.breaking += 1,
                None => summary.errors += 1,
            }
            summary
        })
    }

    /// No pair broke traffic and every pair loaded.
    pub fn is_clean(&self) -> bool {
        self.breaking == 0 && self.errors == 0
    }
}

/// Loads and evaluates one pair.
pub fn check_pair<S>(source: &S, pair: &PolicyPair, options: &EvaluationOptions) -> PairReport
where
    S: PolicySource + ?Sized,
{
    let outcome = match load_pair(source, pair) {
        Ok((ingress, egress)) => PairOutcome::Verdict(evaluate_with(&ingress, &egress, options)),
        Err(err) => {
            warn!(pair = %pair, error = %err, "failed to load policy pair");
            PairOutcome::Error {
                reason: err.to_string(),
            }
        }
    };

    PairReport {
        pair: pair.clone(),
        outcome,
    }
}

/// Evaluates every pair, returning one report per pair in input order.
pub fn evaluate_batch<S>(source: &S, pairs: &[PolicyPair], options: &BatchOptions) -> Vec<PairReport>
where
    S: PolicySource + Sync + ?Sized,
{
    let reports: Vec<PairReport> = if options.parallel {
        pairs
            .par_iter()
            .map(|pair| check_pair(source, pair, &options.evaluation))
            .collect()
    } else {
        pairs
            .iter()
            .map(|pair| check_pair(source, pair, &options.evaluation))
            .collect()
    };

    let summary = BatchSummary::from_reports(&reports);
    info!(
        total = summary.total,
        compatible = summary.compatible,
        breaking = summary.breaking,
        errors = summary.errors,
        "batch evaluated"
    );

    reports
}

fn load_pair<S>(source: &S, pair: &PolicyPair) -> Result<(Policy, Policy)>
where
    S: PolicySource + ?Sized,
{
    let ingress = source.load_policy(&pair.ingress)?;
    let egress = source.load_policy(&pair.egress)?;
    Ok((ingress, egress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Stage;
    use crate::loader::InMemoryPolicySource;
    use test_case::test_case;

    const INGRESS: &str = "
kind: NetworkPolicy
metadata: {name: service-ingress}
spec:
  podSelector: {matchLabels: {app: nginx}}
  ingress:
    - from: [{podSelector: {matchLabels: {pod: a}}}]
      ports: [{protocol: TCP, port: 80}]
";

    const OK_EGRESS: &str = "
kind: NetworkPolicy
metadata: {name: ok-egress}
spec:
  podSelector: {matchLabels: {pod: a}}
  egress:
    - to: [{podSelector: {matchLabels: {app: nginx}}}]
      ports: [{protocol: TCP, port: 80}, {protocol: TCP, port: 53}]
";

    const BREAK_EGRESS: &str = "
kind: NetworkPolicy
metadata: {name: break-egress}
spec:
  podSelector: {matchLabels: {pod: a}}
  egress:
    - to: [{podSelector: {matchLabels: {app: nginx}}}]
      ports: [{protocol: TCP, port: 53}]
";

    fn source() -> InMemoryPolicySource {
        InMemoryPolicySource::new()
            .with_document("ingress.yaml", INGRESS)
            .with_document("ok.yaml", OK_EGRESS)
            .with_document("break.yaml", BREAK_EGRESS)
            .with_document("garbage.yaml", "spec: [")
    }

    #[test_case("a.yaml=b.yaml" => Ok(PolicyPair::new("a.yaml", "b.yaml")); "simple")]
    #[test_case("dir/a=dir/b=c" => Ok(PolicyPair::new("dir/a", "dir/b=c")); "splits on first equals")]
    #[test_case("a.yaml" => Err(InvalidPair("a.yaml".to_string())); "missing separator")]
    #[test_case("=b.yaml" => Err(InvalidPair("=b.yaml".to_string())); "missing ingress")]
    #[test_case("a.yaml=" => Err(InvalidPair("a.yaml=".to_string())); "missing egress")]
    fn pair_parsing(input: &str) -> std::result::Result<PolicyPair, InvalidPair> {
        input.parse()
    }

    #[test]
    fn check_pair_reports_verdict() {
        let report = check_pair(
            &source(),
            &PolicyPair::new("ingress.yaml", "break.yaml"),
            &EvaluationOptions::default(),
        );

        assert!(report.breaks_traffic());
        assert_eq!(report.verdict().unwrap().stage, Stage::PortGapFound);
    }

    #[test]
    fn check_pair_reports_load_error() {
        let report = check_pair(
            &source(),
            &PolicyPair::new("ingress.yaml", "missing.yaml"),
            &EvaluationOptions::default(),
        );

        assert!(report.is_error());
        assert!(!report.breaks_traffic());
        match report.outcome {
            PairOutcome::Error { reason } => assert!(reason.contains("missing.yaml")),
            PairOutcome::Verdict(_) => panic!("expected error outcome"),
        }
    }

    #[test_case(true; "parallel")]
    #[test_case(false; "sequential")]
    fn batch_continues_after_failures_and_keeps_order(parallel: bool) {
        let pairs = vec![
            PolicyPair::new("ingress.yaml", "missing.yaml"),
            PolicyPair::new("ingress.yaml", "ok.yaml"),
            PolicyPair::new("ingress.yaml", "garbage.yaml"),
            PolicyPair::new("ingress.yaml", "break.yaml"),
        ];
        let options = BatchOptions {
            parallel,
            ..BatchOptions::default()
        };

        let reports = evaluate_batch(&source(), &pairs, &options);

        assert_eq!(reports.len(), 4);
        for (report, pair) in reports.iter().zip(&pairs) {
            assert_eq!(&report.pair, pair);
        }
        assert!(reports[0].is_error());
        assert_eq!(reports[1].verdict().unwrap().stage, Stage::FullyCompatible);
        assert!(reports[2].is_error());
        assert!(reports[3].breaks_traffic());

        let summary = BatchSummary::from_reports(&reports);
        assert_eq!(
            summary,
            BatchSummary {
                total: 4,
                compatible: 1,
                breaking: 1,
                errors: 2,
            }
        );
        assert!(!summary.is_clean());
    }

    #[test]
    fn empty_batch_is_clean() {
        let reports = evaluate_batch(&source(), &[], &BatchOptions::default());
        assert!(reports.is_empty());
        assert!(BatchSummary::from_reports(&reports).is_clean());
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let report = check_pair(
            &source(),
            &PolicyPair::new("ingress.yaml", "missing.yaml"),
            &EvaluationOptions::default(),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["pair"]["egress"], "missing.yaml");
        assert_eq!(json["outcome"]["status"], "error");
        assert!(json["outcome"]["reason"].as_str().unwrap().contains("not found"));

        let report = check_pair(
            &source(),
            &PolicyPair::new("ingress.yaml", "ok.yaml"),
            &EvaluationOptions::default(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "verdict");
        assert_eq!(json["outcome"]["compatible"], true);
    }
}
