//! Single pair check.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use netpol_compat::{
    CompatibilityResult, PairOutcome, PairReport, PeerMatching, PolicyPair, check_pair,
};

use crate::style::{SemanticStyle, print_error, print_failure, print_labeled, print_success};

pub fn run(
    project: &Path,
    dir: Option<&Path>,
    pair: &PolicyPair,
    json: bool,
    peer_matching: Option<PeerMatching>,
) -> Result<ExitCode> {
    let config = super::load_config(project)?;

    let mut options = config.evaluation_options();
    if let Some(peer_matching) = peer_matching {
        options = options.with_peer_matching(peer_matching);
    }

    let source = super::policy_source(&config, dir);
    let report = check_pair(&source, pair, &options);

    if super::wants_json(&config, json) {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(super::exit_code(&report))
}

fn print_report(report: &PairReport) {
    match &report.outcome {
        PairOutcome::Verdict(result) => {
            if result.compatible {
                print_success(&format!("compatible: {}", report.pair.to_string().code()));
            } else {
                print_failure(&format!(
                    "traffic would break: {}",
                    report.pair.to_string().code()
                ));
            }
            print_verdict_details(result);
        }
        PairOutcome::Error { reason } => {
            print_error(&format!("could not check {}: {reason}", report.pair));
        }
    }
}

fn print_verdict_details(result: &CompatibilityResult) {
    print_labeled("stage", &result.stage.to_string());
    if let Some(witness) = &result.witness_label {
        print_labeled("ingress peer match", &witness.to_string());
    }
    if let Some(witness) = &result.egress_witness_label {
        print_labeled("egress peer match", &witness.to_string());
    }
    if !result.missing_ports.is_empty() {
        print_labeled(
            "missing egress ports",
            &super::format_ports(&result.missing_ports).warning(),
        );
    }
}
