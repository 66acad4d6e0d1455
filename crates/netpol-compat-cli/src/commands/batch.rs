//! Batch checks over many policy pairs.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Result, bail};
use netpol_compat::{BatchSummary, PairReport, PeerMatching, PolicyPair, evaluate_batch};
use serde::Serialize;

use crate::style::{SemanticStyle, print_batch_table, print_failure, print_success};

#[derive(Serialize)]
struct BatchOutput<'a> {
    summary: BatchSummary,
    reports: &'a [PairReport],
}

pub fn run(
    project: &Path,
    dir: Option<&Path>,
    pairs: Vec<PolicyPair>,
    json: bool,
    sequential: bool,
    peer_matching: Option<PeerMatching>,
) -> Result<ExitCode> {
    let config = super::load_config(project)?;

    let pairs: Vec<PolicyPair> = config.batch.pairs.iter().cloned().chain(pairs).collect();
    if pairs.is_empty() {
        bail!(
            "no policy pairs to check: pass --pair INGRESS=EGRESS or add [[batch.pairs]] to {}",
            project.join("netpol-compat.toml").display()
        );
    }

    let mut options = config.batch_options();
    if sequential {
        options.parallel = false;
    }
    if let Some(peer_matching) = peer_matching {
        options.evaluation = options.evaluation.with_peer_matching(peer_matching);
    }

    let source = super::policy_source(&config, dir);
    let reports = evaluate_batch(&source, &pairs, &options);
    let summary = BatchSummary::from_reports(&reports);

    if super::wants_json(&config, json) {
        let output = BatchOutput {
            summary,
            reports: &reports,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_batch_table(&reports);
        let line = format!(
            "{} pairs: {} compatible, {} breaking, {} errors",
            summary.total, summary.compatible, summary.breaking, summary.errors
        );
        if summary.is_clean() {
            print_success(&line);
        } else {
            print_failure(&line.warning());
        }
    }

    Ok(if summary.is_clean() {
        ExitCode::from(super::EXIT_COMPATIBLE)
    } else {
        ExitCode::from(super::EXIT_BREAKS)
    })
}
