//! CLI command implementations.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use netpol_compat::{DirectoryPolicySource, PairReport, PortMap};
use netpol_compat_config::{CompatConfig, OutputFormat};

pub mod batch;
pub mod check;
pub mod config;
pub mod inspect;
pub mod version;

/// Traffic keeps flowing.
pub const EXIT_COMPATIBLE: u8 = 0;
/// At least one pair would break traffic or failed to load in a batch.
pub const EXIT_BREAKS: u8 = 1;
/// A policy or the configuration could not be loaded.
pub const EXIT_LOAD_ERROR: u8 = 2;

/// Loads the layered configuration for `project` and applies its output settings.
fn load_config(project: &Path) -> Result<CompatConfig> {
    let config = CompatConfig::load_from_dir(project).with_context(|| {
        format!("Failed to load configuration in {}", project.display())
    })?;

    if !config.output.color {
        crate::style::set_no_color(true);
    }

    Ok(config)
}

fn policy_source(config: &CompatConfig, dir: Option<&Path>) -> DirectoryPolicySource {
    match dir {
        Some(dir) => DirectoryPolicySource::new(dir),
        None => DirectoryPolicySource::new(&config.policies.dir),
    }
}

fn wants_json(config: &CompatConfig, json: bool) -> bool {
    json || config.output.format == OutputFormat::Json
}

fn exit_code(report: &PairReport) -> ExitCode {
    if report.is_error() {
        ExitCode::from(EXIT_LOAD_ERROR)
    } else if report.breaks_traffic() {
        ExitCode::from(EXIT_BREAKS)
    } else {
        ExitCode::from(EXIT_COMPATIBLE)
    }
}

/// Renders a port map as `TCP: 80, 53; UDP: 53`.
pub(crate) fn format_ports(ports: &PortMap) -> String {
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .map(|(protocol, specs)| {
            let specs: Vec<&str> = specs.iter().map(|spec| spec.as_str()).collect();
            format!("{protocol}: {}", specs.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
