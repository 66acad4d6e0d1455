//! Configuration management commands.

use std::path::Path;

use anyhow::Result;
use netpol_compat_config::Paths;

use crate::ConfigFormat;
use crate::style::{SemanticStyle, print_hint, print_labeled};

/// Show the merged configuration.
pub fn show(project: &Path, format: ConfigFormat) -> Result<()> {
    let config = super::load_config(project)?;

    match format {
        ConfigFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigFormat::Toml => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigFormat::Text => {
            println!("{}", "netpol-compat configuration".header());
            println!();

            println!("Evaluation:");
            print_labeled("Peer matching", config.evaluation.peer_matching.as_str());
            print_labeled(
                "Namespace selectors",
                config.evaluation.namespace_selectors.as_str(),
            );
            println!();

            println!("Policies:");
            print_labeled("Directory", &config.policies.dir.display().to_string());
            println!();

            println!("Batch:");
            print_labeled("Parallel", &config.batch.parallel.to_string());
            print_labeled("Pairs", &config.batch.pairs.len().to_string());
            for pair in &config.batch.pairs {
                println!("    {}", pair.to_string().code());
            }
            println!();

            println!("Output:");
            print_labeled("Format", config.output.format.as_str());
            print_labeled("Color", &config.output.color.to_string());

            if !Paths::is_configured(project) {
                println!();
                print_hint(&format!(
                    "No netpol-compat.toml in {}; showing defaults and overrides",
                    project.display()
                ));
            }
        }
    }

    Ok(())
}
