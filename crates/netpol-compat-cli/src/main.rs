//! netpol-compat CLI.
//!
//! Checks whether rolling out an egress NetworkPolicy would drop traffic
//! that an existing ingress NetworkPolicy expects to accept.
//!
//! # Quick Start
//!
//! ```bash
//! # One pair, resolved against ./policies
//! netpol-compat check service-ingress.yaml break-nginx-egress.yaml
//!
//! # Every pair listed in netpol-compat.toml plus one more
//! netpol-compat batch --pair service-ingress.yaml=ok-nginx-egress.yaml
//!
//! # What the tool sees in a manifest
//! netpol-compat inspect service-ingress.yaml
//! ```

mod commands;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use netpol_compat::{NamespaceSelectorMode, PeerMatching, PolicyPair};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// netpol-compat - find NetworkPolicy rollouts that would break traffic.
#[derive(Parser)]
#[command(name = "netpol-compat")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Check one ingress policy against one egress policy.
    Check {
        /// Locator of the policy whose ingress rules must keep working.
        ingress: String,

        /// Locator of the policy whose egress rules are being rolled out.
        egress: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// How peer selectors are compared with the other policy's subject.
        #[arg(long, value_enum)]
        peer_matching: Option<PeerMatchingArg>,
    },

    /// Check many policy pairs.
    Batch {
        /// Pair to check, repeatable.
        #[arg(long = "pair", value_name = "INGRESS=EGRESS")]
        pairs: Vec<PolicyPair>,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the reports as JSON.
        #[arg(long)]
        json: bool,

        /// Evaluate pairs one at a time.
        #[arg(long)]
        sequential: bool,

        /// How peer selectors are compared with the other policy's subject.
        #[arg(long, value_enum)]
        peer_matching: Option<PeerMatchingArg>,
    },

    /// Show the selectors and ports extracted from a policy.
    Inspect {
        /// Policy locator.
        policy: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,

        /// How namespace-selector labels are read from ingress peers.
        #[arg(long, value_enum)]
        namespace_selectors: Option<NamespaceSelectorArg>,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the merged configuration.
    Show {
        /// Project directory.
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: ConfigFormat,
    },
}

/// Where policies and configuration are read from.
#[derive(clap::Args)]
struct TargetArgs {
    /// Directory policy locators resolve against (overrides `[policies] dir`).
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Project directory holding netpol-compat.toml.
    #[arg(short, long, default_value = ".")]
    project: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeerMatchingArg {
    PerPeer,
    Merged,
}

impl From<PeerMatchingArg> for PeerMatching {
    fn from(arg: PeerMatchingArg) -> Self {
        match arg {
            PeerMatchingArg::PerPeer => Self::PerPeer,
            PeerMatchingArg::Merged => Self::Merged,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum NamespaceSelectorArg {
    Corrected,
    Literal,
}

impl From<NamespaceSelectorArg> for NamespaceSelectorMode {
    fn from(arg: NamespaceSelectorArg) -> Self {
        match arg {
            NamespaceSelectorArg::Corrected => Self::Corrected,
            NamespaceSelectorArg::Literal => Self::Literal,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Text,
    Json,
    Toml,
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    style::set_no_color(cli.no_color || std::env::var_os("NO_COLOR").is_some());

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            style::print_error(&format!("{err:#}"));
            ExitCode::from(commands::EXIT_LOAD_ERROR)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Version => {
            commands::version::run();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            ingress,
            egress,
            target,
            json,
            peer_matching,
        } => commands::check::run(
            &target.project,
            target.dir.as_deref(),
            &PolicyPair::new(ingress, egress),
            json,
            peer_matching.map(Into::into),
        ),
        Commands::Batch {
            pairs,
            target,
            json,
            sequential,
            peer_matching,
        } => commands::batch::run(
            &target.project,
            target.dir.as_deref(),
            pairs,
            json,
            sequential,
            peer_matching.map(Into::into),
        ),
        Commands::Inspect {
            policy,
            target,
            json,
            namespace_selectors,
        } => commands::inspect::run(
            &target.project,
            target.dir.as_deref(),
            &policy,
            json,
            namespace_selectors.map(Into::into),
        ),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { project, format } => {
                commands::config::show(&project, format)?;
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}
