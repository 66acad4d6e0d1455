//! Configuration error types

use std::path::PathBuf;

use netpol_compat::PolicyPair;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read netpol-compat config {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is not a valid netpol-compat config: {source}", path.display())]
    InvalidToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A `[[batch.pairs]]` entry names no policy on one side.
    #[error("batch pair #{index} ({pair}) has an empty {side} locator")]
    EmptyPairLocator {
        index: usize,
        side: &'static str,
        pair: PolicyPair,
    },

    #[error("no user configuration directory for netpol-compat on this platform")]
    NoUserConfigDir,
}
