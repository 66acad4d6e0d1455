//! Configuration management for netpol-compat
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, applied by the caller)
//! 2. Environment variables (`NPC_<SECTION>__<KEY>`, e.g. `NPC_BATCH__PARALLEL`)
//! 3. netpol-compat.local.toml (gitignored, local overrides)
//! 4. netpol-compat.toml (git-tracked, project config)
//! 5. ~/.config/netpol-compat/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use netpol_compat::{
    BatchOptions, EvaluationOptions, NamespaceSelectorMode, PeerMatching, PolicyPair,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main netpol-compat configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    pub evaluation: EvaluationConfig,
    pub policies: PoliciesConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub peer_matching: PeerMatching,
    pub namespace_selectors: NamespaceSelectorMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoliciesConfig {
    /// Directory policy locators are resolved against.
    pub dir: PathBuf,
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("policies"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub parallel: bool,
    pub pairs: Vec<PolicyPair>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            pairs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl CompatConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without layering
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::InvalidToml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot be run
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, pair) in self.batch.pairs.iter().enumerate() {
            let side = if pair.ingress.trim().is_empty() {
                "ingress"
            } else if pair.egress.trim().is_empty() {
                "egress"
            } else {
                continue;
            };
            return Err(ConfigError::EmptyPairLocator {
                index: index + 1,
                side,
                pair: pair.clone(),
            });
        }
        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        if self.policies.dir.is_relative() {
            self.policies.dir = base_dir.as_ref().join(&self.policies.dir);
        }
    }

    pub fn evaluation_options(&self) -> EvaluationOptions {
        EvaluationOptions::default().with_peer_matching(self.evaluation.peer_matching)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            evaluation: self.evaluation_options(),
            parallel: self.batch.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CompatConfig::default();
        assert_eq!(config.evaluation.peer_matching, PeerMatching::PerPeer);
        assert_eq!(
            config.evaluation.namespace_selectors,
            NamespaceSelectorMode::Corrected
        );
        assert_eq!(config.policies.dir, PathBuf::from("policies"));
        assert!(config.batch.parallel);
        assert!(config.batch.pairs.is_empty());
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = CompatConfig::default();
        config.evaluation.peer_matching = PeerMatching::Merged;
        config.batch.parallel = false;

        let options = config.batch_options();
        assert_eq!(options.evaluation.peer_matching, PeerMatching::Merged);
        assert!(!options.parallel);
    }

    #[test]
    fn test_path_resolution() {
        let mut config = CompatConfig::default();
        config.resolve_paths("/home/user/project");
        assert_eq!(
            config.policies.dir,
            PathBuf::from("/home/user/project/policies")
        );

        config.policies.dir = PathBuf::from("/etc/policies");
        config.resolve_paths("/home/user/project");
        assert_eq!(config.policies.dir, PathBuf::from("/etc/policies"));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[evaluation]
namespace_selectors = "literal"

[[batch.pairs]]
ingress = "service-ingress.yaml"
egress = "break-nginx-egress.yaml"
"#,
        )
        .expect("Failed to write config");

        let config = CompatConfig::from_file(&path).expect("Failed to load config");
        assert_eq!(
            config.evaluation.namespace_selectors,
            NamespaceSelectorMode::Literal
        );
        assert_eq!(
            config.batch.pairs,
            vec![PolicyPair::new(
                "service-ingress.yaml",
                "break-nginx-egress.yaml"
            )]
        );
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let missing = CompatConfig::from_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Unreadable { .. })));

        let bad = temp_dir.path().join("bad.toml");
        std::fs::write(&bad, "[evaluation\n").expect("Failed to write config");
        assert!(matches!(
            CompatConfig::from_file(&bad),
            Err(ConfigError::InvalidToml { .. })
        ));

        let invalid = temp_dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[[batch.pairs]]\ningress = \"a.yaml\"\negress = \" \"\n")
            .expect("Failed to write config");
        assert!(matches!(
            CompatConfig::from_file(&invalid),
            Err(ConfigError::EmptyPairLocator {
                index: 1,
                side: "egress",
                ..
            })
        ));

        let message = CompatConfig::from_file(&invalid)
            .expect_err("empty locator should be rejected")
            .to_string();
        assert_eq!(
            message,
            "batch pair #1 (a.yaml ->  ) has an empty egress locator"
        );
    }
}
