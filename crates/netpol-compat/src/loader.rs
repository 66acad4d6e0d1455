//! Policy sources.
//!
//! The evaluator only ever sees loaded [`Policy`] values. A [`PolicySource`]
//! is the boundary that turns a caller-supplied locator into one.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::manifest::{DocumentFormat, parse_policy};
use crate::model::Policy;

/// Resolves locators to policies.
pub trait PolicySource {
    /// Loads the policy named by `locator`.
    ///
    /// Fails with [`Error::NotFound`] when the locator does not resolve and
    /// [`Error::MalformedDocument`] when the content is not a policy.
    fn load_policy(&self, locator: &str) -> Result<Policy>;
}

impl<T: PolicySource + ?Sized> PolicySource for &T {
    fn load_policy(&self, locator: &str) -> Result<Policy> {
        (**self).load_policy(locator)
    }
}

// ============================================================================
// Directory source
// ============================================================================

/// Reads manifests from the filesystem.
///
/// Relative locators resolve against `root`; absolute locators are used as
/// given. `.json` files are parsed as JSON, everything else as YAML.
#[derive(Debug, Clone)]
pub struct DirectoryPolicySource {
    root: PathBuf,
}

impl DirectoryPolicySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The path a locator resolves to.
    pub fn resolve(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl PolicySource for DirectoryPolicySource {
    fn load_policy(&self, locator: &str) -> Result<Policy> {
        let path = self.resolve(locator);
        debug!(locator, path = %path.display(), "loading policy");

        let bytes = std::fs::read(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                Error::NotFound {
                    locator: locator.to_string(),
                }
            } else {
                Error::Io {
                    locator: locator.to_string(),
                    source,
                }
            }
        })?;
        let text = String::from_utf8(bytes).map_err(|err| Error::malformed(locator, err))?;

        parse_policy(&text, DocumentFormat::from_locator(locator), locator)
    }
}

// ============================================================================
// In-memory source
// ============================================================================

/// Holds manifest text keyed by locator.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicySource {
    documents: HashMap<String, String>,
}

impl InMemoryPolicySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document (builder pattern).
    pub fn with_document(mut self, locator: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(locator, text);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(locator.into(), text.into());
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl PolicySource for InMemoryPolicySource {
    fn load_policy(&self, locator: &str) -> Result<Policy> {
        let text = self.documents.get(locator).ok_or_else(|| Error::NotFound {
            locator: locator.to_string(),
        })?;
        parse_policy(text, DocumentFormat::from_locator(locator), locator)
    }
}
