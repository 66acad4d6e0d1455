//! Error types.

use thiserror::Error;

/// Errors raised while obtaining policies.
///
/// Evaluation itself never fails; these come from the loading side and are
/// returned as values so one bad document does not stop a batch.
#[derive(Debug, Error)]
pub enum Error {
    /// The locator does not resolve to a document.
    #[error("policy not found: {locator}")]
    NotFound { locator: String },

    /// The document exists but cannot be read as a `NetworkPolicy`.
    #[error("malformed policy document {locator}: {reason}")]
    MalformedDocument { locator: String, reason: String },

    /// The document could not be read.
    #[error("failed to read policy {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// A selector cannot be reduced to exact-match labels. Reserved; not
    /// raised by the current extractors.
    #[error("ambiguous selector: {reason}")]
    AmbiguousSelector { reason: String },
}

impl Error {
    pub(crate) fn malformed(locator: &str, reason: impl ToString) -> Self {
        Self::MalformedDocument {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for policy loading.
pub type Result<T> = std::result::Result<T, Error>;
