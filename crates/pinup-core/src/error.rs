//! Error types for pinup-core
//!
//! None of these reach the caller of
//! [`Upgrader::update_artifacts`](crate::Upgrader::update_artifacts): a
//! [`SkipReason`] drops one request and is logged.

use pinup_resolve::ResolveError;
use pinup_splice::SpliceError;
use std::path::PathBuf;

/// Why an upgrade request produced no edits
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    /// Request names a rule kind this upgrader does not handle
    #[error("unsupported rule kind '{kind}'")]
    UnsupportedKind { kind: String },

    /// No rule at the index, or parsing stopped before it
    #[error("no rule at index {index}")]
    RuleNotFound { index: usize },

    /// Rule has neither `url` nor `urls`
    #[error("rule '{rule}' has no download urls")]
    NoDownloadUrls { rule: String },

    /// Every referenced patch was unreadable or malformed
    #[error("none of {count} patch file(s) is a valid patch")]
    AllPatchesInvalid { count: usize },

    /// No mirror yielded a digest
    #[error("digest resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Edits could not be applied
    #[error("splice failed: {0}")]
    Splice(#[from] SpliceError),
}

impl SkipReason {
    /// Check if the skip deserves a warning rather than a debug line
    #[inline]
    #[must_use]
    pub fn is_notable(&self) -> bool {
        matches!(self, Self::AllPatchesInvalid { .. } | Self::Splice(_))
    }
}

/// Errors from local file access
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// Path escapes the repository root
    #[error("path '{0}' is outside the repository")]
    OutsideRoot(String),

    /// I/O failure
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Create I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`UpgraderConfig`](crate::UpgraderConfig)
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value: {0}")]
    Invalid(String),

    /// Version field pattern failed to compile
    #[error("invalid version field pattern: {0}")]
    Pattern(#[from] regex::Error),
}
