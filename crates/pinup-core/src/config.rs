//! Upgrader configuration

use pinup_resolve::{ResolveOptions, DEFAULT_CONCURRENCY, DEFAULT_NAMESPACE, DEFAULT_TTL_MINUTES};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Settings for an [`Upgrader`](crate::Upgrader)
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpgraderConfig {
    /// Mirrors downloaded at once per rule
    pub fetch_concurrency: usize,
    /// Cache namespace for URL digests
    pub cache_namespace: String,
    /// Lifetime of cached digests in minutes
    pub cache_ttl_minutes: u64,
    /// Per-request HTTP timeout in seconds
    pub http_timeout_secs: u64,
    /// Rule kinds requests may target
    pub supported_kinds: Vec<String>,
    /// Assignment names rewritten inside patch files
    pub version_fields: Vec<String>,
}

impl UpgraderConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With fetch concurrency
    #[inline]
    #[must_use]
    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency;
        self
    }

    /// With cache TTL
    #[inline]
    #[must_use]
    pub fn with_cache_ttl_minutes(mut self, minutes: u64) -> Self {
        self.cache_ttl_minutes = minutes;
        self
    }

    /// With HTTP timeout
    #[inline]
    #[must_use]
    pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    /// With supported rule kinds
    #[must_use]
    pub fn with_supported_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// With patch version field names
    #[must_use]
    pub fn with_version_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.version_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Check if requests may target `kind`
    #[must_use]
    pub fn supports(&self, kind: &str) -> bool {
        self.supported_kinds.iter().any(|k| k == kind)
    }

    /// HTTP timeout as a duration
    #[inline]
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Options for the digest resolver
    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            concurrency: self.fetch_concurrency,
            namespace: self.cache_namespace.clone(),
            ttl_minutes: self.cache_ttl_minutes,
        }
    }

    /// Reject values that cannot work
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid("fetch_concurrency must be at least 1".into()));
        }
        if self.cache_namespace.is_empty() {
            return Err(ConfigError::Invalid("cache_namespace must not be empty".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid("http_timeout_secs must be at least 1".into()));
        }
        if let Some(field) = self
            .version_fields
            .iter()
            .find(|f| f.is_empty() || !f.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            return Err(ConfigError::Invalid(format!(
                "version field '{field}' must be a non-empty identifier"
            )));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns [`ConfigError`] on syntax errors, unknown keys or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }
}

impl Default for UpgraderConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_CONCURRENCY,
            cache_namespace: DEFAULT_NAMESPACE.to_string(),
            cache_ttl_minutes: DEFAULT_TTL_MINUTES,
            http_timeout_secs: 60,
            supported_kinds: vec!["http_archive".to_string(), "http_file".to_string()],
            version_fields: vec!["package_version".to_string()],
        }
    }
}
