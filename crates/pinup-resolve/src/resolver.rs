//! Digest resolution across mirrors

use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::cache::PackageCache;
use crate::digest::Sha256Digest;
use crate::fetch::{ByteStream, FetchError, Fetcher};
use crate::mirror::massage_url;

/// Cache namespace for URL digests
pub const DEFAULT_NAMESPACE: &str = "url-sha256";

/// Three days
pub const DEFAULT_TTL_MINUTES: u64 = 3 * 24 * 60;

/// Mirrors fetched at once per rule
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Tuning for [`HashResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Maximum simultaneous downloads
    pub concurrency: usize,
    /// Cache namespace
    pub namespace: String,
    /// Lifetime of cached digests
    pub ttl_minutes: u64,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

/// Resolution failure for a whole URL set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No URL produced a digest (or there were none)
    #[error("no digest resolved from {attempted} url(s)")]
    NoDigestResolved { attempted: usize },
}

/// Computes artifact digests from mirror URLs
#[derive(Clone)]
pub struct HashResolver {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn PackageCache>,
    options: ResolveOptions,
}

impl HashResolver {
    /// Create resolver with default options
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn PackageCache>) -> Self {
        Self {
            fetcher,
            cache,
            options: ResolveOptions::default(),
        }
    }

    /// Replace the options
    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve one digest for a set of mirrors of the same artifact
    ///
    /// Each URL is fetched independently; failures are logged and skipped. The
    /// first digest in input order wins.
    ///
    /// # Errors
    /// Returns [`ResolveError::NoDigestResolved`] if `urls` is empty or every URL
    /// failed.
    pub async fn resolve(&self, urls: &[String]) -> Result<Sha256Digest, ResolveError> {
        let results: Vec<Option<Sha256Digest>> = stream::iter(urls)
            .map(|url| async move {
                match self.digest_url(url).await {
                    Ok(digest) => Some(digest),
                    Err(err) => {
                        tracing::debug!(%url, error = %err, "mirror failed");
                        None
                    }
                }
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut found = results.into_iter().flatten();
        let first = found.next().ok_or(ResolveError::NoDigestResolved {
            attempted: urls.len(),
        })?;

        if found.any(|d| d != first) {
            tracing::warn!(
                urls = ?urls,
                chosen = %first,
                "mirrors disagree on digest, keeping the first"
            );
        }
        Ok(first)
    }

    /// Digest a single URL, consulting the cache first
    ///
    /// # Errors
    /// Returns [`FetchError`] if the download fails.
    pub async fn digest_url(&self, url: &str) -> Result<Sha256Digest, FetchError> {
        let url = massage_url(url);
        let namespace = self.options.namespace.as_str();

        if let Some(cached) = self.cache.get(namespace, &url).await {
            match cached.parse() {
                Ok(digest) => {
                    tracing::debug!(%url, "digest cache hit");
                    return Ok(digest);
                }
                Err(err) => tracing::debug!(%url, error = %err, "ignoring corrupt cache entry"),
            }
        }

        let stream = self.fetcher.fetch(&url).await?;
        let digest = digest_stream(stream).await?;
        self.cache
            .set(namespace, &url, digest.to_hex(), self.options.ttl_minutes)
            .await;
        Ok(digest)
    }
}

impl std::fmt::Debug for HashResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Hash a byte stream chunk by chunk
///
/// # Errors
/// Returns the first error the stream yields.
pub async fn digest_stream(mut stream: ByteStream) -> Result<Sha256Digest, FetchError> {
    let mut hasher = Sha256::new();
    while let Some(chunk) = stream.try_next().await? {
        hasher.update(&chunk);
    }
    Ok(Sha256Digest::new(hasher.finalize().into()))
}
