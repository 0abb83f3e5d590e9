//! Multi-mirror SHA-256 resolution
//!
//! Given the download URLs of one artifact, [`HashResolver`] streams each through
//! SHA-256 with bounded concurrency, caches results per URL, and tolerates any
//! subset of mirrors failing.
//!
//! # Core Concepts
//!
//! - [`Fetcher`]: opens a byte stream for a URL ([`HttpFetcher`] over reqwest)
//! - [`PackageCache`]: namespaced TTL cache ([`MemoryCache`] over moka)
//! - [`Sha256Digest`]: the resolved integrity value

mod cache;
mod digest;
mod fetch;
mod mirror;
mod resolver;

pub use cache::{MemoryCache, PackageCache};
pub use digest::{DigestError, Sha256Digest};
pub use fetch::{ByteStream, FetchError, Fetcher, HttpFetcher};
pub use mirror::{massage_url, URL_MASSAGES};
pub use resolver::{
    digest_stream, HashResolver, ResolveError, ResolveOptions, DEFAULT_CONCURRENCY,
    DEFAULT_NAMESPACE, DEFAULT_TTL_MINUTES,
};
