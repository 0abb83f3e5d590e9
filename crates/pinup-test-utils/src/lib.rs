//! Testing utilities for the pinup workspace
//!
//! In-memory collaborators, fixtures, and digest helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use pinup_core::{LocalFiles, UpdateArtifact, Upgrader, UpgraderConfig, UpgradeRequest};
use pinup_resolve::{ByteStream, FetchError, Fetcher, MemoryCache, PackageCache};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Bodies are served in chunks this large so hashing sees several pieces
const CHUNK_SIZE: usize = 7;

pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

#[derive(Debug, Clone)]
enum Response {
    Body(Bytes),
    Status(u16),
    /// First half of the body, then a read error
    Broken(Bytes),
}

/// [`Fetcher`] serving fixed responses; unknown URLs get a 404
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Response>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.responses.insert(url.into(), Response::Body(body.into()));
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.responses.insert(url.into(), Response::Status(status));
        self
    }

    pub fn with_broken_body(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.responses.insert(url.into(), Response::Broken(body.into()));
        self
    }

    /// Every URL fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }
}

fn chunks(body: &Bytes) -> Vec<Result<Bytes, FetchError>> {
    (0..body.len())
        .step_by(CHUNK_SIZE)
        .map(|start| Ok(body.slice(start..(start + CHUNK_SIZE).min(body.len()))))
        .collect()
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        self.calls.lock().push(url.to_string());
        match self.responses.get(url) {
            Some(Response::Body(body)) => Ok(stream::iter(chunks(body)).boxed()),
            Some(Response::Broken(body)) => {
                let mut parts = chunks(&body.slice(..body.len() / 2));
                parts.push(Err(FetchError::body(url, "connection reset")));
                Ok(stream::iter(parts).boxed())
            }
            Some(Response::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// One `PackageCache::set` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheWrite {
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub ttl_minutes: u64,
}

/// [`MemoryCache`] that also records every write
#[derive(Default)]
pub struct RecordingCache {
    inner: MemoryCache,
    writes: Mutex<Vec<CacheWrite>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write so far, in call order
    pub fn writes(&self) -> Vec<CacheWrite> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl PackageCache for RecordingCache {
    async fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.inner.get(namespace, key).await
    }

    async fn set(&self, namespace: &str, key: &str, value: String, ttl_minutes: u64) {
        self.writes.lock().push(CacheWrite {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.clone(),
            ttl_minutes,
        });
        self.inner.set(namespace, key, value, ttl_minutes).await;
    }
}

/// [`LocalFiles`] backed by a map
#[derive(Debug, Default)]
pub struct InMemoryFiles {
    files: DashMap<String, Vec<u8>>,
    reads: Mutex<Vec<String>>,
}

impl InMemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Every path read so far, in call order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().clone()
    }
}

#[async_trait]
impl LocalFiles for InMemoryFiles {
    async fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.reads.lock().push(path.to_string());
        self.files.get(path).map(|entry| entry.value().clone())
    }
}

/// Unified diff adding `package_version = "<version>"` to a BUILD file
pub fn version_patch(version: &str) -> String {
    format!(
        "--- a/BUILD.bazel\n\
         +++ b/BUILD.bazel\n\
         @@ -1,3 +1,4 @@\n \
         cc_library(\n     \
         name = \"lib\",\n\
         +    package_version = \"{version}\",\n \
         )\n"
    )
}

/// Upgrader over the given fetcher and files with a fresh cache
pub fn setup_upgrader(fetcher: Arc<StaticFetcher>, files: Arc<InMemoryFiles>) -> Upgrader {
    setup_upgrader_with_cache(fetcher, files, Arc::new(MemoryCache::default()))
}

pub fn setup_upgrader_with_cache(
    fetcher: Arc<StaticFetcher>,
    files: Arc<InMemoryFiles>,
    cache: Arc<dyn PackageCache>,
) -> Upgrader {
    Upgrader::new(UpgraderConfig::default(), files, fetcher, cache).unwrap()
}

/// Single-request input for `WORKSPACE`
pub fn workspace_artifact(content: &str, request: UpgradeRequest) -> UpdateArtifact {
    UpdateArtifact::new("WORKSPACE", vec![request], content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn recording_cache_stores_and_records() {
        let cache = RecordingCache::new();
        cache.set("ns", "k", "v".to_string(), 5).await;
        assert_eq!(cache.get("ns", "k").await.as_deref(), Some("v"));
        assert_eq!(
            cache.writes(),
            vec![CacheWrite {
                namespace: "ns".to_string(),
                key: "k".to_string(),
                value: "v".to_string(),
                ttl_minutes: 5,
            }]
        );
    }

    #[test]
    fn version_patch_layout() {
        let patch = version_patch("1.2.3");
        assert!(patch.contains("\n@@ -1,3 +1,4 @@\n"));
        assert!(patch.contains("\n+    package_version = \"1.2.3\",\n"));
        assert!(patch.contains("\n )\n"));
    }
}
