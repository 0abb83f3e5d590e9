//! Mirror resolution against an in-memory fetcher

use pinup_resolve::{
    HashResolver, MemoryCache, PackageCache, ResolveError, ResolveOptions, Sha256Digest,
    DEFAULT_NAMESPACE,
};
use pinup_test_utils::{sha256_hex, CacheWrite, RecordingCache, StaticFetcher};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

fn resolver(fetcher: &Arc<StaticFetcher>, cache: &Arc<MemoryCache>) -> HashResolver {
    HashResolver::new(fetcher.clone(), cache.clone())
}

#[tokio::test]
async fn digest_matches_served_bytes() {
    let body = b"a reasonably long archive body split into several chunks".to_vec();
    let fetcher = Arc::new(StaticFetcher::new().with_body("https://a/x.tgz", body.clone()));
    let cache = Arc::new(MemoryCache::default());

    let digest = resolver(&fetcher, &cache)
        .resolve(&urls(&["https://a/x.tgz"]))
        .await
        .unwrap();
    assert_eq!(digest.to_hex(), sha256_hex(&body));
}

#[tokio::test]
async fn second_resolve_is_served_from_cache() {
    let fetcher = Arc::new(StaticFetcher::new().with_body("https://a/x.tgz", "abc"));
    let cache = Arc::new(MemoryCache::default());
    let resolver = resolver(&fetcher, &cache);

    let first = resolver.resolve(&urls(&["https://a/x.tgz"])).await.unwrap();
    let second = resolver.resolve(&urls(&["https://a/x.tgz"])).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.call_count("https://a/x.tgz"), 1);
    assert_eq!(
        cache.get(DEFAULT_NAMESPACE, "https://a/x.tgz").await,
        Some(sha256_hex("abc"))
    );
}

#[tokio::test]
async fn seeded_cache_skips_download() {
    let fetcher = Arc::new(StaticFetcher::new());
    let cache = Arc::new(MemoryCache::default());
    cache
        .set(DEFAULT_NAMESPACE, "https://a/x.tgz", sha256_hex("cached"), 60)
        .await;

    let digest = resolver(&fetcher, &cache)
        .resolve(&urls(&["https://a/x.tgz"]))
        .await
        .unwrap();
    assert_eq!(digest, Sha256Digest::compute(b"cached"));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn corrupt_cache_entry_is_refetched() {
    let fetcher = Arc::new(StaticFetcher::new().with_body("https://a/x.tgz", "fresh"));
    let cache = Arc::new(MemoryCache::default());
    cache
        .set(DEFAULT_NAMESPACE, "https://a/x.tgz", "not-a-digest".to_string(), 60)
        .await;

    let digest = resolver(&fetcher, &cache)
        .resolve(&urls(&["https://a/x.tgz"]))
        .await
        .unwrap();
    assert_eq!(digest.to_hex(), sha256_hex("fresh"));
    assert_eq!(fetcher.call_count("https://a/x.tgz"), 1);
}

#[tokio::test]
async fn massaged_url_is_fetched_and_cached() {
    let original = "https://github.com/bazelbuild/rules_go/releases/download/0.24.0/rules_go-0.24.0.tar.gz";
    let massaged = "https://github.com/bazelbuild/rules_go/releases/download/v0.24.0/rules_go-v0.24.0.tar.gz";
    let fetcher = Arc::new(StaticFetcher::new().with_body(massaged, "go"));
    let cache = Arc::new(MemoryCache::default());

    let digest = resolver(&fetcher, &cache).resolve(&urls(&[original])).await.unwrap();

    assert_eq!(digest.to_hex(), sha256_hex("go"));
    assert_eq!(fetcher.calls(), vec![massaged.to_string()]);
    assert!(cache.get(DEFAULT_NAMESPACE, massaged).await.is_some());
    assert!(cache.get(DEFAULT_NAMESPACE, original).await.is_none());
}

#[tokio::test]
async fn digests_are_stored_for_three_days_under_massaged_url() {
    let original = "https://github.com/bazelbuild/rules_go/releases/download/0.24.0/rules_go-0.24.0.tar.gz";
    let massaged = "https://github.com/bazelbuild/rules_go/releases/download/v0.24.0/rules_go-v0.24.0.tar.gz";
    let fetcher = Arc::new(StaticFetcher::new().with_body(massaged, "go"));
    let cache = Arc::new(RecordingCache::new());

    HashResolver::new(fetcher, cache.clone())
        .resolve(&urls(&[original]))
        .await
        .unwrap();

    assert_eq!(
        cache.writes(),
        vec![CacheWrite {
            namespace: "url-sha256".to_string(),
            key: massaged.to_string(),
            value: sha256_hex("go"),
            ttl_minutes: 4320,
        }]
    );
}

#[tokio::test]
async fn failing_mirrors_are_tolerated() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_status("https://a/x.tgz", 503)
            .with_broken_body("https://b/x.tgz", "truncated body")
            .with_body("https://c/x.tgz", "good"),
    );
    let cache = Arc::new(MemoryCache::default());

    let digest = resolver(&fetcher, &cache)
        .resolve(&urls(&["https://a/x.tgz", "https://b/x.tgz", "https://c/x.tgz"]))
        .await
        .unwrap();
    assert_eq!(digest.to_hex(), sha256_hex("good"));

    // failures are not cached
    assert!(cache.get(DEFAULT_NAMESPACE, "https://a/x.tgz").await.is_none());
    assert!(cache.get(DEFAULT_NAMESPACE, "https://b/x.tgz").await.is_none());
}

#[tokio::test]
async fn all_mirrors_failing_is_an_error() {
    let fetcher = Arc::new(StaticFetcher::new().with_status("https://a/x.tgz", 500));
    let cache = Arc::new(MemoryCache::default());

    let result = resolver(&fetcher, &cache)
        .resolve(&urls(&["https://a/x.tgz", "https://b/x.tgz"]))
        .await;
    assert_eq!(result, Err(ResolveError::NoDigestResolved { attempted: 2 }));
}

#[tokio::test]
async fn disagreeing_mirrors_keep_first_in_input_order() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_body("https://a/x.tgz", "one")
            .with_body("https://b/x.tgz", "two"),
    );
    let cache = Arc::new(MemoryCache::default());
    let resolver = resolver(&fetcher, &cache);

    let digest = resolver
        .resolve(&urls(&["https://b/x.tgz", "https://a/x.tgz"]))
        .await
        .unwrap();
    assert_eq!(digest.to_hex(), sha256_hex("two"));
}

#[tokio::test]
async fn identical_mirrors_agree() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_body("https://a/x.tgz", "same")
            .with_body("https://b/x.tgz", "same"),
    );
    let cache = Arc::new(MemoryCache::default());

    let digest = resolver(&fetcher, &cache)
        .resolve(&urls(&["https://a/x.tgz", "https://b/x.tgz"]))
        .await
        .unwrap();
    assert_eq!(digest.to_hex(), sha256_hex("same"));
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test]
async fn sequential_options_fetch_in_input_order() {
    let list = ["https://c/x", "https://a/x", "https://b/x"];
    let fetcher = Arc::new(list.iter().fold(StaticFetcher::new(), |f, url| f.with_body(*url, "x")));
    let cache = Arc::new(MemoryCache::default());
    let resolver = resolver(&fetcher, &cache).with_options(ResolveOptions {
        concurrency: 1,
        ..ResolveOptions::default()
    });

    resolver.resolve(&urls(&list)).await.unwrap();
    assert_eq!(fetcher.calls(), urls(&list));
}

#[tokio::test]
async fn namespace_isolates_entries() {
    let fetcher = Arc::new(StaticFetcher::new().with_body("https://a/x.tgz", "real"));
    let cache = Arc::new(MemoryCache::default());
    cache
        .set(DEFAULT_NAMESPACE, "https://a/x.tgz", sha256_hex("stale"), 60)
        .await;

    let resolver = resolver(&fetcher, &cache).with_options(ResolveOptions {
        namespace: "other".to_string(),
        ..ResolveOptions::default()
    });
    let digest = resolver.resolve(&urls(&["https://a/x.tgz"])).await.unwrap();

    assert_eq!(digest.to_hex(), sha256_hex("real"));
    assert_eq!(cache.get("other", "https://a/x.tgz").await, Some(sha256_hex("real")));
}
