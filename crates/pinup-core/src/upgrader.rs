//! Upgrade orchestration
//!
//! [`Upgrader::update_artifacts`] applies upgrade requests to a manifest one at a
//! time. Each request re-parses the text produced by the previous one, checks the
//! rule's patch files, resolves the new archive digest from its mirrors and then
//! rewrites the URLs, `strip_prefix` and `sha256` in place. A request that fails
//! at any step leaves the text exactly as it was.

use futures::future::join_all;
use pinup_fragment::{FragmentPath, ManifestDocument, RuleInvocation};
use pinup_resolve::{Fetcher, HashResolver, PackageCache};
use pinup_splice::{replace_many, replace_one, Replacement};
use std::sync::Arc;

use crate::config::UpgraderConfig;
use crate::error::{ConfigError, SkipReason};
use crate::files::LocalFiles;
use crate::patch_file::{normalize_patch_path, PatchRules};
use crate::transform::ValueTransform;
use crate::types::{FileAddition, UpdateArtifact, UpdateOutcome, UpgradeRequest};

/// Edits produced by one successful request
#[derive(Debug)]
struct RuleEdit {
    text: String,
    patch_files: Vec<FileAddition>,
}

/// Applies upgrade requests to manifests
pub struct Upgrader {
    config: UpgraderConfig,
    files: Arc<dyn LocalFiles>,
    resolver: HashResolver,
    patch_rules: PatchRules,
}

impl Upgrader {
    /// Create upgrader resolving digests through `fetcher` and `cache`
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `config` is invalid.
    pub fn new(
        config: UpgraderConfig,
        files: Arc<dyn LocalFiles>,
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn PackageCache>,
    ) -> Result<Self, ConfigError> {
        let resolver = HashResolver::new(fetcher, cache).with_options(config.resolve_options());
        Self::with_resolver(config, files, resolver)
    }

    /// Create upgrader around an existing resolver
    ///
    /// The resolver keeps its own options; only the rest of `config` applies.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `config` is invalid.
    pub fn with_resolver(
        config: UpgraderConfig,
        files: Arc<dyn LocalFiles>,
        resolver: HashResolver,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let patch_rules = PatchRules::new(&config.version_fields)?;
        Ok(Self {
            config,
            files,
            resolver,
            patch_rules,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &UpgraderConfig {
        &self.config
    }

    /// Compiled patch checks
    #[inline]
    #[must_use]
    pub fn patch_rules(&self) -> &PatchRules {
        &self.patch_rules
    }

    /// Apply every request in order and collect the changed files
    ///
    /// Requests that cannot be applied are logged and skipped. The manifest comes
    /// first in the result if it changed, followed by updated patch files in
    /// request order.
    pub async fn update_artifacts(&self, artifact: &UpdateArtifact) -> UpdateOutcome {
        let mut text = artifact.content.clone();
        let mut patch_files = Vec::new();

        for request in &artifact.requests {
            match self.upgrade_rule(&text, request).await {
                Ok(edit) => {
                    text = edit.text;
                    patch_files.extend(edit.patch_files);
                }
                Err(reason) if reason.is_notable() => {
                    tracing::warn!(index = request.index, %reason, "skipping upgrade");
                }
                Err(reason) => {
                    tracing::debug!(index = request.index, %reason, "skipping upgrade");
                }
            }
        }

        let mut files = Vec::with_capacity(patch_files.len() + 1);
        if text != artifact.content {
            files.push(FileAddition::new(artifact.package_file.clone(), text));
        }
        files.extend(patch_files);

        if files.is_empty() {
            tracing::info!(package_file = %artifact.package_file, "no changes");
            UpdateOutcome::Unchanged
        } else {
            tracing::info!(
                package_file = %artifact.package_file,
                files = files.len(),
                "updated artifacts"
            );
            UpdateOutcome::Changed(files)
        }
    }

    async fn upgrade_rule(
        &self,
        text: &str,
        request: &UpgradeRequest,
    ) -> Result<RuleEdit, SkipReason> {
        if let Some(kind) = request.dep_type.as_deref() {
            if !self.config.supports(kind) {
                return Err(SkipReason::UnsupportedKind {
                    kind: kind.to_string(),
                });
            }
        }

        let document = ManifestDocument::parse(text);
        let rule = document
            .rule(request.index)
            .ok_or(SkipReason::RuleNotFound {
                index: request.index,
            })?;

        let urls = rule.url_fragments();
        if urls.is_empty() {
            return Err(SkipReason::NoDownloadUrls {
                rule: display_name(rule).to_string(),
            });
        }

        let patch_refs: Vec<String> = match &request.patches {
            Some(refs) => refs.clone(),
            None => rule
                .string_list("patches")
                .into_iter()
                .map(|f| f.value().to_string())
                .collect(),
        };
        let patch_files = self.migrate_patches(&patch_refs, request).await?;
        if !patch_refs.is_empty() {
            if let Some(strip) = rule.string("patch_strip") {
                tracing::debug!(
                    rule = display_name(rule),
                    patch_strip = strip.value(),
                    "keeping patch_strip"
                );
            }
        }

        let transform = ValueTransform::new(request);
        let new_urls: Vec<String> = urls.iter().map(|f| transform.apply(f.value())).collect();
        let digest = self.resolver.resolve(&new_urls).await?;

        let apply = |value: &str| transform.apply(value);
        let text = replace_many(text, &urls, apply)?;
        let rule_path = FragmentPath::rule(request.index);
        let text = replace_one(
            &text,
            &rule_path.clone().field("strip_prefix"),
            Replacement::With(&apply),
        )?;
        let hex = digest.to_hex();
        let text = replace_one(&text, &rule_path.field("sha256"), Replacement::Value(&hex))?;

        tracing::debug!(
            index = request.index,
            rule = display_name(rule),
            sha256 = %hex,
            patches = patch_files.len(),
            "upgraded rule"
        );
        Ok(RuleEdit { text, patch_files })
    }

    /// Validate a rule's patches and migrate the versions inside them
    ///
    /// Invalid patches are dropped with a warning as long as one is valid.
    async fn migrate_patches(
        &self,
        refs: &[String],
        request: &UpgradeRequest,
    ) -> Result<Vec<FileAddition>, SkipReason> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let files = self.files.as_ref();
        let loaded = join_all(refs.iter().map(|r| self.patch_rules.load_valid(files, r))).await;

        let valid = loaded.iter().filter(|c| c.is_some()).count();
        if valid == 0 {
            return Err(SkipReason::AllPatchesInvalid { count: refs.len() });
        }
        for (reference, _) in refs.iter().zip(&loaded).filter(|(_, c)| c.is_none()) {
            tracing::warn!(reference = %reference, "ignoring invalid patch file");
        }
        tracing::debug!(valid, total = refs.len(), "validated patch files");

        let (old, new) = (request.current_value.as_deref(), request.new_value.as_deref());
        Ok(refs
            .iter()
            .zip(loaded)
            .filter_map(|(reference, content)| {
                let updated = self.patch_rules.migrate(&content?, old, new)?;
                Some(FileAddition::new(normalize_patch_path(reference), updated))
            })
            .collect())
    }
}

impl std::fmt::Debug for Upgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upgrader")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// `name` argument, falling back to the rule name
fn display_name(rule: &RuleInvocation) -> &str {
    rule.string("name").map_or(rule.rule(), |n| n.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};
    use pinup_resolve::{ByteStream, FetchError, MemoryCache, Sha256Digest};
    use std::collections::HashMap;

    struct MapFetcher(HashMap<String, &'static [u8]>);

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
            match self.0.get(url) {
                Some(body) => {
                    let chunk: Result<Bytes, FetchError> = Ok(Bytes::from_static(*body));
                    Ok(stream::iter([chunk]).boxed())
                }
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    struct NoFiles;

    #[async_trait]
    impl LocalFiles for NoFiles {
        async fn read(&self, _path: &str) -> Option<Vec<u8>> {
            None
        }
    }

    fn upgrader(served: &[(&str, &'static [u8])]) -> Upgrader {
        let fetcher = MapFetcher(served.iter().map(|(u, b)| ((*u).to_string(), *b)).collect());
        Upgrader::new(
            UpgraderConfig::default(),
            Arc::new(NoFiles),
            Arc::new(fetcher),
            Arc::new(MemoryCache::default()),
        )
        .unwrap()
    }

    const MANIFEST: &str = r#"http_archive(
    name = "foo",
    sha256 = "old",
    strip_prefix = "foo-1.0",
    urls = ["https://example.com/foo-1.0.tgz"],
)
"#;

    #[tokio::test]
    async fn rewrites_urls_strip_prefix_and_digest() {
        let upgrader = upgrader(&[("https://example.com/foo-2.0.tgz", &b"archive"[..])]);
        let artifact = UpdateArtifact::new(
            "WORKSPACE",
            vec![UpgradeRequest::new(0).with_dep_type("http_archive").with_values("1.0", "2.0")],
            MANIFEST,
        );

        let files = upgrader.update_artifacts(&artifact).await.into_files();
        assert_eq!(files.len(), 1);
        let expected = MANIFEST
            .replace("1.0", "2.0")
            .replace("\"old\"", &format!("\"{}\"", Sha256Digest::compute(b"archive")));
        assert_eq!(files[0].contents, expected);
    }

    #[tokio::test]
    async fn unsupported_kind_and_missing_rule_are_skipped() {
        let upgrader = upgrader(&[("https://example.com/foo-2.0.tgz", &b"archive"[..])]);
        let artifact = UpdateArtifact::new(
            "WORKSPACE",
            vec![
                UpgradeRequest::new(0).with_dep_type("git_repository").with_values("1.0", "2.0"),
                UpgradeRequest::new(7).with_values("1.0", "2.0"),
            ],
            MANIFEST,
        );
        assert_eq!(upgrader.update_artifacts(&artifact).await, UpdateOutcome::Unchanged);
    }

    #[tokio::test]
    async fn all_invalid_patches_skip_the_rule() {
        let upgrader = upgrader(&[("https://example.com/foo-2.0.tgz", &b"archive"[..])]);
        let request = UpgradeRequest::new(0)
            .with_values("1.0", "2.0")
            .with_patches(["//:missing.patch"]);
        let artifact = UpdateArtifact::new("WORKSPACE", vec![request], MANIFEST);
        assert_eq!(upgrader.update_artifacts(&artifact).await, UpdateOutcome::Unchanged);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Upgrader::new(
            UpgraderConfig::default().with_fetch_concurrency(0),
            Arc::new(NoFiles),
            Arc::new(MapFetcher(HashMap::new())),
            Arc::new(MemoryCache::default()),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
