//! pinup core - upgrades pinned archive rules in build manifests
//!
//! Given a manifest and a list of upgrade requests, the [`Upgrader`]:
//! - Locates each target rule by its index among the top-level calls
//! - Validates the rule's patch files and migrates versions embedded in them
//! - Resolves the new archive digest from every mirror URL
//! - Rewrites `urls`, `strip_prefix` and `sha256` without touching other bytes
//!
//! # Example
//!
//! ```rust,ignore
//! use pinup_core::{FsLocalFiles, UpdateArtifact, Upgrader, UpgraderConfig, UpgradeRequest};
//! use pinup_resolve::{HttpFetcher, MemoryCache};
//! use std::sync::Arc;
//!
//! # async fn example(manifest: String) -> Result<(), Box<dyn std::error::Error>> {
//! let config = UpgraderConfig::new();
//! let upgrader = Upgrader::new(
//!     config.clone(),
//!     Arc::new(FsLocalFiles::new(".")),
//!     Arc::new(HttpFetcher::new(config.http_timeout())?),
//!     Arc::new(MemoryCache::default()),
//! )?;
//!
//! let request = UpgradeRequest::new(1).with_dep_type("http_archive").with_values("1.0", "1.1");
//! let outcome = upgrader
//!     .update_artifacts(&UpdateArtifact::new("WORKSPACE", vec![request], manifest))
//!     .await;
//! println!("{} file(s) changed", outcome.files().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod patch_file;
pub mod transform;
pub mod types;
pub mod upgrader;

pub use config::UpgraderConfig;
pub use error::{ConfigError, FileError, SkipReason};
pub use files::{FsLocalFiles, LocalFiles};
pub use patch_file::{normalize_patch_path, PatchRules};
pub use transform::{migrate_url, replace_values, ValueTransform};
pub use types::{FileAddition, UpdateArtifact, UpdateOutcome, UpgradeRequest};
pub use upgrader::Upgrader;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
