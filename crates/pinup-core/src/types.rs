//! Request and result types for an upgrade pass

use serde::{Deserialize, Serialize};

/// One dependency upgrade to apply to a manifest
///
/// `index` is the position of the target rule among all top-level calls of the
/// manifest as it was before any request ran.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeRequest {
    /// Target rule index
    pub index: usize,
    /// Rule kind, e.g. `http_archive`
    pub dep_type: Option<String>,
    /// Version currently pinned
    pub current_value: Option<String>,
    /// Version to move to
    pub new_value: Option<String>,
    /// Commit digest currently pinned
    pub current_digest: Option<String>,
    /// Commit digest to move to
    pub new_digest: Option<String>,
    /// Patch references to use instead of the rule's own `patches` list
    pub patches: Option<Vec<String>>,
}

impl UpgradeRequest {
    /// Create request for the rule at `index`
    #[inline]
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// With rule kind
    #[inline]
    #[must_use]
    pub fn with_dep_type(mut self, dep_type: impl Into<String>) -> Self {
        self.dep_type = Some(dep_type.into());
        self
    }

    /// With current and new version
    #[inline]
    #[must_use]
    pub fn with_values(mut self, current: impl Into<String>, new: impl Into<String>) -> Self {
        self.current_value = Some(current.into());
        self.new_value = Some(new.into());
        self
    }

    /// With current and new commit digest
    #[inline]
    #[must_use]
    pub fn with_digests(mut self, current: impl Into<String>, new: impl Into<String>) -> Self {
        self.current_digest = Some(current.into());
        self.new_digest = Some(new.into());
        self
    }

    /// With explicit patch references
    #[inline]
    #[must_use]
    pub fn with_patches<I, S>(mut self, patches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patches = Some(patches.into_iter().map(Into::into).collect());
        self
    }
}

/// Full new content for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAddition {
    /// Path relative to the repository root
    pub path: String,
    /// New content
    pub contents: String,
}

impl FileAddition {
    /// Create file addition
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Input to [`Upgrader::update_artifacts`](crate::Upgrader::update_artifacts)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateArtifact {
    /// Manifest path relative to the repository root
    pub package_file: String,
    /// Upgrades in the order they should be applied
    pub requests: Vec<UpgradeRequest>,
    /// Current manifest text
    pub content: String,
}

impl UpdateArtifact {
    /// Create update input
    #[inline]
    #[must_use]
    pub fn new(
        package_file: impl Into<String>,
        requests: Vec<UpgradeRequest>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            package_file: package_file.into(),
            requests,
            content: content.into(),
        }
    }
}

/// Result of an upgrade pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "files", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Nothing changed
    Unchanged,
    /// Changed files, manifest first
    Changed(Vec<FileAddition>),
}

impl UpdateOutcome {
    /// Check if any file changed
    #[inline]
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    /// Changed files; empty when unchanged
    #[inline]
    #[must_use]
    pub fn files(&self) -> &[FileAddition] {
        match self {
            Self::Unchanged => &[],
            Self::Changed(files) => files,
        }
    }

    /// Consume into the changed files
    #[inline]
    #[must_use]
    pub fn into_files(self) -> Vec<FileAddition> {
        match self {
            Self::Unchanged => Vec::new(),
            Self::Changed(files) => files,
        }
    }
}
