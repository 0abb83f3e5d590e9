//! Patch-file validation and embedded version migration
//!
//! Rules may carry `patches = ["//:third_party/foo.patch"]`. Before a rule is
//! upgraded its patches are checked to look like unified diffs, and version
//! assignments on added lines (`+    package_version = "1.2.3"`) are moved to the
//! new version.

use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::files::LocalFiles;

/// Strip the Bazel root marker from a patch reference
///
/// `//:a/b.patch` and `//a/b.patch` both become `a/b.patch`; anything else is
/// returned as is.
#[must_use]
pub fn normalize_patch_path(reference: &str) -> &str {
    reference
        .strip_prefix("//:")
        .or_else(|| reference.strip_prefix("//"))
        .unwrap_or(reference)
}

/// Compiled patch checks
#[derive(Debug, Clone)]
pub struct PatchRules {
    hunk_header: Regex,
    /// `None` when no version fields are configured
    version_assignment: Option<Regex>,
}

impl PatchRules {
    /// Compile rules recognizing assignments to any of `version_fields`
    ///
    /// # Errors
    /// Returns [`ConfigError::Pattern`] if the patterns fail to compile.
    pub fn new<S: AsRef<str>>(version_fields: &[S]) -> Result<Self, ConfigError> {
        let hunk_header = Regex::new(r"(?m)^@@.+@@")?;

        let version_assignment = if version_fields.is_empty() {
            None
        } else {
            let fields = version_fields
                .iter()
                .map(|f| regex::escape(f.as_ref()))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(
                r#"(?m)^(?P<prefix>[ \t]*\+.*\b(?:{fields})[ \t]*=[ \t]*)(?:"(?P<dq>[^"\r\n]*)"|'(?P<sq>[^'\r\n]*)')"#
            ))?)
        };

        Ok(Self {
            hunk_header,
            version_assignment,
        })
    }

    /// Check that `content` has a hunk header and at least one changed line
    ///
    /// Only lines inside a hunk count. A `--- ` line directly followed by a
    /// `+++ ` line is a file header and closes the current hunk.
    #[must_use]
    pub fn looks_like_patch(&self, content: &str) -> bool {
        if !self.hunk_header.is_match(content) {
            return false;
        }
        let mut in_hunk = false;
        let mut lines = content.lines().peekable();
        while let Some(line) = lines.next() {
            if line.starts_with("--- ")
                && lines.peek().is_some_and(|next| next.starts_with("+++ "))
            {
                lines.next();
                in_hunk = false;
            } else if line.starts_with("@@") {
                in_hunk = true;
            } else if line.starts_with("diff ") {
                in_hunk = false;
            } else if in_hunk && (line.starts_with('+') || line.starts_with('-')) {
                return true;
            }
        }
        false
    }

    /// Read a patch reference and return its content if it is a valid patch
    ///
    /// Missing, unreadable or non-UTF-8 files count as invalid.
    pub async fn load_valid(&self, files: &dyn LocalFiles, reference: &str) -> Option<String> {
        let path = normalize_patch_path(reference);
        let Some(bytes) = files.read(path).await else {
            tracing::debug!(reference, "patch file not found");
            return None;
        };
        let Ok(content) = String::from_utf8(bytes) else {
            tracing::debug!(reference, "patch file is not UTF-8");
            return None;
        };
        if !self.looks_like_patch(&content) {
            tracing::debug!(reference, "file does not look like a patch");
            return None;
        }
        Some(content)
    }

    /// Check whether a patch reference points at a valid patch
    pub async fn validate(&self, files: &dyn LocalFiles, reference: &str) -> bool {
        self.load_valid(files, reference).await.is_some()
    }

    /// Rewrite version assignments on added lines from `old` to `new`
    ///
    /// Only assignments whose quoted value equals `old` exactly are touched.
    /// Returns `None` if nothing changed, either version is missing, or they are
    /// equal.
    #[must_use]
    pub fn migrate(&self, content: &str, old: Option<&str>, new: Option<&str>) -> Option<String> {
        let (old, new) = (old?, new?);
        if old == new {
            return None;
        }
        let assignment = self.version_assignment.as_ref()?;

        let mut changed = false;
        let updated = assignment
            .replace_all(content, |caps: &Captures<'_>| {
                let (quote, value) = match (caps.name("dq"), caps.name("sq")) {
                    (Some(v), _) => ('"', v.as_str()),
                    (None, Some(v)) => ('\'', v.as_str()),
                    (None, None) => return caps[0].to_string(),
                };
                if value != old {
                    return caps[0].to_string();
                }
                changed = true;
                format!("{}{quote}{new}{quote}", &caps["prefix"])
            });

        changed.then(|| updated.into_owned())
    }
}
