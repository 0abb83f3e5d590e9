//! Version and digest substitution inside download URLs
//!
//! A [`ValueTransform`] turns an old URL (or `strip_prefix`) into the new one for
//! a single [`UpgradeRequest`]: version substitution, then commit digest
//! substitution, then any known URL shape migration.

use crate::types::UpgradeRequest;

/// Archive name that gained a version suffix after the 0.3 series
const WEBTESTING_ARCHIVE: &str = "/rules_webtesting.tar.gz";

/// Replace every occurrence of `from` with `to`, ignoring a leading `v` on both
///
/// Returns `content` unchanged if either side is missing or both are equal.
#[must_use]
pub fn replace_values(content: &str, from: Option<&str>, to: Option<&str>) -> String {
    match (from.map(strip_v), to.map(strip_v)) {
        (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() && from != to => {
            content.replace(from, to)
        }
        _ => content.to_string(),
    }
}

/// Apply URL layout changes that a plain version substitution cannot express
///
/// `rules_webtesting` switched from `rules_webtesting.tar.gz` to
/// `rules_webtesting-<version>.tar.gz` starting with 0.4.
#[must_use]
pub fn migrate_url(url: &str, new_value: Option<&str>) -> String {
    let Some(version) = new_value.map(strip_v).filter(|v| !v.is_empty()) else {
        return url.to_string();
    };
    if url.ends_with(WEBTESTING_ARCHIVE) && !is_legacy_webtesting(version) {
        if let Some(stem) = url.strip_suffix(".tar.gz") {
            return format!("{stem}-{version}.tar.gz");
        }
    }
    url.to_string()
}

fn strip_v(value: &str) -> &str {
    value.strip_prefix('v').unwrap_or(value)
}

/// `0.0.` through `0.3.`
fn is_legacy_webtesting(version: &str) -> bool {
    matches!(version.as_bytes(), [b'0', b'.', b'0'..=b'3', b'.', ..])
}

/// Old-to-new rewrite for the values of one rule
#[derive(Debug, Clone, Copy)]
pub struct ValueTransform<'a> {
    request: &'a UpgradeRequest,
}

impl<'a> ValueTransform<'a> {
    /// Create transform for `request`
    #[inline]
    #[must_use]
    pub fn new(request: &'a UpgradeRequest) -> Self {
        Self { request }
    }

    /// Rewrite one value
    #[must_use]
    pub fn apply(&self, value: &str) -> String {
        let req = self.request;
        let value = replace_values(value, req.current_value.as_deref(), req.new_value.as_deref());
        let value = replace_values(&value, req.current_digest.as_deref(), req.new_digest.as_deref());
        migrate_url(&value, req.new_value.as_deref())
    }

    /// Rewrite several values, keeping order
    #[must_use]
    pub fn apply_all<S: AsRef<str>>(&self, values: &[S]) -> Vec<String> {
        values.iter().map(|v| self.apply(v.as_ref())).collect()
    }
}
