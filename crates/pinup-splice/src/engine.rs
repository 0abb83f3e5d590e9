//! Span splicing
//!
//! All replacements for one pass are computed from the original fragment values,
//! checked for disjointness, then written back to front so that no splice shifts
//! an offset that is still pending.

use pinup_fragment::{FragmentPath, FragmentRef, ManifestDocument, Span, StringFragment};

use crate::error::SpliceError;

/// New content for a single located value
#[derive(Clone, Copy)]
pub enum Replacement<'a> {
    /// Write this value
    Value(&'a str),
    /// Compute the value from the current one
    With(&'a dyn Fn(&str) -> String),
}

impl Replacement<'_> {
    fn apply(&self, old: &str) -> String {
        match self {
            Self::Value(v) => (*v).to_string(),
            Self::With(f) => f(old),
        }
    }
}

impl std::fmt::Debug for Replacement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}

impl<'a> From<&'a str> for Replacement<'a> {
    fn from(value: &'a str) -> Self {
        Self::Value(value)
    }
}

/// A pending replacement of the bytes in `span`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Bytes to replace
    pub span: Span,
    /// Replacement text
    pub text: String,
}

/// Rewrite every fragment in one pass
///
/// `transform` sees each fragment's original value. Fragments must come from
/// `text` and must not overlap.
///
/// # Errors
/// Returns [`SpliceError`] if two fragments overlap or a span is out of bounds.
pub fn replace_many<F>(
    text: &str,
    fragments: &[&StringFragment],
    mut transform: F,
) -> Result<String, SpliceError>
where
    F: FnMut(&str) -> String,
{
    let splices = fragments
        .iter()
        .map(|f| Splice {
            span: f.span(),
            text: transform(f.value()),
        })
        .collect();
    apply_splices(text, splices)
}

/// Rewrite the string fragment at `path`
///
/// Returns the text unchanged when `path` is absent or not a string; this never
/// creates a field.
///
/// # Errors
/// Returns [`SpliceError`] only if the located span is inconsistent with `text`.
pub fn replace_one(
    text: &str,
    path: &FragmentPath,
    replacement: Replacement<'_>,
) -> Result<String, SpliceError> {
    let document = ManifestDocument::parse(text);
    match document.locate(path) {
        Some(FragmentRef::String(fragment)) => {
            replace_many(text, &[fragment], |old| replacement.apply(old))
        }
        Some(other) => {
            tracing::debug!(%path, kind = other.kind(), "not a string, leaving unchanged");
            Ok(text.to_string())
        }
        None => {
            tracing::debug!(%path, "field absent, leaving unchanged");
            Ok(text.to_string())
        }
    }
}

/// Apply raw splices to `text`
///
/// # Errors
/// Returns [`SpliceError`] if two splices overlap or a span is out of bounds.
pub fn apply_splices(text: &str, mut splices: Vec<Splice>) -> Result<String, SpliceError> {
    splices.sort_by_key(|s| s.span);
    validate_disjoint(text, &splices)?;

    let mut out = text.to_string();
    for splice in splices.iter().rev() {
        out.replace_range(splice.span.start..splice.span.end, &splice.text);
    }
    Ok(out)
}

/// Check that sorted splices are in bounds and pairwise disjoint
fn validate_disjoint(text: &str, sorted: &[Splice]) -> Result<(), SpliceError> {
    for splice in sorted {
        if splice.span.start > splice.span.end || splice.span.slice(text).is_none() {
            return Err(SpliceError::SpanOutOfBounds {
                span: splice.span,
                len: text.len(),
            });
        }
    }
    for pair in sorted.windows(2) {
        if pair[0].span.overlaps(&pair[1].span) {
            return Err(SpliceError::overlapping(pair[0].span, pair[1].span));
        }
    }
    Ok(())
}
