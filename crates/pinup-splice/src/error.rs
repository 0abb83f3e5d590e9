//! Splice errors

use pinup_fragment::Span;

/// Errors that indicate a caller passed inconsistent edits
///
/// These never come from manifest content; they mean the fragments did not
/// come from the text being edited, or two of them cover the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpliceError {
    /// Two edits touch the same bytes
    #[error("overlapping edits at {first} and {second}")]
    OverlappingSpans { first: Span, second: Span },

    /// Edit falls outside the text or splits a character
    #[error("span {span} is outside text of length {len}")]
    SpanOutOfBounds { span: Span, len: usize },
}

impl SpliceError {
    /// Create overlap error, ordering the spans by start
    pub fn overlapping(a: Span, b: Span) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self::OverlappingSpans { first, second }
    }
}
