//! Error types for manifest parsing
//!
//! Parse errors never escape [`ManifestDocument::parse`](crate::ManifestDocument::parse):
//! they end the rule list at the offending offset and are kept on the document for
//! diagnostics.

/// Errors raised while tokenizing or parsing manifest text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// String literal without a closing delimiter
    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },

    /// Input ended inside a construct
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },

    /// Closing bracket does not match the innermost open bracket
    #[error("mismatched bracket at byte {offset}: expected '{expected}', found '{found}'")]
    MismatchedBracket {
        expected: char,
        found: char,
        offset: usize,
    },

    /// Token that cannot appear at this position
    #[error("unexpected {found} at byte {offset}")]
    UnexpectedToken { found: String, offset: usize },
}

impl ParseError {
    /// Byte offset where the problem was detected
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::UnterminatedString { offset }
            | Self::UnexpectedEof { offset }
            | Self::MismatchedBracket { offset, .. }
            | Self::UnexpectedToken { offset, .. } => *offset,
        }
    }

    /// Create unexpected token error
    pub fn unexpected(found: impl Into<String>, offset: usize) -> Self {
        Self::UnexpectedToken {
            found: found.into(),
            offset,
        }
    }
}
