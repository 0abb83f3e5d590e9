//! Parsed manifest documents

use crate::error::ParseError;
use crate::fragment::{render_into, FragmentRef};
use crate::parser::Parser;
use crate::path::{FragmentPath, PathSegment};
use crate::rule::RuleInvocation;

/// Manifest text together with its top-level rule invocations
///
/// The document is immutable. After an edit, parse the new text again rather
/// than adjusting spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    text: String,
    rules: Vec<RuleInvocation>,
    error: Option<ParseError>,
}

impl ManifestDocument {
    /// Parse manifest text
    ///
    /// Never fails: a malformed construct ends the rule list and is kept in
    /// [`parse_error`](Self::parse_error).
    #[must_use]
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let (rules, error) = Parser::new(&text).parse_document();
        Self { text, rules, error }
    }

    /// Original text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Top-level invocations in source order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[RuleInvocation] {
        &self.rules
    }

    /// Invocation at `index`
    #[inline]
    #[must_use]
    pub fn rule(&self, index: usize) -> Option<&RuleInvocation> {
        self.rules.get(index)
    }

    /// Error that stopped parsing, if any
    #[inline]
    #[must_use]
    pub fn parse_error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Resolve `path` to a fragment
    ///
    /// A path of only a rule index resolves to the rule's record. Anything that
    /// does not exist, or descends through the wrong fragment kind, is `None`.
    #[must_use]
    pub fn locate(&self, path: &FragmentPath) -> Option<FragmentRef<'_>> {
        let rule = self.rule(path.rule_index()?)?;
        let mut current = FragmentRef::Record(rule.record());

        for segment in path.tail() {
            let next = match (segment, current) {
                (PathSegment::Field(name), FragmentRef::Record(record)) => record.get(name)?,
                (PathSegment::Index(i), FragmentRef::Array(array)) => array.get(*i)?,
                _ => return None,
            };
            current = next.view();
        }
        Some(current)
    }

    /// Rebuild the text from the fragment tree
    ///
    /// Without edits this is byte-identical to [`text`](Self::text).
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for rule in &self.rules {
            let span = rule.span();
            if let Some(gap) = self.text.get(cursor..span.start) {
                out.push_str(gap);
            }
            render_into(&self.text, FragmentRef::Record(rule.record()), &mut out);
            cursor = span.end;
        }
        if let Some(tail) = self.text.get(cursor..) {
            out.push_str(tail);
        }
        out
    }
}

/// Parse `text` into its top-level rule invocations
#[must_use]
pub fn parse(text: &str) -> Vec<RuleInvocation> {
    Parser::new(text).parse_document().0
}

/// Resolve `path` within `document`
#[must_use]
pub fn locate<'a>(document: &'a ManifestDocument, path: &FragmentPath) -> Option<FragmentRef<'a>> {
    document.locate(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::StringFragment;

    const TEXT: &str = r#"http_archive(
    name = "a",
    urls = ["https://x/a-1.0.tar.gz", "https://y/a-1.0.tar.gz"],
    meta = {"k": ["v"]},
)
"#;

    #[test]
    fn locate_string_in_array() {
        let doc = ManifestDocument::parse(TEXT);
        let path = FragmentPath::rule(0).field("urls").index(1);
        let found = doc.locate(&path).and_then(FragmentRef::as_string);
        assert_eq!(found.map(StringFragment::value), Some("https://y/a-1.0.tar.gz"));
    }

    #[test]
    fn locate_through_dict() {
        let doc = ManifestDocument::parse(TEXT);
        let path: FragmentPath = "0.meta.k.0".parse().unwrap();
        let found = locate(&doc, &path).and_then(FragmentRef::as_string);
        assert_eq!(found.map(StringFragment::value), Some("v"));
    }

    #[test]
    fn locate_absent_paths() {
        let doc = ManifestDocument::parse(TEXT);
        assert!(doc.locate(&FragmentPath::rule(1)).is_none());
        assert!(doc.locate(&FragmentPath::rule(0).field("sha256")).is_none());
        assert!(doc.locate(&FragmentPath::rule(0).field("urls").index(5)).is_none());
        assert!(doc.locate(&FragmentPath::rule(0).field("name").index(0)).is_none());
        assert!(doc.locate(&FragmentPath::default()).is_none());
    }

    #[test]
    fn locate_rule_record() {
        let doc = ManifestDocument::parse(TEXT);
        let found = doc.locate(&FragmentPath::rule(0)).and_then(FragmentRef::as_record);
        assert_eq!(found.map(|r| r.len()), Some(3));
    }

    #[test]
    fn render_is_identity() {
        let doc = ManifestDocument::parse(TEXT);
        assert_eq!(doc.render(), TEXT);
    }

    #[test]
    fn free_parse_matches_document() {
        assert_eq!(parse(TEXT), ManifestDocument::parse(TEXT).rules().to_vec());
    }
}
