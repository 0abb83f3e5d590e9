//! Top-level rule invocations

use crate::fragment::{RecordFragment, Span, StringFragment};

/// One top-level call in a manifest, e.g. `http_archive(name = "x", ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInvocation {
    pub(crate) index: usize,
    pub(crate) callee: String,
    pub(crate) rule: String,
    pub(crate) wrapper: Option<String>,
    pub(crate) record: RecordFragment,
}

impl RuleInvocation {
    /// Position among all top-level calls, starting at 0
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Callee exactly as written, e.g. `native.http_archive` or `maybe`
    #[inline]
    #[must_use]
    pub fn callee(&self) -> &str {
        &self.callee
    }

    /// Effective rule name; for `maybe(http_archive, ...)` this is `http_archive`
    #[inline]
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Rule name without a private `_` prefix or module qualifier
    ///
    /// `_http_archive` and `native.http_archive` both report `http_archive`.
    #[must_use]
    pub fn kind(&self) -> &str {
        let base = self.rule.rsplit('.').next().unwrap_or(&self.rule);
        base.strip_prefix('_').unwrap_or(base)
    }

    /// Wrapper call name, if the rule was invoked through one
    #[inline]
    #[must_use]
    pub fn wrapper(&self) -> Option<&str> {
        self.wrapper.as_deref()
    }

    /// Keyword arguments
    #[inline]
    #[must_use]
    pub fn record(&self) -> &RecordFragment {
        &self.record
    }

    /// Span from the first callee character through the closing parenthesis
    #[inline]
    #[must_use]
    pub fn span(&self) -> Span {
        self.record.span()
    }

    /// Source text of the whole invocation
    #[must_use]
    pub fn source<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.span().slice(text)
    }

    /// String-valued keyword argument
    #[inline]
    #[must_use]
    pub fn string(&self, field: &str) -> Option<&StringFragment> {
        self.record.string(field)
    }

    /// String elements of a list-valued keyword argument, empty if absent
    #[must_use]
    pub fn string_list(&self, field: &str) -> Vec<&StringFragment> {
        self.record
            .array(field)
            .map(|a| a.strings().collect())
            .unwrap_or_default()
    }

    /// Download locations: `url` first, then the string elements of `urls`
    #[must_use]
    pub fn url_fragments(&self) -> Vec<&StringFragment> {
        self.string("url")
            .into_iter()
            .chain(self.string_list("urls"))
            .collect()
    }
}
