//! Fragment tree primitives
//!
//! Every parsed value carries the byte [`Span`] it was read from, so callers can
//! rewrite a single value without touching the bytes around it.

use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter};

/// Half-open byte range `[start, end)` into the original manifest text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    /// First byte covered by the span
    pub start: usize,
    /// One past the last byte covered by the span
    pub end: usize,
}

impl Span {
    /// Create a new span
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span covers no bytes
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check if two spans share at least one byte
    ///
    /// Empty spans sitting at the same offset also count as overlapping, since
    /// two insertions at one position cannot be ordered.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        if self.start == other.start {
            return true;
        }
        self.start < other.end && other.start < self.end
    }

    /// Check if `other` lies entirely inside this span
    #[inline]
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Slice `text` by this span, if the span is in bounds and on char boundaries
    #[inline]
    #[must_use]
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A string literal
///
/// `value` is the raw text between the delimiters, escape sequences included,
/// and `span` covers exactly that text. Writing a new value into `span` keeps the
/// original quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringFragment {
    value: String,
    span: Span,
}

impl StringFragment {
    /// Create a string fragment
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Self {
            value: value.into(),
            span,
        }
    }

    /// Raw literal content
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Span of the literal content
    #[inline]
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }
}

/// A list literal `[...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayFragment {
    children: Vec<Fragment>,
    span: Span,
}

impl ArrayFragment {
    /// Create an array fragment
    #[inline]
    #[must_use]
    pub fn new(children: Vec<Fragment>, span: Span) -> Self {
        Self { children, span }
    }

    /// Elements in source order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Fragment] {
        &self.children
    }

    /// Span from the opening to the closing bracket
    #[inline]
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Element at `index`
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Fragment> {
        self.children.get(index)
    }

    /// String elements only, in source order
    pub fn strings(&self) -> impl Iterator<Item = &StringFragment> {
        self.children.iter().filter_map(Fragment::as_string)
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if the list has no indexed elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Named children: the keyword arguments of a call, or a dict literal
///
/// Keys are unique; insertion order is source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFragment {
    children: IndexMap<String, Fragment>,
    span: Span,
}

impl RecordFragment {
    /// Create a record fragment
    #[inline]
    #[must_use]
    pub fn new(children: IndexMap<String, Fragment>, span: Span) -> Self {
        Self { children, span }
    }

    /// Child by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Fragment> {
        self.children.get(key)
    }

    /// String child by key; `None` if absent or not a string
    #[inline]
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&StringFragment> {
        self.get(key).and_then(Fragment::as_string)
    }

    /// Array child by key; `None` if absent or not an array
    #[inline]
    #[must_use]
    pub fn array(&self, key: &str) -> Option<&ArrayFragment> {
        self.get(key).and_then(Fragment::as_array)
    }

    /// Iterate children in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fragment)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in source order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Span of the whole construct
    #[inline]
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Number of indexed children
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if no children were indexed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Closed set of parsed value shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// String literal
    String(StringFragment),
    /// List literal
    Array(ArrayFragment),
    /// Keyword arguments or dict literal
    Record(RecordFragment),
}

impl Fragment {
    /// Span of the fragment
    #[inline]
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::String(s) => s.span(),
            Self::Array(a) => a.span(),
            Self::Record(r) => r.span(),
        }
    }

    /// Borrow as a string fragment
    #[inline]
    #[must_use]
    pub fn as_string(&self) -> Option<&StringFragment> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as an array fragment
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayFragment> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow as a record fragment
    #[inline]
    #[must_use]
    pub fn as_record(&self) -> Option<&RecordFragment> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Borrowed view of this fragment
    #[inline]
    #[must_use]
    pub fn view(&self) -> FragmentRef<'_> {
        match self {
            Self::String(s) => FragmentRef::String(s),
            Self::Array(a) => FragmentRef::Array(a),
            Self::Record(r) => FragmentRef::Record(r),
        }
    }

    /// Short name of the variant, for diagnostics
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.view().kind()
    }
}

/// Borrowed fragment, returned by path lookups
///
/// Rule records are owned by their [`RuleInvocation`](crate::RuleInvocation), not
/// by a [`Fragment`], so lookups hand out this view instead of `&Fragment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRef<'a> {
    /// String literal
    String(&'a StringFragment),
    /// List literal
    Array(&'a ArrayFragment),
    /// Keyword arguments or dict literal
    Record(&'a RecordFragment),
}

impl<'a> FragmentRef<'a> {
    /// Span of the fragment
    #[inline]
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::String(s) => s.span(),
            Self::Array(a) => a.span(),
            Self::Record(r) => r.span(),
        }
    }

    /// String fragment, if this is one
    #[inline]
    #[must_use]
    pub fn as_string(self) -> Option<&'a StringFragment> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Array fragment, if this is one
    #[inline]
    #[must_use]
    pub fn as_array(self) -> Option<&'a ArrayFragment> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Record fragment, if this is one
    #[inline]
    #[must_use]
    pub fn as_record(self) -> Option<&'a RecordFragment> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
        }
    }
}

/// Rebuild the bytes covered by `fragment` from the gaps between its children
/// and the children themselves.
pub(crate) fn render_into(text: &str, fragment: FragmentRef<'_>, out: &mut String) {
    let span = fragment.span();
    let mut cursor = span.start;

    match fragment {
        FragmentRef::String(s) => {
            out.push_str(s.value());
            return;
        }
        FragmentRef::Array(a) => {
            for child in a.children() {
                render_child(text, child.view(), &mut cursor, out);
            }
        }
        FragmentRef::Record(r) => {
            for (_, child) in r.iter() {
                render_child(text, child.view(), &mut cursor, out);
            }
        }
    }

    if let Some(tail) = text.get(cursor..span.end) {
        out.push_str(tail);
    }
}

fn render_child(text: &str, child: FragmentRef<'_>, cursor: &mut usize, out: &mut String) {
    let child_span = child.span();
    if let Some(gap) = text.get(*cursor..child_span.start) {
        out.push_str(gap);
    }
    render_into(text, child, out);
    *cursor = child_span.end;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_len_and_empty() {
        let span = Span::new(3, 7);
        assert_eq!(span.len(), 4);
        assert!(!span.is_empty());
        assert!(Span::new(5, 5).is_empty());
    }

    #[test]
    fn span_overlap_rules() {
        let a = Span::new(0, 5);
        assert!(a.overlaps(&Span::new(4, 8)));
        assert!(!a.overlaps(&Span::new(5, 8)));
        assert!(Span::new(3, 3).overlaps(&Span::new(3, 6)));
        assert!(a.contains(&Span::new(1, 4)));
        assert!(!a.contains(&Span::new(1, 6)));
    }

    #[test]
    fn span_slice_out_of_bounds() {
        assert_eq!(Span::new(1, 3).slice("abcd"), Some("bc"));
        assert_eq!(Span::new(2, 9).slice("abcd"), None);
    }

    #[test]
    fn record_typed_accessors() {
        let mut children = IndexMap::new();
        children.insert(
            "sha256".to_string(),
            Fragment::String(StringFragment::new("abc", Span::new(10, 13))),
        );
        children.insert(
            "urls".to_string(),
            Fragment::Array(ArrayFragment::new(Vec::new(), Span::new(20, 22))),
        );
        let record = RecordFragment::new(children, Span::new(0, 30));

        assert_eq!(record.string("sha256").map(StringFragment::value), Some("abc"));
        assert!(record.string("urls").is_none());
        assert!(record.array("urls").is_some_and(ArrayFragment::is_empty));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["sha256", "urls"]);
    }

    #[test]
    fn fragment_kind_names() {
        let s = Fragment::String(StringFragment::new("x", Span::new(0, 1)));
        assert_eq!(s.kind(), "string");
        assert_eq!(s.view().kind(), "string");
        assert!(s.as_array().is_none());
    }
}
