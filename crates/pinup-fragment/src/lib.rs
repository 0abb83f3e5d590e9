//! Span-addressed fragment tree for call-expression build manifests
//!
//! Parses Bazel-style manifests (`WORKSPACE`, `*.bzl`) into an ordered list of
//! top-level [`RuleInvocation`]s. Each literal keyword argument is kept as a
//! [`Fragment`] carrying the exact byte [`Span`] it came from, so a caller can
//! rewrite one value and leave every other byte in place.
//!
//! # Example
//!
//! ```
//! use pinup_fragment::{FragmentPath, FragmentRef, ManifestDocument};
//!
//! let doc = ManifestDocument::parse(r#"http_archive(name = "x", urls = ["https://a/x.tgz"])"#);
//! let url = doc
//!     .locate(&FragmentPath::rule(0).field("urls").index(0))
//!     .and_then(FragmentRef::as_string)
//!     .map(|s| s.value());
//! assert_eq!(url, Some("https://a/x.tgz"));
//! ```

pub mod document;
pub mod error;
pub mod fragment;
pub mod path;
pub mod rule;

mod lexer;
mod parser;

pub use document::{locate, parse, ManifestDocument};
pub use error::ParseError;
pub use fragment::{ArrayFragment, Fragment, FragmentRef, RecordFragment, Span, StringFragment};
pub use path::{FragmentPath, PathError, PathSegment};
pub use rule::RuleInvocation;
