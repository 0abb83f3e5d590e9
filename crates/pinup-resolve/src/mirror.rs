//! Corrections for mirrors that publish under inconsistent names

/// Literal substring rewrites, applied in order, first occurrence only
pub const URL_MASSAGES: &[(&str, &str)] = &[
    ("bazel-skylib.", "bazel_skylib-"),
    (
        "/bazel-gazelle/releases/download/0",
        "/bazel-gazelle/releases/download/v0",
    ),
    ("/bazel-gazelle-0", "/bazel-gazelle-v0"),
    ("/rules_go/releases/download/0", "/rules_go/releases/download/v0"),
    ("/rules_go-0", "/rules_go-v0"),
];

/// Rewrite `url` through [`URL_MASSAGES`]
#[must_use]
pub fn massage_url(url: &str) -> String {
    URL_MASSAGES
        .iter()
        .fold(url.to_string(), |acc, (from, to)| acc.replacen(from, to, 1))
}
