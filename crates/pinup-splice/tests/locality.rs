//! Splicing against parsed manifests

use pinup_fragment::{FragmentPath, ManifestDocument, StringFragment};
use pinup_splice::{replace_many, replace_one, Replacement};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const MANIFEST: &str = r#"# keep this comment
http_archive(
    name = "rules_foo",   # and this one
    sha256 = "0000",
    strip_prefix = "rules_foo-1.2.3",
    url = "https://a.example/rules_foo-1.2.3.tar.gz",
    urls = [
        'https://b.example/1.2.3/rules_foo-1.2.3.tar.gz',
        "https://c.example/rules_foo-1.2.3.tar.gz",  # mirror
    ],
)
"#;

#[test]
fn rewrites_all_urls_in_one_pass() {
    let doc = ManifestDocument::parse(MANIFEST);
    let rule = doc.rule(0).unwrap();
    let urls = rule.url_fragments();
    let out = replace_many(doc.text(), &urls, |v| v.replace("1.2.3", "1.3.0")).unwrap();

    let expected = MANIFEST
        .replace("a.example/rules_foo-1.2.3", "a.example/rules_foo-1.3.0")
        .replace("b.example/1.2.3/rules_foo-1.2.3", "b.example/1.3.0/rules_foo-1.3.0")
        .replace("c.example/rules_foo-1.2.3", "c.example/rules_foo-1.3.0");
    assert_eq!(out, expected);
}

#[test]
fn successive_single_edits_reparse() {
    let bump = |v: &str| v.replace("1.2.3", "1.3.0");
    let out = replace_one(
        MANIFEST,
        &FragmentPath::rule(0).field("strip_prefix"),
        Replacement::With(&bump),
    )
    .unwrap();
    let out = replace_one(
        &out,
        &FragmentPath::rule(0).field("sha256"),
        Replacement::Value("ffff"),
    )
    .unwrap();

    assert!(out.contains("strip_prefix = \"rules_foo-1.3.0\""));
    assert!(out.contains("sha256 = \"ffff\""));
    assert!(out.contains("# and this one"));
    assert!(out.contains("'https://b.example/1.2.3/rules_foo-1.2.3.tar.gz'"));
}

proptest! {
    #[test]
    fn bytes_outside_spans_are_untouched(replacement in "[a-z0-9.]{0,20}") {
        let doc = ManifestDocument::parse(MANIFEST);
        let rule = doc.rule(0).unwrap();
        let targets: Vec<&StringFragment> = rule.url_fragments();
        let out = replace_many(doc.text(), &targets, |_| replacement.clone()).unwrap();

        let first = targets[0].span();
        let last = targets[targets.len() - 1].span();
        prop_assert_eq!(&out[..first.start], &MANIFEST[..first.start]);
        let tail = &MANIFEST[last.end..];
        prop_assert!(out.ends_with(tail));

        let reparsed = ManifestDocument::parse(out.as_str());
        let values: Vec<_> = reparsed
            .rule(0)
            .unwrap()
            .url_fragments()
            .into_iter()
            .map(|f| f.value().to_string())
            .collect();
        prop_assert_eq!(values, vec![replacement.clone(); 3]);
    }
}
