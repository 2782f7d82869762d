// ABOUTME: Semantic version parsing and ordering for image tags.
// ABOUTME: Tags look like v1.2.3; unparsable tags are dropped from orderings.

use semver::Version;
use std::cmp::Ordering;

/// A tag body that is not valid semantic version text.
#[derive(Debug, thiserror::Error)]
#[error("invalid version {input:?}: {source}")]
pub struct VersionError {
    input: String,
    #[source]
    source: semver::Error,
}

/// Parse a tag body such as `1.9.0-rc.1` (no prefix).
pub fn parse(tag_body: &str) -> Result<Version, VersionError> {
    Version::parse(tag_body).map_err(|source| VersionError {
        input: tag_body.to_string(),
        source,
    })
}

/// Semver precedence: major, minor, patch, then pre-release. Build metadata is ignored.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// Order prefixed tags newest first, silently dropping any that do not parse.
pub fn sort_descending<I, S>(tags: I, prefix: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed: Vec<(Version, String)> = tags
        .into_iter()
        .filter_map(|tag| {
            let tag = tag.as_ref();
            let body = tag.strip_prefix(prefix)?;
            parse(body).ok().map(|v| (v, tag.to_string()))
        })
        .collect();

    parsed.sort_by(|(a, _), (b, _)| compare(b, a));
    parsed.into_iter().map(|(_, tag)| tag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> Version {
        parse(s).unwrap()
    }

    #[test]
    fn release_outranks_its_release_candidates() {
        assert_eq!(compare(&v("2.0.0"), &v("1.9.9")), Ordering::Greater);
        assert_eq!(compare(&v("1.9.9"), &v("1.9.0-rc.1")), Ordering::Greater);
        assert_eq!(compare(&v("1.9.0-rc.1"), &v("1.9.0-rc.0")), Ordering::Greater);
        assert_eq!(compare(&v("1.9.0"), &v("1.9.0-rc.1")), Ordering::Greater);
    }

    #[test]
    fn build_metadata_does_not_affect_precedence() {
        assert_eq!(compare(&v("1.0.0+build.1"), &v("1.0.0+build.2")), Ordering::Equal);
    }

    #[test]
    fn parse_rejects_incomplete_versions() {
        assert!(parse("1.2").is_err());
        assert!(parse("a.b.c").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn sort_drops_invalid_entries() {
        let sorted = sort_descending(["v1.0.0", "not-a-version", "v2.0.0"], "v");
        assert_eq!(sorted, vec!["v2.0.0", "v1.0.0"]);
    }

    #[test]
    fn sort_orders_prereleases_below_release() {
        let sorted = sort_descending(
            ["v1.9.0-rc.0", "v2.0.0", "v1.9.0-rc.1", "v1.9.9", "latest"],
            "v",
        );
        assert_eq!(sorted, vec!["v2.0.0", "v1.9.9", "v1.9.0-rc.1", "v1.9.0-rc.0"]);
    }

    #[test]
    fn sort_requires_the_prefix() {
        let sorted = sort_descending(["1.0.0", "v0.1.0"], "v");
        assert_eq!(sorted, vec!["v0.1.0"]);
    }

    proptest! {
        #[test]
        fn sorted_output_is_non_increasing(
            versions in prop::collection::vec((0u64..5, 0u64..5, 0u64..5), 0..20)
        ) {
            let tags: Vec<String> = versions
                .iter()
                .map(|(a, b, c)| format!("v{}.{}.{}", a, b, c))
                .collect();
            let sorted = sort_descending(&tags, "v");
            prop_assert_eq!(sorted.len(), tags.len());
            for pair in sorted.windows(2) {
                let a = v(&pair[0][1..]);
                let b = v(&pair[1][1..]);
                prop_assert!(compare(&a, &b) != Ordering::Less);
            }
        }
    }
}
