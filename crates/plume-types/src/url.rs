//! Site identity normalization.
//!
//! Sites are identified by URL-shaped strings such as
//! `dat://8f3a.../broadcasts/1.json`. Only the `scheme://host` prefix takes
//! part in identity comparisons; paths, queries and fragments are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};

/// Extract the `scheme://host` prefix of a site URL.
///
/// Returns `None` when the input has no well-formed scheme or an empty host.
///
/// # Examples
///
/// ```
/// use plume_types::normalize_url;
///
/// assert_eq!(normalize_url("dat://abc/profile.json"), Some("dat://abc"));
/// assert_eq!(normalize_url("dat://abc"), Some("dat://abc"));
/// assert_eq!(normalize_url("abc"), None);
/// assert_eq!(normalize_url("dat:///path"), None);
/// ```
pub fn normalize_url(url: &str) -> Option<&str> {
    let url = url.trim();
    let sep = url.find("://")?;
    let scheme = &url[..sep];

    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return None,
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }

    let host_start = sep + 3;
    let host_len = url[host_start..]
        .find(['/', '?', '#'])
        .unwrap_or(url.len() - host_start);
    if host_len == 0 {
        return None;
    }
    Some(&url[..host_start + host_len])
}

/// Returns `true` if both URLs normalize to the same site.
///
/// Strings that do not normalize never match anything, including each other.
pub fn same_site(a: &str, b: &str) -> bool {
    match (normalize_url(a), normalize_url(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// A validated, normalized site identity (`scheme://host`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteUrl(String);

impl SiteUrl {
    /// Parse and normalize a site URL.
    pub fn parse(url: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(TypeError::MissingParameter("url"));
        }
        normalize_url(url)
            .map(|normalized| Self(normalized.to_string()))
            .ok_or_else(|| TypeError::InvalidSiteUrl(url.to_string()))
    }

    /// The normalized `scheme://host` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The scheme component, without `://`.
    pub fn scheme(&self) -> &str {
        self.0.split_once("://").map(|(s, _)| s).unwrap_or_default()
    }

    /// The host component.
    pub fn host(&self) -> &str {
        self.0.split_once("://").map(|(_, h)| h).unwrap_or_default()
    }

    /// Returns `true` if `other` refers to this site.
    pub fn matches(&self, other: &str) -> bool {
        normalize_url(other) == Some(self.as_str())
    }

    /// Join an archive-absolute path onto this site, producing a full reference.
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.0, path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }
}

impl TryFrom<String> for SiteUrl {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SiteUrl> for String {
    fn from(url: SiteUrl) -> Self {
        url.0
    }
}

impl AsRef<str> for SiteUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SiteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SiteUrl({})", self.0)
    }
}

impl fmt::Display for SiteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_path_query_and_fragment() {
        assert_eq!(normalize_url("dat://abc/x/y.json"), Some("dat://abc"));
        assert_eq!(normalize_url("dat://abc?v=1"), Some("dat://abc"));
        assert_eq!(normalize_url("dat://abc#top"), Some("dat://abc"));
        assert_eq!(normalize_url("  dat://abc/  "), Some("dat://abc"));
    }

    #[test]
    fn other_schemes_normalize() {
        assert_eq!(normalize_url("hyper://k3y/"), Some("hyper://k3y"));
        assert_eq!(normalize_url("git+ssh://host/repo"), Some("git+ssh://host"));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(normalize_url(""), None);
        assert_eq!(normalize_url("abc"), None);
        assert_eq!(normalize_url("://abc"), None);
        assert_eq!(normalize_url("1dat://abc"), None);
        assert_eq!(normalize_url("dat://"), None);
        assert_eq!(normalize_url("dat:///abc"), None);
    }

    #[test]
    fn unnormalizable_never_match() {
        assert!(!same_site("abc", "abc"));
        assert!(!same_site("", ""));
        assert!(!same_site("dat://a", "nope"));
        assert!(same_site("dat://a/", "dat://a/b"));
    }

    #[test]
    fn site_url_parse() {
        let url = SiteUrl::parse("dat://alice/profile.json").unwrap();
        assert_eq!(url.as_str(), "dat://alice");
        assert_eq!(url.scheme(), "dat");
        assert_eq!(url.host(), "alice");
        assert!(url.matches("dat://alice/"));
        assert!(!url.matches("dat://bob"));
    }

    #[test]
    fn site_url_missing_and_invalid() {
        assert_eq!(
            SiteUrl::parse("  "),
            Err(TypeError::MissingParameter("url"))
        );
        assert!(matches!(
            SiteUrl::parse("alice"),
            Err(TypeError::InvalidSiteUrl(_))
        ));
    }

    #[test]
    fn site_url_join() {
        let url = SiteUrl::parse("dat://alice").unwrap();
        assert_eq!(url.join("/broadcasts/1.json"), "dat://alice/broadcasts/1.json");
        assert_eq!(url.join("profile.json"), "dat://alice/profile.json");
    }

    #[test]
    fn site_url_serde_validates() {
        let url: SiteUrl = serde_json::from_str("\"dat://alice/x\"").unwrap();
        assert_eq!(url.as_str(), "dat://alice");
        assert!(serde_json::from_str::<SiteUrl>("\"alice\"").is_err());
        assert_eq!(serde_json::to_string(&url).unwrap(), "\"dat://alice\"");
    }

    proptest! {
        #[test]
        fn path_suffix_never_changes_identity(
            host in "[a-f0-9]{1,64}",
            path in "(/[a-z0-9._-]{0,12}){0,4}",
        ) {
            let base = format!("dat://{host}");
            let full = format!("{base}{path}");
            prop_assert_eq!(normalize_url(&full), Some(base.as_str()));
            prop_assert!(same_site(&base, &full));
        }
    }
}
