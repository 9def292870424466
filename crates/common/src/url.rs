use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Errors from constructing a [`WorldUrl`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("world url is empty")]
    Empty,
    #[error("invalid world url reference: {0}")]
    Invalid(#[from] url::ParseError),
}

/// Identity of a world document.
///
/// Kept as the literal string the document was addressed by; two worlds are
/// the same world iff their URLs compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldUrl(String);

impl WorldUrl {
    pub fn parse(url: impl Into<String>) -> Result<Self, UrlError> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(UrlError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable world name: last path segment without its extension.
    pub fn display_name(&self) -> &str {
        let path = self.0.split(['?', '#']).next().unwrap_or(&self.0);
        let last = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(path);
        match last.rfind('.') {
            Some(dot) if dot > 0 => &last[..dot],
            _ => last,
        }
    }

    /// Resolve a portal destination written inside this world's document.
    ///
    /// Bases with a scheme resolve with RFC 3986 rules, so absolute paths
    /// keep the base's scheme and host. Bare path bases only support
    /// path-relative references; `/...` and `scheme:...` are taken as-is.
    pub fn join(&self, reference: &str) -> Result<WorldUrl, UrlError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(UrlError::Empty);
        }
        if let Ok(base) = Url::parse(&self.0) {
            return WorldUrl::parse(base.join(reference)?.as_str());
        }
        if reference.starts_with('/') || Url::parse(reference).is_ok() {
            return WorldUrl::parse(reference);
        }

        let mut segments: Vec<&str> = self.0.split('/').collect();
        segments.pop();
        for part in reference.split('/') {
            match part {
                "." => {}
                ".." => {
                    if segments.len() > 1 || segments.first().is_some_and(|s| !s.is_empty()) {
                        segments.pop();
                    }
                }
                other => segments.push(other),
            }
        }
        WorldUrl::parse(segments.join("/"))
    }
}

impl fmt::Display for WorldUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorldUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> WorldUrl {
        WorldUrl::parse(s).unwrap()
    }

    #[test]
    fn empty_url_rejected() {
        assert_eq!(WorldUrl::parse("   "), Err(UrlError::Empty));
    }

    #[test]
    fn display_name_strips_path_and_extension() {
        assert_eq!(url("worlds/garden.json").display_name(), "garden");
        assert_eq!(url("https://host/a/b/cave.json?v=2").display_name(), "cave");
        assert_eq!(url("plain").display_name(), "plain");
        assert_eq!(url(".hidden").display_name(), ".hidden");
    }

    #[test]
    fn join_relative_replaces_last_segment() {
        let base = url("worlds/hub/garden.json");
        assert_eq!(base.join("cave.json").unwrap(), url("worlds/hub/cave.json"));
        assert_eq!(base.join("../lake.json").unwrap(), url("worlds/lake.json"));
        assert_eq!(base.join("./x/y.json").unwrap(), url("worlds/hub/x/y.json"));
    }

    #[test]
    fn join_keeps_scheme_and_host() {
        let base = url("https://host/w/a.json");
        assert_eq!(base.join("b.json").unwrap(), url("https://host/w/b.json"));
        assert_eq!(
            base.join("https://other/c.json").unwrap(),
            url("https://other/c.json")
        );
        assert_eq!(base.join("/root.json").unwrap(), url("https://host/root.json"));
        assert_eq!(base.join("../up.json").unwrap(), url("https://host/up.json"));
    }

    #[test]
    fn join_from_host_only_base() {
        let base = url("https://host");
        assert_eq!(base.join("b.json").unwrap(), url("https://host/b.json"));
        assert_eq!(base.join("/w/c.json").unwrap(), url("https://host/w/c.json"));
    }

    #[test]
    fn join_bare_path_takes_absolute_references() {
        let base = url("worlds/a.json");
        assert_eq!(base.join("/root.json").unwrap(), url("/root.json"));
        assert_eq!(
            base.join("file:///srv/w/b.json").unwrap(),
            url("file:///srv/w/b.json")
        );
    }

    #[test]
    fn join_from_bare_name() {
        assert_eq!(url("a.json").join("b.json").unwrap(), url("b.json"));
    }
}
