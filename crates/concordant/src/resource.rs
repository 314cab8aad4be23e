//! Logical resource paths.
//!
//! A [`Resource`] names a specification or asset independently of where it is
//! eventually written. Paths are always absolute, `/`-separated and
//! normalised (no `.` or `..` segments).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalised, absolute logical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resource {
    parts: Vec<String>,
}

impl Resource {
    /// Create a resource from a path. Relative paths are anchored at the root.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            parts: normalise(Vec::new(), path),
        }
    }

    /// The root resource `/`
    #[must_use]
    pub const fn root() -> Self {
        Self { parts: Vec::new() }
    }

    /// Full path, always starting with `/`
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.parts.join("/"))
    }

    /// Final path segment (empty for the root)
    #[must_use]
    pub fn name(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// Whether this is the root resource
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parts.is_empty()
    }

    /// Enclosing resource, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.parts.is_empty() {
            return None;
        }
        Some(Self {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        })
    }

    /// Resolve an `href` relative to this resource's directory.
    ///
    /// Fragments and query strings are dropped; absolute hrefs replace the
    /// whole path.
    #[must_use]
    pub fn relative_resource(&self, href: &str) -> Self {
        let href = href.split(['#', '?']).next().unwrap_or_default();
        if href.starts_with('/') {
            return Self::new(href);
        }
        let base = self
            .parent()
            .map(|p| p.parts)
            .unwrap_or_default();
        Self {
            parts: normalise(base, href),
        }
    }

    /// Path from this resource's directory to `target`, suitable for an
    /// `href` or `src` attribute in this resource's document.
    #[must_use]
    pub fn relative_path(&self, target: &Self) -> String {
        let from_dir = self.parent().map(|p| p.parts).unwrap_or_default();
        let common = from_dir
            .iter()
            .zip(&target.parts)
            .take_while(|(a, b)| a == b)
            .count();
        // The target's file name must stay even when it matches a directory.
        let common = common.min(target.parts.len().saturating_sub(1));

        let mut segments: Vec<&str> = Vec::new();
        for _ in common..from_dir.len() {
            segments.push("..");
        }
        for part in &target.parts[common..] {
            segments.push(part);
        }
        segments.join("/")
    }
}

fn normalise(mut parts: Vec<String>, path: &str) -> Vec<String> {
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other.to_string()),
        }
    }
    parts
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl From<&str> for Resource {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl TryFrom<String> for Resource {
    type Error = std::convert::Infallible;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Ok(Self::new(&path))
    }
}

impl From<Resource> for String {
    fn from(resource: Resource) -> Self {
        resource.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalises_path() {
        let r = Resource::new("spec/./a/../b/Hello.html");
        assert_eq!(r.path(), "/spec/b/Hello.html");
        assert_eq!(r.name(), "Hello.html");
    }

    #[test]
    fn test_root_has_no_parent() {
        assert!(Resource::root().parent().is_none());
        assert_eq!(Resource::root().path(), "/");
        assert!(Resource::new("/").is_root());
    }

    #[test]
    fn test_relative_resource_sibling() {
        let spec = Resource::new("/spec/calc/Adding.html");
        assert_eq!(
            spec.relative_resource("Subtracting.html").path(),
            "/spec/calc/Subtracting.html"
        );
    }

    #[test]
    fn test_relative_resource_parent_and_fragment() {
        let spec = Resource::new("/spec/calc/Adding.html");
        assert_eq!(
            spec.relative_resource("../image/logo.png#top").path(),
            "/spec/image/logo.png"
        );
        assert_eq!(spec.relative_resource("/abs/x.html").path(), "/abs/x.html");
    }

    #[test]
    fn test_relative_path_to_sibling_directory() {
        let spec = Resource::new("/spec/calc/Adding.html");
        let css = Resource::new("/spec/css/style.css");
        assert_eq!(spec.relative_path(&css), "../css/style.css");
    }

    #[test]
    fn test_relative_path_same_directory() {
        let spec = Resource::new("/spec/Adding.html");
        let other = Resource::new("/spec/Other.html");
        assert_eq!(spec.relative_path(&other), "Other.html");
    }

    #[test]
    fn test_serde_as_string() {
        let r = Resource::new("/a/b.html");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"/a/b.html\"");
        let back: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn segment() -> impl Strategy<Value = String> {
            "[a-z]{1,6}"
        }

        proptest! {
            #[test]
            fn prop_relative_path_round_trips(
                from in proptest::collection::vec(segment(), 1..5),
                to in proptest::collection::vec(segment(), 1..5),
            ) {
                let from = Resource::new(&from.join("/"));
                let to = Resource::new(&to.join("/"));
                let link = from.relative_path(&to);
                prop_assert_eq!(from.relative_resource(&link), to);
            }
        }
    }
}
