//! Where specification documents come from.

use crate::resource::Resource;
use crate::result::ConcordantResult;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Reads specification documents by logical resource.
pub trait SpecificationSource {
    /// Read the document at `resource`
    fn read(&self, resource: &Resource) -> ConcordantResult<String>;

    /// Whether a document exists at `resource`
    fn exists(&self, resource: &Resource) -> bool;
}

/// Reads documents from a directory tree; `/a/b.html` maps to `root/a/b.html`.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Serve documents below `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem path of a resource
    #[must_use]
    pub fn path_for(&self, resource: &Resource) -> PathBuf {
        self.root.join(resource.path().trim_start_matches('/'))
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SpecificationSource for FileSource {
    fn read(&self, resource: &Resource) -> ConcordantResult<String> {
        Ok(std::fs::read_to_string(self.path_for(resource))?)
    }

    fn exists(&self, resource: &Resource) -> bool {
        self.path_for(resource).is_file()
    }
}

/// In-memory documents, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<Resource, String>,
}

impl MemorySource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document
    #[must_use]
    pub fn with_document(mut self, resource: impl Into<Resource>, html: impl Into<String>) -> Self {
        self.documents.insert(resource.into(), html.into());
        self
    }
}

impl SpecificationSource for MemorySource {
    fn read(&self, resource: &Resource) -> ConcordantResult<String> {
        self.documents.get(resource).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no document at {resource}"),
            )
            .into()
        })
    }

    fn exists(&self, resource: &Resource) -> bool {
        self.documents.contains_key(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_source_maps_resources_below_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("spec")).unwrap();
        std::fs::write(dir.path().join("spec/A.html"), "<p>a</p>").unwrap();

        let source = FileSource::new(dir.path());
        let resource = Resource::new("/spec/A.html");
        assert!(source.exists(&resource));
        assert_eq!(source.read(&resource).unwrap(), "<p>a</p>");
        assert!(!source.exists(&Resource::new("/spec/B.html")));
        assert!(source.read(&Resource::new("/spec/B.html")).is_err());
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with_document("/x.html", "<p/>");
        assert!(source.exists(&Resource::new("/x.html")));
        assert!(source.read(&Resource::new("/y.html")).is_err());
    }
}
