//! Where rewritten documents and assets go.
//!
//! A resource already present at the target is *fresh*, and need not be
//! rewritten, when its content digest equals the new content or when it was
//! written within the freshness window.

use crate::resource::Resource;
use crate::result::ConcordantResult;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

/// SHA-256 of some content
#[must_use]
pub fn content_digest(content: &[u8]) -> [u8; 32] {
    Sha256::digest(content).into()
}

/// Persists output by logical resource.
pub trait Target {
    /// Write `content` to `resource`, replacing what is there
    fn write(&self, resource: &Resource, content: &[u8]) -> ConcordantResult<()>;

    /// Whether `resource` already holds an up-to-date copy of `content`
    fn is_fresh(&self, resource: &Resource, content: &[u8], window: Duration) -> bool;
}

/// Writes below a directory; `/a/b.html` maps to `root/a/b.html`.
#[derive(Debug, Clone)]
pub struct FileTarget {
    root: PathBuf,
}

impl FileTarget {
    /// Write below `root`
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

impl Target for FileTarget {
    fn write(&self, resource: &Resource, content: &[u8]) -> ConcordantResult<()> {
        let path = self.path_for(resource);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn is_fresh(&self, resource: &Resource, content: &[u8], window: Duration) -> bool {
        let path = self.path_for(resource);
        let Ok(existing) = std::fs::read(&path) else {
            return false;
        };
        if content_digest(&existing) == content_digest(content) {
            return true;
        }
        std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(|modified| SystemTime::now().duration_since(modified).unwrap_or_default())
            .is_some_and(|age| age <= window)
    }
}

#[derive(Debug, Clone)]
struct Stored {
    content: Vec<u8>,
    written: Instant,
}

/// Keeps output in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    files: RefCell<BTreeMap<Resource, Stored>>,
    writes: RefCell<usize>,
}

impl MemoryTarget {
    /// Create an empty target
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written to `resource`
    #[must_use]
    pub fn read(&self, resource: &Resource) -> Option<Vec<u8>> {
        self.files.borrow().get(resource).map(|s| s.content.clone())
    }

    /// Text written to `resource`
    #[must_use]
    pub fn read_text(&self, resource: &Resource) -> Option<String> {
        self.read(resource)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Resources written so far
    #[must_use]
    pub fn resources(&self) -> Vec<Resource> {
        self.files.borrow().keys().cloned().collect()
    }

    /// Number of `write` calls
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl Target for MemoryTarget {
    fn write(&self, resource: &Resource, content: &[u8]) -> ConcordantResult<()> {
        self.files.borrow_mut().insert(
            resource.clone(),
            Stored {
                content: content.to_vec(),
                written: Instant::now(),
            },
        );
        *self.writes.borrow_mut() += 1;
        Ok(())
    }

    fn is_fresh(&self, resource: &Resource, content: &[u8], window: Duration) -> bool {
        self.files.borrow().get(resource).is_some_and(|stored| {
            content_digest(&stored.content) == content_digest(content)
                || stored.written.elapsed() <= window
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod file_target_tests {
        use super::*;

        #[test]
        fn test_write_creates_directories() {
            let dir = tempfile::tempdir().unwrap();
            let target = FileTarget::new(dir.path());
            let resource = Resource::new("/spec/css/x.css");
            target.write(&resource, b"body {}").unwrap();
            assert_eq!(std::fs::read(dir.path().join("spec/css/x.css")).unwrap(), b"body {}");
        }

        #[test]
        fn test_freshness() {
            let dir = tempfile::tempdir().unwrap();
            let target = FileTarget::new(dir.path());
            let resource = Resource::new("/a.css");
            assert!(!target.is_fresh(&resource, b"a", Duration::ZERO));

            target.write(&resource, b"a").unwrap();
            assert!(target.is_fresh(&resource, b"a", Duration::ZERO));
            assert!(target.is_fresh(&resource, b"b", Duration::from_secs(60)));
        }
    }

    mod memory_target_tests {
        use super::*;

        #[test]
        fn test_same_content_is_fresh() {
            let target = MemoryTarget::new();
            let resource = Resource::new("/a.js");
            target.write(&resource, b"x").unwrap();
            assert!(target.is_fresh(&resource, b"x", Duration::ZERO));
            assert_eq!(target.read_text(&resource).as_deref(), Some("x"));
            assert_eq!(target.write_count(), 1);
        }

        #[test]
        fn test_changed_content_outside_window_is_stale() {
            let target = MemoryTarget::new();
            let resource = Resource::new("/a.js");
            target.write(&resource, b"x").unwrap();
            std::thread::sleep(Duration::from_millis(5));
            assert!(!target.is_fresh(&resource, b"y", Duration::ZERO));
        }
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(content_digest(b"abc"), content_digest(b"abc"));
        assert_ne!(content_digest(b"abc"), content_digest(b"abd"));
    }
}
