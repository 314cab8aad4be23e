//! Command handlers - extracted from main.rs for testability

pub mod check;
pub mod config;
pub mod run;

pub use check::execute_check;
pub use config::execute_config;
pub use run::{execute_run, fixture_for, RUNNER_NAME};

use crate::{CliError, CliResult};
use concordant::Resource;
use std::path::{Path, PathBuf};

/// Split a specification path into its source root and its resource.
///
/// The root is the file's directory, so links between specifications in
/// the same tree resolve as they would in a browser.
pub fn locate_spec(spec: &Path) -> CliResult<(PathBuf, Resource)> {
    if !spec.is_file() {
        return Err(CliError::invalid_argument(format!(
            "specification not found: {}",
            spec.display()
        )));
    }
    let name = spec
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::invalid_argument(format!("not a file: {}", spec.display())))?;
    let root = spec
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((root, Resource::new(&name)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_spec() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("Hello.html");
        std::fs::write(&spec, "<p/>").unwrap();
        let (root, resource) = locate_spec(&spec).unwrap();
        assert_eq!(root, dir.path());
        assert_eq!(resource.path(), "/Hello.html");
    }

    #[test]
    fn test_locate_missing_spec() {
        let err = locate_spec(Path::new("/no/such/Spec.html")).unwrap_err();
        assert!(err.to_string().contains("specification not found"));
    }
}
