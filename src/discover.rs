use crate::error::{AuditError, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Find every git repository below `root`.
///
/// Work trees are reported by their top-level directory, bare repositories by
/// their git directory. The walk does not descend into git directories.
pub fn find_repositories<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(AuditError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| !entry.path().parent().is_some_and(is_git_dir))
        .build();

    let mut repositories = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read directory entry: {e}; skipping");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_dir()) {
            continue;
        }

        let path = entry.path();
        if !is_git_dir(path) {
            continue;
        }

        let repository = if path.file_name().is_some_and(|n| n == ".git") {
            path.parent().unwrap_or(path).to_path_buf()
        } else {
            path.to_path_buf()
        };
        debug!("Found repository at {}", repository.display());
        repositories.push(repository);
    }

    repositories.sort();
    repositories.dedup();
    Ok(repositories)
}

/// A directory named `*.git` that holds a `HEAD` file and an object store.
fn is_git_dir(path: &Path) -> bool {
    let named_git = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".git"));
    named_git && path.join("HEAD").is_file() && path.join("objects").is_dir()
}
