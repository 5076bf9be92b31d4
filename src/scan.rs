//! Content discovery.
//!
//! Every file under the content root whose extension matches
//! `markdown_extension` becomes one build job. Hidden files and directories
//! (leading `.`) are skipped. Jobs are absolute paths, sorted by component
//! so the pool dispatches them in a stable order:
//!
//! ```text
//! content/
//! ├── navigation.toml          # not a job
//! ├── index.md                 # job 2
//! ├── page.md                  # job 3
//! ├── .drafts/wip.md           # skipped
//! └── directory/
//!     └── nested-page.md       # job 1
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Unable to access content directory {}: {source}", path.display())]
    Access {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// All content files under `root` with extension `extension`.
pub fn discover(root: &Path, extension: &str) -> Result<Vec<PathBuf>, ScanError> {
    let meta = std::fs::metadata(root).map_err(|source| ScanError::Access {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::Access {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        let matches = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext == extension);
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.components().cmp(b.components()));
    Ok(files)
}

/// `path` relative to `root`, or `path` itself when it lies elsewhere.
pub fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn relative(files: &[PathBuf], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| relative_to(f, root).to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn finds_matching_files_recursively_in_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "page.md");
        touch(root, "index.md");
        touch(root, "directory/nested-page.md");
        touch(root, "navigation.toml");
        touch(root, "notes.markdown");

        let files = discover(root, "md").unwrap();
        assert_eq!(
            relative(&files, root),
            vec!["directory/nested-page.md", "index.md", "page.md"]
        );
    }

    #[test]
    fn skips_hidden_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(root, "visible.md");
        touch(root, ".hidden.md");
        touch(root, ".drafts/wip.md");

        let files = discover(root, "md").unwrap();
        assert_eq!(relative(&files, root), vec!["visible.md"]);
    }

    #[test]
    fn custom_extension() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.md");
        touch(tmp.path(), "b.page");

        let files = discover(tmp.path(), "page").unwrap();
        assert_eq!(relative(&files, tmp.path()), vec!["b.page"]);
    }

    #[test]
    fn empty_root_has_no_jobs() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(tmp.path(), "md").unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_access_error() {
        let tmp = TempDir::new().unwrap();
        let err = discover(&tmp.path().join("nope"), "md").unwrap_err();
        assert!(matches!(err, ScanError::Access { .. }));
        assert!(err.to_string().contains("Unable to access content directory"));
    }

    #[test]
    fn file_root_is_access_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "single.md");
        let err = discover(&tmp.path().join("single.md"), "md").unwrap_err();
        assert!(matches!(err, ScanError::Access { .. }));
    }
}
