//! Source discovery.
//!
//! Walks the input tree and yields every file whose extension has a decoder
//! (see [`supported_input_extensions`]). Matching is case-insensitive, so
//! `IMG_0001.JPG` is picked up.
//!
//! ```text
//! input/                     output/<timestamp>/
//! ├── a.jpg          →       ├── a.webp
//! ├── notes.txt              └── trips/
//! └── trips/                     └── beach.webp
//!     └── beach.PNG
//! ```
//!
//! Entries are visited in file-name order within each directory, so runs are
//! deterministic. Hidden entries (leading `.`) are skipped. When the output
//! directory lives inside the input tree, its subtree is skipped as well so a
//! second run doesn't reprocess the first run's results.

use crate::imaging::supported_input_extensions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Input is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// A discovered source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// Directory of the file relative to the input root (empty at the root).
    pub relative_dir: PathBuf,
}

impl SourceFile {
    /// File name without extension, used to name the outputs.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            supported_input_extensions().contains(&ext.as_str())
        })
}

/// `exclude` relative to `root`, if it lies strictly inside it.
fn excluded_subtree(root: &Path, exclude: &Path) -> Option<PathBuf> {
    let root = root.canonicalize().ok()?;
    let exclude = exclude.canonicalize().ok()?;
    let relative = exclude.strip_prefix(&root).ok()?;
    if relative.as_os_str().is_empty() {
        warn!(path = %root.display(), "output directory is the input directory");
        return None;
    }
    Some(relative.to_path_buf())
}

/// Walk `root` lazily, yielding supported images in deterministic order.
///
/// Unreadable entries are logged and skipped.
pub fn walk<'a>(root: &'a Path, exclude: Option<&Path>) -> impl Iterator<Item = SourceFile> + 'a {
    let skipped = exclude.and_then(|e| excluded_subtree(root, e));

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_name().to_string_lossy().starts_with('.') {
                return false;
            }
            match (&skipped, entry.path().strip_prefix(root)) {
                (Some(skip), Ok(rel)) if rel == skip => {
                    debug!(path = %entry.path().display(), "skipping output directory");
                    false
                }
                _ => true,
            }
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(move |entry| {
            let path = entry.into_path();
            let relative_dir = path
                .parent()
                .and_then(|parent| parent.strip_prefix(root).ok())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            SourceFile { path, relative_dir }
        })
}

/// Collect every supported image under `root`.
pub fn discover(root: &Path, exclude: Option<&Path>) -> Result<Vec<SourceFile>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let files: Vec<SourceFile> = walk(root, exclude).collect();
    debug!(root = %root.display(), count = files.len(), "discovered sources");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn relative_paths(root: &Path, files: &[SourceFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn is_supported_is_case_insensitive() {
        assert!(is_supported(Path::new("a.jpg")));
        assert!(is_supported(Path::new("a.JPG")));
        assert!(is_supported(Path::new("a.Jpeg")));
        assert!(is_supported(Path::new("a.jfif")));
        assert!(is_supported(Path::new("a.png")));
        assert!(is_supported(Path::new("a.webp")));
        assert!(!is_supported(Path::new("a.gif")));
        assert!(!is_supported(Path::new("a.tiff")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn discover_finds_nested_images_in_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.png");
        touch(tmp.path(), "a.JPG");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "trips/2024/beach.webp");
        touch(tmp.path(), "trips/city.jpeg");

        let files = discover(tmp.path(), None).unwrap();
        assert_eq!(
            relative_paths(tmp.path(), &files),
            vec!["a.JPG", "b.png", "trips/2024/beach.webp", "trips/city.jpeg"]
        );
    }

    #[test]
    fn relative_dir_mirrors_tree() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "top.jpg");
        touch(tmp.path(), "trips/2024/beach.webp");

        let files = discover(tmp.path(), None).unwrap();
        assert_eq!(files[0].relative_dir, PathBuf::new());
        assert_eq!(files[1].relative_dir, PathBuf::from("trips/2024"));
        assert_eq!(files[1].stem(), "beach");
    }

    #[test]
    fn hidden_entries_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), ".cache/thumb.jpg");
        touch(tmp.path(), ".hidden.jpg");
        touch(tmp.path(), "visible.jpg");

        let files = discover(tmp.path(), None).unwrap();
        assert_eq!(relative_paths(tmp.path(), &files), vec!["visible.jpg"]);
    }

    #[test]
    fn output_inside_input_is_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "photo.jpg");
        touch(tmp.path(), "output/20240101_000000/photo.webp");

        let files = discover(tmp.path(), Some(&tmp.path().join("output"))).unwrap();
        assert_eq!(relative_paths(tmp.path(), &files), vec!["photo.jpg"]);
    }

    #[test]
    fn output_equal_to_input_is_not_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "photo.jpg");

        let files = discover(tmp.path(), Some(tmp.path())).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = discover(&tmp.path().join("nope"), None);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(tmp.path(), None).unwrap().is_empty());
    }
}
