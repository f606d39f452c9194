//! Candidate enumeration in the input directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Suffixes that make a file a candidate. Matching is case-sensitive.
pub const CANDIDATE_SUFFIXES: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Whether a file name is a processing candidate.
pub fn is_candidate(file_name: &str) -> bool {
    if file_name == "." || file_name == ".." {
        return false;
    }
    CANDIDATE_SUFFIXES
        .iter()
        .any(|suffix| file_name.len() > suffix.len() && file_name.ends_with(suffix))
}

/// List candidate image files directly inside `dir`, sorted by file name.
///
/// Subdirectories, non-candidate names and names that are not valid UTF-8
/// are skipped. Entries that vanish or cannot be inspected while listing are
/// skipped too.
///
/// # Errors
///
/// Returns [`Error::Directory`] if `dir` cannot be opened.
pub fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| Error::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !is_candidate(&name) {
            continue;
        }
        // follow symlinks so a linked image still counts
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => candidates.push(entry.path()),
            _ => continue,
        }
    }

    candidates.sort();
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_candidate() {
        assert!(is_candidate("photo.png"));
        assert!(is_candidate("photo.jpg"));
        assert!(is_candidate("photo.jpeg"));
        assert!(is_candidate("a.b.png"));

        assert!(!is_candidate("photo.PNG"));
        assert!(!is_candidate("photo.bmp"));
        assert!(!is_candidate("photo.png.txt"));
        assert!(!is_candidate(".png"));
        assert!(!is_candidate(".jpeg"));
        assert!(!is_candidate("."));
        assert!(!is_candidate(".."));
        assert!(!is_candidate("png"));
    }

    #[test]
    fn test_list_candidates_filters() {
        let dir = TempDir::new().unwrap();
        for name in ["b.jpg", "a.png", "c.jpeg", "notes.txt", "upper.JPG"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let found = list_candidates(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg", "c.jpeg"]);
    }

    #[test]
    fn test_list_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(list_candidates(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = list_candidates(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::Directory { .. }));
        assert!(err.is_fatal());
    }
}
