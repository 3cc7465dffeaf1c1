//! Content fingerprint of a package directory.

use crate::error::Result;
use std::path::Path;
use std::time::UNIX_EPOCH;
use walkdir::{DirEntry, WalkDir};
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// Directories that never hold the package's own sources.
pub const SKIPPED_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "vendor",
    "build",
    "dist",
    "__pycache__",
    "venv",
];

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&&*name)
}

fn is_recognized(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// Hex digest over every recognized file under `root`: its relative path,
/// size, modification time and content hash, in path order. Adding, removing
/// or modifying a recognized file changes the digest. An empty extension
/// list recognizes every file.
pub fn fingerprint(root: &Path, extensions: &[String]) -> Result<String> {
    let mut hasher = Xxh3::new();
    let mut files = 0u64;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e));

    for entry in walker {
        let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
        if !entry.file_type().is_file() || !is_recognized(entry.path(), extensions) {
            continue;
        }
        let meta = entry.metadata().map_err(|e| std::io::Error::other(e.to_string()))?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let content = std::fs::read(entry.path())?;

        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(&meta.len().to_le_bytes());
        hasher.update(&mtime.to_le_bytes());
        hasher.update(&xxh3_64(&content).to_le_bytes());
        files += 1;
    }

    hasher.update(&files.to_le_bytes());
    Ok(format!("{:016x}", hasher.digest()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["py".to_string()]
    }

    #[test]
    fn test_stable_for_unchanged_tree() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        assert_eq!(
            fingerprint(dir.path(), &exts()).unwrap(),
            fingerprint(dir.path(), &exts()).unwrap()
        );
    }

    #[test]
    fn test_changes_on_add_modify_remove() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        let base = fingerprint(dir.path(), &exts()).unwrap();

        fs::write(dir.path().join("b.py"), "y = 2").unwrap();
        let added = fingerprint(dir.path(), &exts()).unwrap();
        assert_ne!(base, added);

        fs::write(dir.path().join("a.py"), "x = 10").unwrap();
        let modified = fingerprint(dir.path(), &exts()).unwrap();
        assert_ne!(added, modified);

        fs::remove_file(dir.path().join("b.py")).unwrap();
        assert_ne!(modified, fingerprint(dir.path(), &exts()).unwrap());
    }

    #[test]
    fn test_ignores_unrecognized_and_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        let base = fingerprint(dir.path(), &exts()).unwrap();

        fs::write(dir.path().join("README.md"), "docs").unwrap();
        fs::create_dir_all(dir.path().join("__pycache__")).unwrap();
        fs::write(dir.path().join("__pycache__/a.py"), "cached").unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/hook.py"), "h").unwrap();

        assert_eq!(base, fingerprint(dir.path(), &exts()).unwrap());
    }
}
