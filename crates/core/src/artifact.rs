//! On-disk cache of compiled native tool binaries.
//!
//! Layout: `<root>/<language>/<content-hash>/<binary>`. Installing a new
//! artifact for a language evicts every other version directory of that
//! language, so at most one live artifact per language is kept on disk.

use crate::error::{Result, SurfaceError};
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surface_api::Language;
use tokio::sync::Mutex;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub language: String,
    pub hash: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

pub struct ArtifactCache {
    root: PathBuf,
    locks: DashMap<Language, Arc<Mutex<()>>>,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn language_dir(&self, language: &Language) -> PathBuf {
        self.root.join(language.as_str())
    }

    /// The newest installed artifact for `language`, if any.
    pub fn live_artifact(&self, language: &Language, binary: &str) -> Option<PathBuf> {
        let entries = fs::read_dir(self.language_dir(language)).ok()?;
        entries
            .flatten()
            .map(|e| e.path().join(binary))
            .filter(|p| p.is_file())
            .max_by_key(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
    }

    /// Every version directory currently present for `language`.
    pub fn versions(&self, language: &Language) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(self.language_dir(language))
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect()
            })
            .unwrap_or_default();
        dirs.sort();
        dirs
    }

    /// Copy `source` into the cache as the live artifact for `language` and
    /// remove every superseded version.
    pub async fn install(&self, language: &Language, binary: &str, source: &Path) -> Result<PathBuf> {
        let lock = self
            .locks
            .entry(language.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let bytes = tokio::fs::read(source).await.map_err(|e| SurfaceError::InvalidPath {
            path: source.to_path_buf(),
            reason: format!("cannot read artifact: {e}"),
        })?;
        let hash = format!("{:016x}", xxh3_64(&bytes));
        let lang_dir = self.language_dir(language);
        let version_dir = lang_dir.join(&hash);
        tokio::fs::create_dir_all(&version_dir).await?;

        let dest = version_dir.join(binary);
        let staging = version_dir.join(format!(".{binary}.partial"));
        tokio::fs::write(&staging, &bytes).await?;
        mark_executable(&staging).await?;
        tokio::fs::rename(&staging, &dest).await?;

        let mut entries = tokio::fs::read_dir(&lang_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path != version_dir && path.is_dir() {
                match tokio::fs::remove_dir_all(&path).await {
                    Ok(()) => tracing::debug!(path = %path.display(), "evicted superseded artifact"),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to evict artifact"),
                }
            }
        }

        tracing::info!(language = %language, path = %dest.display(), "installed native artifact");
        Ok(dest)
    }

    pub fn scan(&self) -> Vec<ArtifactSummary> {
        let mut out = Vec::new();
        let Ok(languages) = fs::read_dir(&self.root) else {
            return out;
        };
        for lang in languages.flatten() {
            let Ok(versions) = fs::read_dir(lang.path()) else {
                continue;
            };
            for version in versions.flatten() {
                let Ok(files) = fs::read_dir(version.path()) else {
                    continue;
                };
                for file in files.flatten() {
                    let Ok(meta) = file.metadata() else { continue };
                    if !meta.is_file() || file.file_name().to_string_lossy().starts_with('.') {
                        continue;
                    }
                    out.push(ArtifactSummary {
                        language: lang.file_name().to_string_lossy().into_owned(),
                        hash: version.file_name().to_string_lossy().into_owned(),
                        path: file.path(),
                        size_bytes: meta.len(),
                    });
                }
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    /// Remove every installed artifact.
    pub fn clear(&self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_install_evicts_previous_versions() {
        let dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(dir.path().join("artifacts"));
        let v1 = dir.path().join("v1");
        let v2 = dir.path().join("v2");
        fs::write(&v1, b"binary one").unwrap();
        fs::write(&v2, b"binary two").unwrap();

        let first = cache.install(&Language::GO, "surface-go", &v1).await.unwrap();
        assert_eq!(cache.live_artifact(&Language::GO, "surface-go"), Some(first.clone()));

        let second = cache.install(&Language::GO, "surface-go", &v2).await.unwrap();
        assert_ne!(first, second);
        assert!(!first.exists());
        assert_eq!(cache.versions(&Language::GO).len(), 1);
        assert_eq!(cache.live_artifact(&Language::GO, "surface-go"), Some(second));
        assert_eq!(fs::read(cache.scan()[0].path.clone()).unwrap(), b"binary two");
    }

    #[tokio::test]
    async fn test_languages_are_independent() {
        let dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(dir.path().join("artifacts"));
        let src = dir.path().join("bin");
        fs::write(&src, b"x").unwrap();

        cache.install(&Language::GO, "surface-go", &src).await.unwrap();
        cache.install(&Language::JAVA, "surface-java", &src).await.unwrap();
        assert_eq!(cache.scan().len(), 2);

        cache.clear().unwrap();
        assert!(cache.scan().is_empty());
        assert_eq!(cache.live_artifact(&Language::GO, "surface-go"), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_installed_artifact_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(dir.path().join("artifacts"));
        let src = dir.path().join("bin");
        fs::write(&src, b"#!/bin/sh\n").unwrap();
        let dest = cache.install(&Language::PYTHON, "surface-python", &src).await.unwrap();
        let mode = fs::metadata(dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
