use crate::error::{Result, SurfaceError};
use std::path::{Path, PathBuf};

/// Canonicalize `target`, require that it exists and, when `root` is set,
/// that it lives underneath it.
pub fn validate_target(target: &Path, root: Option<&Path>) -> Result<PathBuf> {
    let canonical = target.canonicalize().map_err(|e| SurfaceError::InvalidPath {
        path: target.to_path_buf(),
        reason: format!("cannot be resolved: {e}"),
    })?;

    if let Some(root) = root {
        let root = root.canonicalize().map_err(|e| SurfaceError::InvalidPath {
            path: root.to_path_buf(),
            reason: format!("workspace root cannot be resolved: {e}"),
        })?;
        if !canonical.starts_with(&root) {
            return Err(SurfaceError::InvalidPath {
                path: canonical,
                reason: format!("outside of workspace root {}", root.display()),
            });
        }
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_rejected() {
        let dir = TempDir::new().unwrap();
        let err = validate_target(&dir.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, SurfaceError::InvalidPath { .. }));
    }

    #[test]
    fn test_traversal_outside_root_rejected() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        let sibling = dir.path().join("sibling");
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::create_dir_all(&sibling).unwrap();

        let inside = validate_target(&root.join("pkg"), Some(&root)).unwrap();
        assert!(inside.ends_with("pkg"));

        let escaped = root.join("..").join("sibling");
        let err = validate_target(&escaped, Some(&root)).unwrap_err();
        assert!(err.to_string().contains("outside of workspace root"));
    }
}
