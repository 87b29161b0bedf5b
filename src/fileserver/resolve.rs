//! Request path resolution
//!
//! Maps a request path onto the root directory and guarantees the result
//! cannot leave it, neither through `..` segments nor through symlinks.

use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::FileError;
use crate::logger;

/// Normalize a request path into a relative path
///
/// `.` and empty segments are dropped, `..` removes the previous segment.
/// A `..` with nothing left to remove would climb above the root and is
/// rejected, as is any segment the platform would read as more than a plain
/// file name (NUL bytes, drive prefixes, embedded separators).
pub fn normalize(request_path: &str) -> Result<PathBuf, FileError> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in request_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(FileError::PathTraversal(request_path.to_string()));
                }
            }
            _ if is_plain_name(segment) => segments.push(segment),
            _ => return Err(FileError::PathTraversal(request_path.to_string())),
        }
    }

    Ok(segments.iter().collect())
}

fn is_plain_name(segment: &str) -> bool {
    if segment.contains('\0') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Resolve `request_path` under `root` to a canonical path inside `root`
///
/// The containment check compares path components, so a root of `/srv/www`
/// never admits `/srv/www-private`. Only `canonicalize` touches the
/// filesystem before the check passes.
pub async fn resolve(root: &Path, request_path: &str) -> Result<PathBuf, FileError> {
    let relative = normalize(request_path)?;

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Root directory not found or inaccessible '{}': {e}",
                root.display()
            ));
            return Err(FileError::NotFound(request_path.to_string()));
        }
    };

    // File not found is common (404), no need to log at warning level
    let Ok(canonical) = fs::canonicalize(root_canonical.join(&relative)).await else {
        return Err(FileError::NotFound(request_path.to_string()));
    };

    if !canonical.starts_with(&root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            request_path,
            canonical.display()
        ));
        return Err(FileError::PathTraversal(request_path.to_string()));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize("/a/b.txt").unwrap(), PathBuf::from("a/b.txt"));
        assert_eq!(normalize("a//./b.txt").unwrap(), PathBuf::from("a/b.txt"));
        assert_eq!(normalize("/").unwrap(), PathBuf::new());
    }

    #[test]
    fn test_normalize_dot_dot_inside_root() {
        assert_eq!(normalize("/a/../b.txt").unwrap(), PathBuf::from("b.txt"));
        assert_eq!(normalize("/a/b/../../c").unwrap(), PathBuf::from("c"));
    }

    #[test]
    fn test_normalize_escape() {
        for path in ["/../../etc/passwd", "..", "/a/../../b", "/a/b/../../../c"] {
            assert!(
                matches!(normalize(path), Err(FileError::PathTraversal(_))),
                "path {path:?}"
            );
        }
    }

    #[test]
    fn test_normalize_rejects_nul() {
        assert!(matches!(
            normalize("/a\0b"),
            Err(FileError::PathTraversal(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_file_inside_root() {
        let dir = TempDir::new().unwrap();
        stdfs::create_dir(dir.path().join("sub")).unwrap();
        stdfs::write(dir.path().join("sub/a.txt"), b"a").unwrap();

        let resolved = resolve(dir.path(), "/sub/a.txt").await.unwrap();
        assert_eq!(
            resolved,
            dir.path().canonicalize().unwrap().join("sub/a.txt")
        );
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve(dir.path(), "/missing.txt").await,
            Err(FileError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("gone");
        assert!(matches!(
            resolve(&root, "/a.txt").await,
            Err(FileError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_traversal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("www");
        stdfs::create_dir(&root).unwrap();
        stdfs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        assert!(matches!(
            resolve(&root, "/../secret.txt").await,
            Err(FileError::PathTraversal(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_sibling_prefix_symlink() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("www");
        let evil = dir.path().join("www-evil");
        stdfs::create_dir(&root).unwrap();
        stdfs::create_dir(&evil).unwrap();
        stdfs::write(evil.join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(&evil, root.join("link")).unwrap();

        assert!(matches!(
            resolve(&root, "/link/secret.txt").await,
            Err(FileError::PathTraversal(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_symlink_inside_root() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("alias.txt"))
            .unwrap();

        let resolved = resolve(dir.path(), "/alias.txt").await.unwrap();
        assert!(resolved.ends_with("target.txt"));
    }
}
