//! Restricted filesystem view
//!
//! Maps slash-separated URL paths onto a directory root. Nothing outside the
//! root can be opened: `..` segments are resolved lexically before touching the
//! disk, and the canonical target must still live under the canonical root
//! (this catches symlinks pointing elsewhere).
//!
//! With directory listing disabled, opening a directory fails with
//! [`ServeError::NotFound`], exactly like a missing file.

use crate::error::{Result, ServeError};
use crate::logger;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// An opened filesystem entry
#[derive(Debug)]
pub enum FsEntry {
    File(OpenFile),
    /// Only produced when directory listing is enabled
    Directory(PathBuf),
}

#[derive(Debug)]
pub struct OpenFile {
    pub file: File,
    pub metadata: Metadata,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RestrictedFs {
    root: PathBuf,
    dir_index: bool,
}

impl RestrictedFs {
    pub fn new(root: impl Into<PathBuf>, dir_index: bool) -> Self {
        Self {
            root: root.into(),
            dir_index,
        }
    }

    /// Open `name`, a URL path relative to the root (`/sub/file.txt`, `sub/`, or empty)
    pub async fn open(&self, name: &str) -> Result<FsEntry> {
        let relative = clean_path(name).ok_or(ServeError::NotFound)?;
        let target = self.root.join(&relative);

        let file = File::open(&target).await?;
        let metadata = file.metadata().await?;

        if metadata.is_dir() {
            if !self.dir_index {
                return Err(ServeError::NotFound);
            }
            drop(file);
            self.ensure_inside_root(name, &target).await?;
            return Ok(FsEntry::Directory(target));
        }

        self.ensure_inside_root(name, &target).await?;
        Ok(FsEntry::File(OpenFile {
            file,
            metadata,
            path: target,
        }))
    }

    async fn ensure_inside_root(&self, name: &str, target: &Path) -> Result<()> {
        let root = match tokio::fs::canonicalize(&self.root).await {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Static directory not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return Err(ServeError::NotFound);
            }
        };
        let resolved = tokio::fs::canonicalize(target).await?;
        if resolved.starts_with(&root) {
            Ok(())
        } else {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {name} -> {}",
                resolved.display()
            ));
            Err(ServeError::NotFound)
        }
    }
}

/// Resolve `.` and `..` segments of a slash-separated path without ever
/// climbing above the root. Returns `None` for names that cannot be a file name
/// on this platform.
pub fn clean_path(name: &str) -> Option<PathBuf> {
    if name.contains('\0') || (std::path::MAIN_SEPARATOR != '/' && name.contains(std::path::MAIN_SEPARATOR)) {
        return None;
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    Some(segments.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), "beta").unwrap();
        dir
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/sub/b.txt"), Some(PathBuf::from("sub/b.txt")));
        assert_eq!(clean_path("./sub//b.txt"), Some(PathBuf::from("sub/b.txt")));
        assert_eq!(clean_path("/../../etc/passwd"), Some(PathBuf::from("etc/passwd")));
        assert_eq!(clean_path("/sub/../a.txt"), Some(PathBuf::from("a.txt")));
        assert_eq!(clean_path(""), Some(PathBuf::new()));
        assert_eq!(clean_path("/a\0b"), None);
    }

    #[tokio::test]
    async fn test_open_file() {
        let dir = tree();
        let fs = RestrictedFs::new(dir.path(), false);
        match fs.open("/sub/b.txt").await.unwrap() {
            FsEntry::File(f) => assert_eq!(f.metadata.len(), 4),
            FsEntry::Directory(_) => panic!("expected a file"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tree();
        let fs = RestrictedFs::new(dir.path(), true);
        assert!(matches!(fs.open("/nope.txt").await, Err(ServeError::NotFound)));
    }

    #[tokio::test]
    async fn test_directory_hidden_when_listing_disabled() {
        let dir = tree();
        let fs = RestrictedFs::new(dir.path(), false);
        assert!(matches!(fs.open("/sub").await, Err(ServeError::NotFound)));
        assert!(matches!(fs.open("/").await, Err(ServeError::NotFound)));
    }

    #[tokio::test]
    async fn test_directory_returned_when_listing_enabled() {
        let dir = tree();
        let fs = RestrictedFs::new(dir.path(), true);
        assert!(matches!(fs.open("/sub/").await, Ok(FsEntry::Directory(_))));
    }

    #[tokio::test]
    async fn test_dot_dot_cannot_escape_root() {
        let outer = tempfile::tempdir().unwrap();
        fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("www");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("index.txt"), "public").unwrap();

        let fs = RestrictedFs::new(&root, true);
        assert!(matches!(
            fs.open("/../secret.txt").await,
            Err(ServeError::NotFound)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_refused() {
        let outer = tempfile::tempdir().unwrap();
        fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("www");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), root.join("link.txt"))
            .unwrap();

        let fs = RestrictedFs::new(&root, false);
        assert!(matches!(fs.open("/link.txt").await, Err(ServeError::NotFound)));
    }
}
