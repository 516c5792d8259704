//! # Path Resolution Module
//!
//! Centralizza il calcolo del path temporaneo `<originale>.temp` e la sua pulizia.
//!
//! Il file temporaneo vive accanto all'originale (stessa directory, quindi stesso filesystem)
//! così che la rename finale non debba mai copiare dati tra dischi.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::OptimizeError;

/// Utility per calcolare i path temporanei in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Sibling temp path: `photo.jpg` → `photo.jpg.temp`
    pub fn temp_path(original: &Path) -> PathBuf {
        let mut name = OsString::from(original.as_os_str());
        name.push(".temp");
        PathBuf::from(name)
    }
}

/// Scoped `<original>.temp` file.
///
/// Dropping the guard without calling [`TempFileGuard::commit`] removes the temp file,
/// so no exit path of a write leaves it behind.
pub struct TempFileGuard {
    original: PathBuf,
    temp: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    pub fn new(original: &Path) -> Self {
        Self {
            original: original.to_path_buf(),
            temp: PathResolver::temp_path(original),
            armed: true,
        }
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Write the full contents to the temp file
    pub async fn write(&self, bytes: &[u8]) -> Result<(), OptimizeError> {
        tokio::fs::write(&self.temp, bytes).await?;
        Ok(())
    }

    /// Replace the original with the temp file: delete original, then rename.
    ///
    /// If the rename fails after the original is gone, the temp file is the only copy and
    /// is left in place for manual recovery.
    pub async fn commit(mut self) -> Result<(), OptimizeError> {
        tokio::fs::metadata(&self.temp).await?;
        tokio::fs::remove_file(&self.original).await?;
        self.armed = false;

        if let Err(e) = tokio::fs::rename(&self.temp, &self.original).await {
            error!(
                "Could not move {} into place ({}); the file content is kept in {}",
                self.original.display(),
                e,
                self.temp.display()
            );
            return Err(e.into());
        }
        debug!("Committed {} over {}", self.temp.display(), self.original.display());
        Ok(())
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.temp) {
            Ok(()) => debug!("Removed leftover temp file {}", self.temp.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove temp file {}: {}", self.temp.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            PathResolver::temp_path(Path::new("dir/photo.JPG")),
            PathBuf::from("dir/photo.JPG.temp")
        );
        assert_eq!(PathResolver::temp_path(Path::new("noext")), PathBuf::from("noext.temp"));
    }

    #[tokio::test]
    async fn test_commit_swaps_file() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("a.png");
        std::fs::write(&original, b"original bytes").unwrap();

        let guard = TempFileGuard::new(&original);
        guard.write(b"smaller").await.unwrap();
        let temp = guard.temp_path().to_path_buf();
        assert!(temp.exists());

        guard.commit().await.unwrap();
        assert_eq!(std::fs::read(&original).unwrap(), b"smaller");
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn test_drop_without_commit_cleans_up() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("a.gif");
        std::fs::write(&original, b"keep me").unwrap();

        let temp = {
            let guard = TempFileGuard::new(&original);
            guard.write(b"abandoned").await.unwrap();
            guard.temp_path().to_path_buf()
        };

        assert!(!temp.exists());
        assert_eq!(std::fs::read(&original).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_commit_without_temp_keeps_original() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("missing-temp.webp");
        std::fs::write(&original, b"data").unwrap();

        let guard = TempFileGuard::new(&original);
        assert!(guard.commit().await.is_err());
        assert_eq!(std::fs::read(&original).unwrap(), b"data");
    }
}
