//! Persistence of uploaded datasets under the storage root.
//!
//! # Design
//! - Stored names are `raw_` + the final component of the declared name; earlier
//!   path components and backslash-separated segments are discarded.
//! - Writes truncate any existing file with the same name (last write wins).
//! - The whole stream is copied and flushed before the path is handed back.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{self, AsyncRead, AsyncWriteExt};
use tracing::{debug, info};

use crate::error::{IngestionError, IngestionResult};
use crate::model::StoredDataset;

/// Prefix prepended to every stored dataset name.
pub const STORED_NAME_PREFIX: &str = "raw_";

/// Writes uploads into a single storage directory.
#[derive(Debug, Clone)]
pub struct IngestionStore {
    root: PathBuf,
}

impl IngestionStore {
    /// Store rooted at `root`. The directory is not touched until [`Self::ensure_root`] or a write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root as configured.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root when it does not yet exist.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::StorageFailure`] if the directory cannot be created.
    pub async fn ensure_root(&self) -> IngestionResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| IngestionError::storage("create_root", self.root.clone(), source))?;
        debug!(root = %self.root.display(), "storage root ready");
        Ok(())
    }

    /// Absolute destination for a declared file name.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::InvalidName`] when nothing usable remains of the
    /// declared name, or [`IngestionError::StorageFailure`] when the path cannot be
    /// made absolute.
    pub fn destination_for(&self, declared_name: &str) -> IngestionResult<PathBuf> {
        let file_name = sanitize_declared_name(declared_name).ok_or_else(|| {
            IngestionError::InvalidName {
                declared: declared_name.to_string(),
            }
        })?;
        let joined = self.root.join(format!("{STORED_NAME_PREFIX}{file_name}"));
        std::path::absolute(&joined)
            .map_err(|source| IngestionError::storage("resolve_path", joined, source))
    }

    /// Copy `reader` to the destination derived from `declared_name`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::InvalidName`] for unusable names and
    /// [`IngestionError::StorageFailure`] when the file cannot be created or written.
    /// A partially written file may remain after a copy failure.
    pub async fn store<R>(&self, declared_name: &str, mut reader: R) -> IngestionResult<StoredDataset>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.destination_for(declared_name)?;
        let mut file = File::create(&path)
            .await
            .map_err(|source| IngestionError::storage("create_file", path.clone(), source))?;
        let bytes = io::copy(&mut reader, &mut file)
            .await
            .map_err(|source| IngestionError::storage("copy_stream", path.clone(), source))?;
        file.flush()
            .await
            .map_err(|source| IngestionError::storage("flush_file", path.clone(), source))?;

        info!(path = %path.display(), bytes, "dataset stored");
        Ok(StoredDataset::new(path, bytes))
    }
}

fn sanitize_declared_name(declared: &str) -> Option<&str> {
    let last = declared.rsplit(['/', '\\']).next().unwrap_or_default();
    match last {
        "" | "." | ".." => None,
        name if name.contains('\0') => None,
        name => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_keeps_only_final_component() {
        assert_eq!(sanitize_declared_name("data.csv"), Some("data.csv"));
        assert_eq!(sanitize_declared_name("../../etc/passwd"), Some("passwd"));
        assert_eq!(sanitize_declared_name("C:\\Users\\me\\x.csv"), Some("x.csv"));
        assert_eq!(sanitize_declared_name(""), None);
        assert_eq!(sanitize_declared_name(".."), None);
        assert_eq!(sanitize_declared_name("/"), None);
        assert_eq!(sanitize_declared_name("dir/"), None);
    }

    #[tokio::test]
    async fn store_writes_prefixed_absolute_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = IngestionStore::new(dir.path());
        let stored = store.store("patients.csv", &b"id,name\n1,ana\n"[..]).await?;

        assert!(stored.path().is_absolute());
        assert_eq!(stored.path(), dir.path().join("raw_patients.csv"));
        assert_eq!(stored.bytes(), 14);
        assert_eq!(fs::read(stored.path()).await?, b"id,name\n1,ana\n");
        Ok(())
    }

    #[tokio::test]
    async fn repeated_name_overwrites_previous_upload() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = IngestionStore::new(dir.path());
        let first = store.store("same.csv", &b"first upload, longer"[..]).await?;
        let second = store.store("same.csv", &b"second"[..]).await?;

        assert_eq!(first.path(), second.path());
        assert_eq!(fs::read(second.path()).await?, b"second");
        Ok(())
    }

    #[tokio::test]
    async fn traversal_attempts_stay_inside_root() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = IngestionStore::new(dir.path());
        let stored = store.store("../escape.csv", &b"x"[..]).await?;
        assert_eq!(stored.path(), dir.path().join("raw_escape.csv"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_name_is_rejected() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = IngestionStore::new(dir.path());
        let err = store
            .store("..", &b"x"[..])
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected an invalid name error"))?;
        assert!(matches!(err, IngestionError::InvalidName { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn missing_root_is_a_storage_failure() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = IngestionStore::new(dir.path().join("absent"));
        let err = store
            .store("a.csv", &b"x"[..])
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected a storage failure"))?;
        assert!(matches!(
            err,
            IngestionError::StorageFailure {
                operation: "create_file",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn ensure_root_creates_nested_directories() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = IngestionStore::new(dir.path().join("a").join("b"));
        store.ensure_root().await?;
        assert!(store.root().is_dir());
        Ok(())
    }
}
