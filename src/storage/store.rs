//! Artifact store over the local filesystem
//!
//! Writes go to a hidden `.partial-<uuid>` file in the target directory and are
//! renamed into place once complete, so a reader either sees the whole file or
//! nothing. Nothing here locks against the lifecycle sweeper: a file can vanish
//! between a listing and a read, and that surfaces as `StorageError::NotFound`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use super::types::{sanitize_filename, Directory, StorageError, StoredFile, PARTIAL_PREFIX};

/// Handle to the two artifact directories
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    inner: Arc<ArtifactStoreInner>,
}

#[derive(Debug)]
struct ArtifactStoreInner {
    sources_dir: PathBuf,
    outputs_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(sources_dir: impl Into<PathBuf>, outputs_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ArtifactStoreInner {
                sources_dir: sources_dir.into(),
                outputs_dir: outputs_dir.into(),
            }),
        }
    }

    /// Create both directories if missing
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in Directory::ALL {
            tokio::fs::create_dir_all(self.dir_path(dir)).await?;
        }
        Ok(())
    }

    pub fn dir_path(&self, dir: Directory) -> &Path {
        match dir {
            Directory::Sources => &self.inner.sources_dir,
            Directory::Outputs => &self.inner.outputs_dir,
        }
    }

    /// Resolve a stored name to its path, rejecting anything that is not
    /// already a sanitized single component.
    pub fn path_for(&self, dir: Directory, name: &str) -> Result<PathBuf, StorageError> {
        let safe = sanitize_filename(name)?;
        if safe != name {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.dir_path(dir).join(safe))
    }

    /// Atomically write `data` under `name`, replacing any previous file.
    ///
    /// Returns the number of bytes written.
    pub async fn write(&self, dir: Directory, name: &str, data: &[u8]) -> Result<u64, StorageError> {
        let final_path = self.path_for(dir, name)?;
        let temp_path = self
            .dir_path(dir)
            .join(format!("{}{}", PARTIAL_PREFIX, Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&temp_path, data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(
            directory = dir.label(),
            name = %name,
            size = data.len(),
            "Stored file"
        );

        Ok(data.len() as u64)
    }

    pub async fn read(&self, dir: Directory, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(dir, name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::from_io(e, name))
    }

    pub async fn exists(&self, dir: Directory, name: &str) -> bool {
        match self.path_for(dir, name) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn stat(&self, dir: Directory, name: &str) -> Result<StoredFile, StorageError> {
        let path = self.path_for(dir, name)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| StorageError::from_io(e, name))?;

        if !meta.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }

        Ok(StoredFile {
            name: name.to_string(),
            size: meta.len(),
            modified: meta.modified()?,
        })
    }

    /// Delete a file by its listed name. Partial files are removable too.
    pub async fn remove(&self, dir: Directory, name: &str) -> Result<(), StorageError> {
        if name.contains(['/', '\\']) || name == ".." || name.is_empty() {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        let path = self.dir_path(dir).join(name);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::from_io(e, name))
    }

    /// List the regular files of a directory, sorted by name.
    ///
    /// A missing directory lists as empty. Entries that disappear while being
    /// inspected are skipped.
    pub async fn list(&self, dir: Directory) -> Result<Vec<StoredFile>, StorageError> {
        let dir_path = self.dir_path(dir);

        let mut entries = match tokio::fs::read_dir(dir_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            if !meta.is_file() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            files.push(StoredFile {
                name,
                size: meta.len(),
                modified: meta.modified()?,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// First file (by name) in `dir` whose name starts with `prefix`.
    ///
    /// Short random ids are assumed not to collide; no disambiguation is done.
    pub async fn find_by_prefix(
        &self,
        dir: Directory,
        prefix: &str,
    ) -> Result<Option<StoredFile>, StorageError> {
        Ok(self
            .list(dir)
            .await?
            .into_iter()
            .find(|f| f.name.starts_with(prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp_dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(temp_dir.path().join("uploads"), temp_dir.path().join("output"))
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.ensure_dirs().await.unwrap();

        let written = store.write(Directory::Sources, "a.pdf", b"hello").await.unwrap();
        assert_eq!(written, 5);

        let data = store.read(Directory::Sources, "a.pdf").await.unwrap();
        assert_eq!(data, b"hello");
        assert!(store.exists(Directory::Sources, "a.pdf").await);
        assert!(!store.exists(Directory::Outputs, "a.pdf").await);
    }

    #[tokio::test]
    async fn test_write_leaves_no_partial_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.ensure_dirs().await.unwrap();

        store.write(Directory::Outputs, "x.pdf", b"1").await.unwrap();
        store.write(Directory::Outputs, "x.pdf", b"22").await.unwrap();

        let files = store.list(Directory::Outputs).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "x.pdf");
        assert_eq!(files[0].size, 2);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.ensure_dirs().await.unwrap();

        let result = store.read(Directory::Sources, "nope.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_traversal_names_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.ensure_dirs().await.unwrap();

        let result = store.read(Directory::Sources, "../output/secret.pdf").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));

        let result = store.write(Directory::Sources, "a/b.pdf", b"x").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let files = store.list(Directory::Sources).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_prefix_takes_first_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.ensure_dirs().await.unwrap();

        store.write(Directory::Outputs, "abcd1234_b.pdf", b"b").await.unwrap();
        store.write(Directory::Outputs, "abcd1234_a.pdf", b"a").await.unwrap();
        store.write(Directory::Outputs, "ffff0000_c.pdf", b"c").await.unwrap();

        let found = store
            .find_by_prefix(Directory::Outputs, "abcd1234_")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "abcd1234_a.pdf");

        let missing = store.find_by_prefix(Directory::Outputs, "00000000_").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_remove_and_stat() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.ensure_dirs().await.unwrap();

        store.write(Directory::Sources, "a.pdf", b"abc").await.unwrap();
        let stat = store.stat(Directory::Sources, "a.pdf").await.unwrap();
        assert_eq!(stat.size, 3);

        store.remove(Directory::Sources, "a.pdf").await.unwrap();
        assert!(matches!(
            store.stat(Directory::Sources, "a.pdf").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.remove(Directory::Sources, "a.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
