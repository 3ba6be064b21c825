//! # Artifact Store
//!
//! Atomic writer/reader over a target directory (the quadlet directory).
//! Change-detects by comparing the artifact's hash against the hash of
//! whatever is already on disk, so unchanged files are never touched.

use super::Artifact;
use crate::hash::ContentHash;
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

trait IoContext<T> {
    fn ctx(self, path: &Path) -> Result<T, StoreError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn ctx(self, path: &Path) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A file read back from the store by [`ArtifactStore::list`].
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub rel_path: PathBuf,
    pub content: Vec<u8>,
    pub mode: u32,
    pub hash: ContentHash,
}

/// Permission bits for parent directories created under `base_dir`
/// (spec §4.2).
const DIR_MODE: u32 = 0o750;

/// Atomic writer/reader over `base_dir`. Never writes outside it, never
/// performs cross-directory renames.
#[derive(Debug)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Writes every artifact whose content differs from what's already
    /// on disk, atomically. Stops on the first error, leaving
    /// already-written paths in place.
    pub async fn write(
        &self,
        artifacts: &[Artifact],
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, StoreError> {
        let mut changed = Vec::new();
        for artifact in artifacts {
            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            let final_path = self.base_dir.join(&artifact.rel_path);
            let needs_write = match tokio::fs::read(&final_path).await {
                Ok(existing) => ContentHash::of(&existing) != artifact.hash,
                Err(e) if e.kind() == io::ErrorKind::NotFound => true,
                Err(e) => return Err(StoreError::Io { path: final_path, source: e }),
            };
            if !needs_write {
                debug!(unit = %artifact.key, "artifact unchanged, skipping write");
                continue;
            }
            self.write_atomic(&final_path, &artifact.content, artifact.mode)
                .await?;
            info!(unit = %artifact.key, path = %artifact.rel_path.display(), "wrote artifact");
            changed.push(artifact.rel_path.clone());
        }
        Ok(changed)
    }

    async fn write_atomic(&self, final_path: &Path, content: &[u8], mode: u32) -> Result<(), StoreError> {
        let parent = final_path.parent().unwrap_or(&self.base_dir);

        let parent_owned = parent.to_path_buf();
        let content_owned = content.to_vec();
        let final_owned = final_path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(DIR_MODE)
                .create(&parent_owned)
                .ctx(&parent_owned)?;
            let mut tmp = tempfile::Builder::new()
                .prefix(".artifact-")
                .suffix(".tmp")
                .tempfile_in(&parent_owned)
                .ctx(&parent_owned)?;
            use std::io::Write;
            tmp.write_all(&content_owned).ctx(&final_owned)?;
            tmp.as_file().set_permissions(std::fs::Permissions::from_mode(mode)).ctx(&final_owned)?;
            tmp.as_file().sync_all().ctx(&final_owned)?;
            tmp.persist(&final_owned)
                .map_err(|e| StoreError::Io { path: final_owned.clone(), source: e.error })?;
            Ok(())
        })
        .await
        .expect("write_atomic blocking task panicked")
    }

    /// Every regular file under `base_dir`, with a freshly computed
    /// hash. Per-file walk errors are logged and skipped; a top-level
    /// walk failure returns an error.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<StoredFile>, StoreError> {
        let base_dir = self.base_dir.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<StoredFile>, StoreError> {
            let mut out = Vec::new();
            for entry in walkdir::WalkDir::new(&base_dir) {
                if cancel.is_cancelled() {
                    return Err(StoreError::Cancelled);
                }
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable entry during artifact list");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let content = match std::fs::read(path) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable file during artifact list");
                        continue;
                    }
                };
                let mode = std::fs::metadata(path).ctx(path)?.permissions().mode() & 0o777;
                let rel_path = path
                    .strip_prefix(&base_dir)
                    .unwrap_or(path)
                    .to_path_buf();
                let hash = ContentHash::of(&content);
                out.push(StoredFile { rel_path, content, mode, hash });
            }
            Ok(out)
        })
        .await
        .expect("list blocking task panicked")
    }

    /// Best-effort delete. Missing files are not errors.
    pub async fn delete(
        &self,
        rel_paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<(), StoreError> {
        for rel_path in rel_paths {
            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            let path = self.base_dir.join(rel_path);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(path = %path.display(), "deleted orphan artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Io { path, source: e }),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{UnitKey, UnitType};

    #[tokio::test]
    async fn write_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let cancel = CancellationToken::new();
        let artifact = Artifact::new(UnitKey::new("web-api", UnitType::Container), b"Image=nginx".to_vec());
        let changed = store.write(std::slice::from_ref(&artifact), &cancel).await.unwrap();
        assert_eq!(changed, vec![artifact.rel_path.clone()]);

        let files = store.list(&cancel).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].hash, artifact.hash);
        assert!(!dir.path().join(".artifact-tmp").exists());
    }

    #[tokio::test]
    async fn second_write_of_identical_content_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let cancel = CancellationToken::new();
        let artifact = Artifact::new(UnitKey::new("web-api", UnitType::Container), b"Image=nginx".to_vec());
        store.write(std::slice::from_ref(&artifact), &cancel).await.unwrap();
        let changed = store.write(std::slice::from_ref(&artifact), &cancel).await.unwrap();
        assert!(changed.is_empty());
    }

    #[tokio::test]
    async fn created_parent_directories_are_mode_0750() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let cancel = CancellationToken::new();
        let mut artifact = Artifact::new(UnitKey::new("web-api", UnitType::Container), b"Image=nginx".to_vec());
        artifact.rel_path = PathBuf::from("nested/sub/web-api.container");
        store.write(std::slice::from_ref(&artifact), &cancel).await.unwrap();

        let nested_mode = std::fs::metadata(dir.path().join("nested")).unwrap().permissions().mode() & 0o777;
        let sub_mode = std::fs::metadata(dir.path().join("nested/sub")).unwrap().permissions().mode() & 0o777;
        assert_eq!(nested_mode, 0o750);
        assert_eq!(sub_mode, 0o750);
    }

    #[tokio::test]
    async fn delete_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let cancel = CancellationToken::new();
        store
            .delete(&[PathBuf::from("nope.container")], &cancel)
            .await
            .unwrap();
    }
}
