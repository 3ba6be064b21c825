//! # State Store
//!
//! Loads and saves the single [`State`] JSON document. The file is
//! advisory and rebuildable on corruption, so the save path favors a
//! simple write over a full temp-file-and-rename dance — unlike the
//! artifact store, which must never show a reader a partial unit file.

use super::State;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing file yields an empty, fully-initialized [`State`].
    pub async fn load(&self) -> Result<State, StateStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(State::default()),
            Err(source) => {
                return Err(StateStoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StateStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Creates the parent directory (0755) and writes pretty-printed
    /// JSON, 2-space indent, world-readable (0644).
    pub async fn save(&self, state: &State) -> Result<(), StateStoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StateStoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let json = serde_json::to_string_pretty(state).expect("State serialization is infallible");
        tokio::fs::write(&self.path, json.as_bytes())
            .await
            .map_err(|source| StateStoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        set_world_readable(&self.path).await
    }
}

#[cfg(unix)]
async fn set_world_readable(path: &Path) -> Result<(), StateStoreError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
        .await
        .map_err(|source| StateStoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
async fn set_world_readable(_path: &Path) -> Result<(), StateStoreError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = store.load().await.unwrap();
        assert_eq!(state, State::default());
    }

    #[tokio::test]
    async fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = State::default();
        state.set_commit("web", "deadbeef");
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn save_indents_with_two_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(&path);
        store.save(&State::default()).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("{\n  \"repositories\""));
    }
}
