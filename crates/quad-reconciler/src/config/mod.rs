//! # Configuration
//!
//! The settings a reconcile cycle needs. Loading these from a config
//! file, environment variables, or a CLI is a caller concern; this
//! module only defines the shape and the validation that the data model
//! (spec §3) requires of it.

mod repo;

pub use repo::RepoDescriptor;

use std::path::PathBuf;

/// Settings for one run of the reconciler.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the service manager reads quadlet unit files from.
    pub quadlet_dir: PathBuf,
    /// Directory repositories are cloned/fetched into.
    pub repository_dir: PathBuf,
    /// Path to the persisted JSON state file.
    pub state_path: PathBuf,
    /// Use the user-mode (session) service manager bus instead of system.
    pub user_mode: bool,
    pub verbose: bool,
    pub repositories: Vec<RepoDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("repository name {0:?} is not unique")]
    DuplicateRepoName(String),
    #[error("repository name {0:?} is invalid: {1}")]
    InvalidRepoName(String, String),
}

impl Config {
    /// Validates cross-field invariants spec §3 requires of
    /// `RepoDescriptor`: unique, DNS-safe names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for repo in &self.repositories {
            repo.validate_name()
                .map_err(|e| ConfigError::InvalidRepoName(repo.name.clone(), e))?;
            if !seen.insert(repo.name.as_str()) {
                return Err(ConfigError::DuplicateRepoName(repo.name.clone()));
            }
        }
        Ok(())
    }
}
