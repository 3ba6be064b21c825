//! # Git Syncer
//!
//! Parallel clone-or-fetch-and-checkout against a list of repository
//! descriptors (spec §4.7). Shells out to the `git` binary via
//! `tokio::process::Command` rather than linking `git2`/libgit2, the same
//! choice the teacher makes for its own repository cloning to avoid an
//! OpenSSL-linked dependency.

use crate::config::RepoDescriptor;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const MAX_CONCURRENT_SYNCS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("failed to run git {args:?}: {source}")]
    Spawn {
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },
    #[error("git {args:?} exited with status {status}: {stderr}")]
    Command {
        args: Vec<String>,
        status: i32,
        stderr: String,
    },
    #[error("no reference {reference:?} found as commit, branch, or tag")]
    UnresolvedReference { reference: String },
}

/// Outcome of syncing one repository.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub repo: String,
    pub success: bool,
    pub changed: bool,
    pub commit_hash: String,
    pub err: Option<String>,
}

#[derive(Debug)]
pub struct GitSyncer {
    repository_dir: PathBuf,
}

impl GitSyncer {
    pub fn new(repository_dir: impl Into<PathBuf>) -> Self {
        Self { repository_dir: repository_dir.into() }
    }

    #[must_use]
    pub fn repo_path(&self, repo: &RepoDescriptor) -> PathBuf {
        self.repository_dir.join(&repo.name)
    }

    /// Syncs every repo, bounding concurrency to `min(len(repos), 8)`.
    /// Returns one [`SyncResult`] per repo in input order.
    pub async fn sync_all(&self, repos: &[RepoDescriptor], cancel: &CancellationToken) -> Vec<SyncResult> {
        let permits = MAX_CONCURRENT_SYNCS.min(repos.len().max(1));
        let semaphore = Semaphore::new(permits);

        let tasks = repos.iter().map(|repo| async {
            let Ok(_permit) = semaphore.acquire().await else {
                return sync_result_for_error(repo, SyncError::Cancelled);
            };
            match self.sync_repo(repo, cancel).await {
                Ok(result) => result,
                Err(e) => sync_result_for_error(repo, e),
            }
        });

        futures::future::join_all(tasks).await
    }

    /// Clones if the local path is absent, fetches if present, then
    /// checks out the requested reference (commit, then branch, then
    /// tag). Empty reference pulls the default branch.
    pub async fn sync_repo(&self, repo: &RepoDescriptor, cancel: &CancellationToken) -> Result<SyncResult, SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let path = self.repo_path(repo);
        let before_hash = if path.join(".git").exists() {
            head_hash(&path).await.unwrap_or_default()
        } else {
            info!(repo = repo.name, url = repo.url, "cloning repository");
            run_git(None, &["clone", &repo.url, path.to_string_lossy().as_ref()]).await?;
            String::new()
        };

        if path.join(".git").exists() && !before_hash.is_empty() {
            info!(repo = repo.name, "fetching repository");
            run_git(Some(&path), &["fetch", "--all", "--tags"]).await?;
        }

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        checkout_reference(&path, &repo.reference).await?;

        let after_hash = head_hash(&path).await?;
        info!(repo = repo.name, commit = after_hash, "synced repository");

        Ok(SyncResult {
            repo: repo.name.clone(),
            success: true,
            changed: before_hash != after_hash,
            commit_hash: after_hash,
            err: None,
        })
    }
}

/// Tries the reference as a commit hash, then a branch, then explicitly
/// as a tag if branch checkout fails — the branch/tag fallback made
/// observable as a distinct, testable step rather than relying on git's
/// own implicit disambiguation.
async fn checkout_reference(path: &Path, reference: &str) -> Result<(), SyncError> {
    if reference.is_empty() {
        run_git(Some(path), &["symbolic-ref", "refs/remotes/origin/HEAD"])
            .await
            .map_err(|_| SyncError::UnresolvedReference { reference: String::new() })?;
        run_git(Some(path), &["pull", "origin", "HEAD"]).await?;
        return Ok(());
    }

    if run_git(Some(path), &["checkout", reference]).await.is_ok() {
        return Ok(());
    }

    if run_git(Some(path), &["rev-parse", &format!("refs/tags/{reference}")]).await.is_ok() {
        run_git(Some(path), &["checkout", &format!("refs/tags/{reference}")]).await?;
        return Ok(());
    }

    Err(SyncError::UnresolvedReference { reference: reference.to_string() })
}

async fn head_hash(path: &Path) -> Result<String, SyncError> {
    let output = run_git(Some(path), &["rev-parse", "HEAD"]).await?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<Output, SyncError> {
    let mut cmd = tokio::process::Command::new("git");
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    let owned_args: Vec<String> = args.iter().map(|s| (*s).to_string()).collect();
    let output = cmd.output().await.map_err(|source| SyncError::Spawn { args: owned_args.clone(), source })?;
    if !output.status.success() {
        return Err(SyncError::Command {
            args: owned_args,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

fn sync_result_for_error(repo: &RepoDescriptor, err: SyncError) -> SyncResult {
    warn!(repo = repo.name, error = %err, "sync failed");
    SyncResult {
        repo: repo.name.clone(),
        success: false,
        changed: false,
        commit_hash: String::new(),
        err: Some(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, url: &str) -> RepoDescriptor {
        RepoDescriptor { name: name.to_string(), url: url.to_string(), reference: String::new(), compose_subdir: String::new() }
    }

    async fn init_repo(dir: &Path) -> String {
        tokio::process::Command::new("git").args(["init", "-q", "-b", "main"]).current_dir(dir).output().await.unwrap();
        tokio::process::Command::new("git").args(["config", "user.email", "a@b.c"]).current_dir(dir).output().await.unwrap();
        tokio::process::Command::new("git").args(["config", "user.name", "test"]).current_dir(dir).output().await.unwrap();
        tokio::fs::write(dir.join("compose.yaml"), b"services: {}\n").await.unwrap();
        tokio::process::Command::new("git").args(["add", "."]).current_dir(dir).output().await.unwrap();
        tokio::process::Command::new("git").args(["commit", "-q", "-m", "init"]).current_dir(dir).output().await.unwrap();
        let out = tokio::process::Command::new("git").args(["rev-parse", "HEAD"]).current_dir(dir).output().await.unwrap();
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    #[tokio::test]
    async fn clones_a_fresh_repository() {
        let upstream = tempfile::tempdir().unwrap();
        let expected = init_repo(upstream.path()).await;

        let workdir = tempfile::tempdir().unwrap();
        let syncer = GitSyncer::new(workdir.path());
        let descriptor = repo("demo", upstream.path().to_str().unwrap());
        let cancel = CancellationToken::new();
        let result = syncer.sync_repo(&descriptor, &cancel).await.unwrap();

        assert!(result.success);
        assert!(result.changed);
        assert_eq!(result.commit_hash, expected);
    }

    #[tokio::test]
    async fn checkout_falls_back_to_tag_when_branch_checkout_fails() {
        let upstream = tempfile::tempdir().unwrap();
        init_repo(upstream.path()).await;
        tokio::process::Command::new("git").args(["tag", "v1"]).current_dir(upstream.path()).output().await.unwrap();

        let workdir = tempfile::tempdir().unwrap();
        let syncer = GitSyncer::new(workdir.path());
        let mut descriptor = repo("demo", upstream.path().to_str().unwrap());
        descriptor.reference = "v1".to_string();
        let cancel = CancellationToken::new();
        let result = syncer.sync_repo(&descriptor, &cancel).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn sync_all_preserves_input_order() {
        let mut upstreams = Vec::new();
        let mut descriptors = Vec::new();
        for i in 0..3 {
            let upstream = tempfile::tempdir().unwrap();
            init_repo(upstream.path()).await;
            descriptors.push(repo(&format!("repo-{i}"), upstream.path().to_str().unwrap()));
            upstreams.push(upstream);
        }
        let workdir = tempfile::tempdir().unwrap();
        let syncer = GitSyncer::new(workdir.path());
        let cancel = CancellationToken::new();
        let results = syncer.sync_all(&descriptors, &cancel).await;
        let names: Vec<&str> = results.iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(names, vec!["repo-0", "repo-1", "repo-2"]);
    }
}
