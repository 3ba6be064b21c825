//! End-to-end reconcile cycles against real local git repositories and a
//! recording fake service manager, covering the seed scenarios S1-S7.

use async_trait::async_trait;
use quad_reconciler::config::{Config, RepoDescriptor};
use quad_reconciler::manager::{ManagerError, ServiceManager};
use quad_reconciler::reconciler::Reconciler;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Calls {
    started: Vec<String>,
    restarted: Vec<String>,
    reloads: usize,
}

#[derive(Default)]
struct FakeManager {
    calls: Mutex<Calls>,
}

impl FakeManager {
    fn started(&self) -> Vec<String> {
        self.calls.lock().unwrap().started.clone()
    }

    fn restarted(&self) -> Vec<String> {
        self.calls.lock().unwrap().restarted.clone()
    }

    fn reloads(&self) -> usize {
        self.calls.lock().unwrap().reloads
    }

    fn reset(&self) {
        *self.calls.lock().unwrap() = Calls::default();
    }
}

#[async_trait]
impl ServiceManager for FakeManager {
    async fn start(&self, units: &[String], _cancel: &CancellationToken) -> Result<(), ManagerError> {
        self.calls.lock().unwrap().started.extend(units.iter().cloned());
        Ok(())
    }

    async fn stop(&self, _units: &[String], _cancel: &CancellationToken) -> Result<(), ManagerError> {
        Ok(())
    }

    async fn restart(&self, units: &[String], _cancel: &CancellationToken) -> Result<(), ManagerError> {
        self.calls.lock().unwrap().restarted.extend(units.iter().cloned());
        Ok(())
    }

    async fn reload(&self, _units: &[String], _cancel: &CancellationToken) -> Result<(), ManagerError> {
        Ok(())
    }

    async fn daemon_reload(&self, _cancel: &CancellationToken) -> Result<(), ManagerError> {
        self.calls.lock().unwrap().reloads += 1;
        Ok(())
    }

    async fn enable(&self, _units: &[String], _cancel: &CancellationToken) -> Result<(), ManagerError> {
        Ok(())
    }

    async fn disable(&self, _units: &[String], _cancel: &CancellationToken) -> Result<(), ManagerError> {
        Ok(())
    }
}

async fn git(dir: &Path, args: &[&str]) -> String {
    let out = tokio::process::Command::new("git").args(args).current_dir(dir).output().await.unwrap();
    assert!(out.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

async fn init_upstream(dir: &Path) {
    git(dir, &["init", "-q", "-b", "main"]).await;
    git(dir, &["config", "user.email", "a@b.c"]).await;
    git(dir, &["config", "user.name", "test"]).await;
}

async fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "."]).await;
    git(dir, &["commit", "-q", "-m", message]).await;
    git(dir, &["rev-parse", "HEAD"]).await
}

fn config(upstream: &Path, repository_dir: &Path, quadlet_dir: &Path, state_path: &Path) -> Config {
    Config {
        quadlet_dir: quadlet_dir.to_path_buf(),
        repository_dir: repository_dir.to_path_buf(),
        state_path: state_path.to_path_buf(),
        user_mode: true,
        verbose: false,
        repositories: vec![RepoDescriptor {
            name: "web".to_string(),
            url: upstream.to_string_lossy().to_string(),
            reference: String::new(),
            compose_subdir: String::new(),
        }],
    }
}

/// S1 through S5: a single evolving repository walked through first run,
/// an unchanged re-run, an image bump, a new dependent service, then that
/// service's removal.
#[tokio::test]
async fn s1_through_s5_evolving_repo() {
    let upstream = tempfile::tempdir().unwrap();
    init_upstream(upstream.path()).await;
    tokio::fs::write(upstream.path().join("compose.yaml"), "services:\n  api:\n    image: nginx:1.25\n").await.unwrap();
    let commit1 = commit_all(upstream.path(), "s1").await;

    let repo_dir = tempfile::tempdir().unwrap();
    let quadlet_dir = tempfile::tempdir().unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let state_path = state_dir.path().join("state.json");
    let cfg = config(upstream.path(), repo_dir.path(), quadlet_dir.path(), &state_path);
    let manager = Arc::new(FakeManager::default());
    let reconciler = Reconciler::new(cfg, manager.clone());
    let cancel = CancellationToken::new();

    // S1 - single service, first run.
    let outcome = reconciler.reconcile(&cancel).await;
    assert!(outcome.is_success(), "{:?}", outcome.repo_errors);
    let api_unit = quadlet_dir.path().join("web-api.container");
    let network_unit = quadlet_dir.path().join("web-default.network");
    assert!(api_unit.exists());
    assert!(network_unit.exists());
    let content = tokio::fs::read_to_string(&api_unit).await.unwrap();
    assert!(content.contains("Image=nginx:1.25"));
    assert!(content.contains("WantedBy=multi-user.target"));
    assert_eq!(manager.reloads(), 1);
    let mut started = manager.started();
    started.sort();
    assert_eq!(started, vec!["web-api.container".to_string(), "web-default.network".to_string()]);

    let state_json: serde_json::Value = serde_json::from_str(&tokio::fs::read_to_string(&state_path).await.unwrap()).unwrap();
    assert_eq!(state_json["repositories"]["web"]["current"], commit1);
    let managed: Vec<String> = state_json["managed_units"]["web"].as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();
    assert_eq!(managed.len(), 2);

    // S2 - unchanged re-run.
    manager.reset();
    let outcome = reconciler.reconcile(&cancel).await;
    assert!(outcome.is_success());
    assert_eq!(manager.reloads(), 0);
    assert!(manager.started().is_empty());
    assert!(manager.restarted().is_empty());

    // S3 - image bump.
    tokio::fs::write(upstream.path().join("compose.yaml"), "services:\n  api:\n    image: nginx:1.26\n").await.unwrap();
    commit_all(upstream.path(), "s3").await;
    manager.reset();
    let outcome = reconciler.reconcile(&cancel).await;
    assert!(outcome.is_success());
    let content = tokio::fs::read_to_string(&api_unit).await.unwrap();
    assert!(content.contains("Image=nginx:1.26"));
    assert_eq!(manager.reloads(), 1);
    assert_eq!(manager.restarted(), vec!["web-api.container".to_string()]);
    assert!(manager.started().is_empty());

    // S4 - add a dependent service.
    tokio::fs::write(
        upstream.path().join("compose.yaml"),
        "services:\n  api:\n    image: nginx:1.26\n  edge:\n    image: traefik\n    depends_on: [api]\n",
    )
    .await
    .unwrap();
    commit_all(upstream.path(), "s4").await;
    manager.reset();
    let outcome = reconciler.reconcile(&cancel).await;
    assert!(outcome.is_success());
    let edge_unit = quadlet_dir.path().join("web-edge.container");
    assert!(edge_unit.exists());
    assert_eq!(manager.reloads(), 1);
    assert_eq!(manager.started(), vec!["web-edge.container".to_string()]);
    assert!(manager.restarted().is_empty(), "api must not be restarted just because a dependent was added");

    // S5 - remove that service.
    tokio::fs::write(upstream.path().join("compose.yaml"), "services:\n  api:\n    image: nginx:1.26\n").await.unwrap();
    commit_all(upstream.path(), "s5").await;
    manager.reset();
    let outcome = reconciler.reconcile(&cancel).await;
    assert!(outcome.is_success());
    assert!(!edge_unit.exists());
    assert_eq!(manager.reloads(), 1);
    assert!(manager.started().is_empty());
    assert!(manager.restarted().is_empty());

    let state_json: serde_json::Value = serde_json::from_str(&tokio::fs::read_to_string(&state_path).await.unwrap()).unwrap();
    assert!(!state_json["unit_states"].as_object().unwrap().contains_key("web-edge.container"));
}

/// S6 - a bind-mounted file's content changes without the compose text
/// itself changing; the artifact is untouched but a restart still fires.
#[tokio::test]
async fn s6_bind_mount_file_change_triggers_restart_without_rewrite() {
    let upstream = tempfile::tempdir().unwrap();
    init_upstream(upstream.path()).await;
    tokio::fs::write(
        upstream.path().join("compose.yaml"),
        "services:\n  api:\n    image: nginx:1.25\n    volumes:\n      - ./config.yaml:/etc/app.yaml\n",
    )
    .await
    .unwrap();
    tokio::fs::write(upstream.path().join("config.yaml"), "key: value\n").await.unwrap();
    commit_all(upstream.path(), "s6-init").await;

    let repo_dir = tempfile::tempdir().unwrap();
    let quadlet_dir = tempfile::tempdir().unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let state_path = state_dir.path().join("state.json");
    let cfg = config(upstream.path(), repo_dir.path(), quadlet_dir.path(), &state_path);
    let manager = Arc::new(FakeManager::default());
    let reconciler = Reconciler::new(cfg, manager.clone());
    let cancel = CancellationToken::new();

    reconciler.reconcile(&cancel).await;
    let api_unit = quadlet_dir.path().join("web-api.container");
    let before = tokio::fs::read(&api_unit).await.unwrap();

    tokio::fs::write(upstream.path().join("config.yaml"), "key: changed\n").await.unwrap();
    commit_all(upstream.path(), "s6-change").await;
    manager.reset();
    let outcome = reconciler.reconcile(&cancel).await;
    assert!(outcome.is_success());

    let after = tokio::fs::read(&api_unit).await.unwrap();
    assert_eq!(before, after, "artifact text must be unchanged when only the bind-mounted file changed");
    assert_eq!(manager.restarted(), vec!["web-api.container".to_string()]);
}

/// S7 - cancelling after the first artifact write leaves the artifacts
/// written so far on disk and still saves state reflecting them.
#[tokio::test]
async fn s7_cancellation_mid_write_leaves_partial_state() {
    let upstream = tempfile::tempdir().unwrap();
    init_upstream(upstream.path()).await;
    tokio::fs::write(
        upstream.path().join("compose.yaml"),
        "services:\n  api:\n    image: nginx:1.25\n  edge:\n    image: traefik\n",
    )
    .await
    .unwrap();
    commit_all(upstream.path(), "s7").await;

    let repo_dir = tempfile::tempdir().unwrap();
    let quadlet_dir = tempfile::tempdir().unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let state_path = state_dir.path().join("state.json");
    let cfg = config(upstream.path(), repo_dir.path(), quadlet_dir.path(), &state_path);
    let manager = Arc::new(FakeManager::default());
    let reconciler = Arc::new(Reconciler::new(cfg, manager.clone()));

    let cancel = CancellationToken::new();
    let quadlet_path = quadlet_dir.path().to_path_buf();
    let watch_cancel = cancel.clone();
    let watcher = tokio::spawn(async move {
        for _ in 0..2000 {
            let mut entries = tokio::fs::read_dir(&quadlet_path).await.unwrap();
            if entries.next_entry().await.unwrap().is_some() {
                watch_cancel.cancel();
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    });

    let outcome = reconciler.reconcile(&cancel).await;
    watcher.await.unwrap();

    assert!(cancel.is_cancelled(), "the watcher must have observed at least one written artifact");
    assert!(!outcome.is_success(), "a cycle cut short by cancellation must not report success");
    let mut remaining = tokio::fs::read_dir(quadlet_dir.path()).await.unwrap();
    assert!(remaining.next_entry().await.unwrap().is_some(), "artifacts written before cancellation must remain on disk");
    assert!(tokio::fs::metadata(&state_path).await.is_ok(), "state must still be saved on a partial cycle");
}
