//! # Reconciler
//!
//! The apex orchestration: sync → generate → diff → write → delete
//! orphans → daemon-reload → dependency-ordered restart → state commit
//! (spec §4.8). Every step's failures are collected and returned as one
//! aggregate error; a single repo's failure never aborts the cycle for
//! the others.

pub mod bind_mounts;

use crate::artifact::{Artifact, ArtifactStore, UnitKey, UnitType};
use crate::compose::{self, ComposeProject};
use crate::config::{Config, RepoDescriptor};
use crate::depgraph::{self, DependencyGraph};
use crate::generator;
use crate::git::{GitSyncer, SyncResult};
use crate::manager::ServiceManager;
use crate::state::{State, StateStore, UnitState};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub const MANAGED_BY: &str = "quad-reconciler";

/// Outcome of one reconcile cycle, mapping onto the exit codes named in
/// spec §6 (CLI wiring is a caller concern; only the mapping lives here).
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub config_error: bool,
    pub repo_errors: Vec<String>,
    pub fatal_error: Option<String>,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.fatal_error.is_some() {
            4
        } else if self.config_error {
            1
        } else if !self.repo_errors.is_empty() {
            3
        } else {
            0
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

struct RepoProcessResult {
    wrote_any: bool,
    deleted_any: bool,
    restart_plan: Option<RestartPlan>,
}

struct RestartPlan {
    repo: String,
    graph: DependencyGraph,
    new_keys: Vec<UnitKey>,
    modified_keys: Vec<UnitKey>,
}

pub struct Reconciler {
    config: Config,
    git: GitSyncer,
    store: ArtifactStore,
    state_store: StateStore,
    manager: Arc<dyn ServiceManager>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(config: Config, manager: Arc<dyn ServiceManager>) -> Self {
        let git = GitSyncer::new(config.repository_dir.clone());
        let store = ArtifactStore::new(config.quadlet_dir.clone());
        let state_store = StateStore::new(config.state_path.clone());
        Self { config, git, store, state_store, manager }
    }

    pub async fn reconcile(&self, cancel: &CancellationToken) -> ReconcileOutcome {
        if let Err(e) = self.config.validate() {
            return ReconcileOutcome { config_error: true, repo_errors: vec![e.to_string()], ..Default::default() };
        }

        let mut state = match self.state_store.load().await {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to load state, aborting cycle");
                return ReconcileOutcome { fatal_error: Some(e.to_string()), ..Default::default() };
            }
        };

        let mut outcome = ReconcileOutcome::default();
        let sync_results = self
            .git
            .sync_all(&self.config.repositories, cancel)
            .instrument(info_span!("sync_all"))
            .await;

        let mut any_write = false;
        let mut any_delete = false;
        let mut restart_plans = Vec::new();

        for result in &sync_results {
            if !result.success {
                outcome.repo_errors.push(format!("sync {}: {}", result.repo, result.err.clone().unwrap_or_default()));
                continue;
            }
            let Some(descriptor) = self.config.repositories.iter().find(|r| r.name == result.repo) else {
                continue;
            };
            match self
                .process_repo(descriptor, result, &mut state, cancel)
                .instrument(info_span!("process_repo", repo = %descriptor.name))
                .await
            {
                Ok(processed) => {
                    any_write |= processed.wrote_any;
                    any_delete |= processed.deleted_any;
                    restart_plans.extend(processed.restart_plan);
                }
                Err(e) => outcome.repo_errors.push(format!("repo {}: {e}", result.repo)),
            }
        }

        let mut reload_failed = false;
        if any_write || any_delete {
            info!("artifacts changed, issuing daemon-reload");
            if let Err(e) = self.manager.daemon_reload(cancel).await {
                outcome.repo_errors.push(format!("daemon-reload: {e}"));
                reload_failed = true;
            }
        }
        if !reload_failed {
            // A bind-mount-only change (spec §8 S6) issues a restart with
            // no unit file write and hence no daemon-reload requirement.
            for plan in &restart_plans {
                if let Err(e) = self.apply_restarts(plan, cancel).await {
                    outcome.repo_errors.push(format!("restart in {}: {e}", plan.repo));
                }
            }
        }

        if let Err(e) = self.state_store.save(&state).await {
            error!(error = %e, "failed to save state");
            outcome.repo_errors.push(format!("state save: {e}"));
        }

        outcome
    }

    async fn process_repo(
        &self,
        repo: &RepoDescriptor,
        sync_result: &SyncResult,
        state: &mut State,
        cancel: &CancellationToken,
    ) -> anyhow::Result<RepoProcessResult> {
        let repo_path = self.git.repo_path(repo);
        let compose_dir = repo_path.join(&repo.compose_subdir);
        let projects = compose::parse::discover_projects(&compose_dir)?;

        let previous_managed: HashSet<UnitKey> = state.get_managed_units(&repo.name).into_iter().collect();
        let mut all_artifacts: Vec<Artifact> = Vec::new();
        let mut new_unit_states: HashMap<UnitKey, UnitState> = HashMap::new();
        let mut combined_graph = DependencyGraph::new();
        let active_profiles = HashSet::new();

        for project in &projects {
            let artifacts = generator::generate_project(project, MANAGED_BY, &active_profiles)?;
            let graph = build_dependency_graph(project, &active_profiles);
            merge_graph(&mut combined_graph, &graph);

            for artifact in &artifacts {
                let bind_mount_hashes = unit_bind_mount_hashes(&compose_dir, project, artifact);
                new_unit_states.insert(
                    artifact.key.clone(),
                    UnitState { content_hash: artifact.hash, bind_mount_hashes },
                );
            }
            all_artifacts.extend(artifacts);
        }

        let new_keys: HashSet<UnitKey> = all_artifacts.iter().map(|a| a.key.clone()).collect();
        let new_set: Vec<UnitKey> = new_keys.iter().filter(|k| !previous_managed.contains(k)).cloned().collect();
        let modified_set = state.changed_units(&new_unit_states);

        let written = self.store.write(&all_artifacts, cancel).await?;
        debug!(written = written.len(), "wrote artifacts for repo");

        let orphans: Vec<UnitKey> = previous_managed.difference(&new_keys).cloned().collect();
        let orphan_paths: Vec<std::path::PathBuf> = orphans.iter().map(|k| std::path::PathBuf::from(k.as_str())).collect();
        if !orphan_paths.is_empty() {
            self.store.delete(&orphan_paths, cancel).await?;
        }

        for (key, unit_state) in &new_unit_states {
            state.set_unit_state(key, unit_state.clone());
        }
        let mut sorted_keys: Vec<UnitKey> = new_keys.iter().cloned().collect();
        sorted_keys.sort();
        state.set_managed_units(&repo.name, &sorted_keys);
        state.set_commit(&repo.name, &sync_result.commit_hash);
        for orphan in &orphans {
            state.remove_unit_state(orphan);
        }

        let restart_plan = (!new_set.is_empty() || !modified_set.is_empty()).then(|| RestartPlan {
            repo: repo.name.clone(),
            graph: combined_graph,
            new_keys: new_set,
            modified_keys: modified_set,
        });

        Ok(RepoProcessResult { wrote_any: !written.is_empty(), deleted_any: !orphans.is_empty(), restart_plan })
    }

    async fn apply_restarts(&self, plan: &RestartPlan, cancel: &CancellationToken) -> anyhow::Result<()> {
        let order = plan.graph.topological_order()?;
        let changed: HashSet<&UnitKey> = plan.new_keys.iter().chain(plan.modified_keys.iter()).collect();
        let new_set: HashSet<&UnitKey> = plan.new_keys.iter().collect();

        let mut restarted = HashSet::new();
        let mut errors = Vec::new();

        for key in order.iter().filter(|k| changed.contains(k)) {
            if depgraph::is_service_already_restarted(key, &plan.graph, &restarted) {
                debug!(unit = %key, "already covered by a restarted dependency, skipping");
                continue;
            }
            let unit_name = key.as_str().to_string();
            let result = if new_set.contains(key) {
                self.manager.start(&[unit_name], cancel).await
            } else {
                self.manager.restart(&[unit_name], cancel).await
            };
            match result {
                Ok(()) => depgraph::mark_dependents_as_restarted(key, &plan.graph, &mut restarted),
                Err(e) => {
                    warn!(unit = %key, error = %e, "unit operation failed");
                    errors.push(format!("{key}: {e}"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(errors.join("; ")))
        }
    }
}

fn unit_bind_mount_hashes(
    compose_dir: &Path,
    project: &ComposeProject,
    artifact: &Artifact,
) -> HashMap<String, crate::hash::ContentHash> {
    if artifact.key.unit_type() != Some(UnitType::Container) {
        return HashMap::new();
    }
    let Some((_, service_name)) = artifact.key.split_project_prefix() else {
        return HashMap::new();
    };
    let Some(service) = project.services.get(service_name) else {
        return HashMap::new();
    };
    bind_mounts::bind_mount_hashes(compose_dir, project, service)
}

fn build_dependency_graph(project: &ComposeProject, active_profiles: &HashSet<String>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    let volume_names: HashSet<&String> = project.volumes.keys().collect();

    for (name, service) in &project.services {
        if !service.profiles.is_empty() && !active_profiles.is_empty() && !service.profiles.iter().any(|p| active_profiles.contains(p)) {
            continue;
        }
        let key = UnitKey::new(&format!("{}-{name}", project.name), UnitType::Container);
        graph.add_node(&key);

        for dep in &service.depends_on {
            let dep_key = UnitKey::new(&format!("{}-{dep}", project.name), UnitType::Container);
            graph.add_service_edge(&key, &dep_key);
        }
        for volume_ref in &service.volumes {
            if let Some(source) = volume_ref.split(':').next() {
                if volume_names.contains(&source.to_string()) {
                    let volume_key = UnitKey::new(&format!("{}-{source}", project.name), UnitType::Volume);
                    graph.add_edge(&key, &volume_key);
                }
            }
        }
        let networks: Vec<String> = if service.networks.is_empty() {
            vec!["default".to_string()]
        } else {
            service.networks.clone()
        };
        for network in networks {
            let network_key = UnitKey::new(&format!("{}-{network}", project.name), UnitType::Network);
            graph.add_edge(&key, &network_key);
        }
    }
    graph
}

fn merge_graph(target: &mut DependencyGraph, source: &DependencyGraph) {
    for key in source.nodes_iter() {
        target.add_node(key);
        for dep in source.deps_of(key) {
            target.add_edge(key, dep);
        }
        for dep in source.service_deps_of(key) {
            target.add_service_edge(key, dep);
        }
    }
}
