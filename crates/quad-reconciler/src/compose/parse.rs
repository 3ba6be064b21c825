//! # Compose Discovery and Loading
//!
//! Recursive YAML discovery under a repo's compose subdirectory, one
//! [`ComposeProject`] per directory (mirroring `docker compose`'s
//! convention that a project is one directory's worth of
//! `docker-compose.yml`/`compose.yaml` plus overrides).

use super::{ComposeFile, ComposeProject, EnvMap};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: std::path::PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

fn is_compose_file(file_name: &str) -> bool {
    matches!(
        file_name,
        "docker-compose.yml"
            | "docker-compose.yaml"
            | "compose.yml"
            | "compose.yaml"
    ) || file_name.ends_with(".compose.yml")
        || file_name.ends_with(".compose.yaml")
}

/// Discovers every compose file under `root` and groups them into one
/// [`ComposeProject`] per containing directory, named after that
/// directory's basename.
pub fn discover_projects(root: &Path) -> Result<Vec<ComposeProject>, ParseError> {
    let mut by_dir: std::collections::BTreeMap<std::path::PathBuf, ComposeProject> =
        std::collections::BTreeMap::new();

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "skipping unreadable path during compose discovery");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_compose_file(file_name) {
            continue;
        }
        let path = entry.path();
        let file = load_compose_file(path)?;
        let dir = path.parent().unwrap_or(root).to_path_buf();
        let project_name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("default")
            .to_string();
        by_dir
            .entry(dir)
            .or_insert_with(|| ComposeProject {
                name: project_name,
                ..Default::default()
            })
            .merge(file);
    }

    for (dir, project) in &mut by_dir {
        for service in project.services.values_mut() {
            resolve_env_files(dir, service);
        }
    }

    Ok(by_dir.into_values().collect())
}

/// Reads each of a service's `env_file:` entries relative to its
/// project directory and merges them into `environment:`, so that
/// `${VAR}` dereferencing elsewhere sees env-file-sourced values too
/// (spec §4.8: env files must be loaded before generation). Inline
/// `environment:` entries win over same-named env-file entries,
/// matching compose's own precedence.
fn resolve_env_files(dir: &Path, service: &mut super::Service) {
    if service.env_file.is_empty() {
        return;
    }
    let mut merged = std::collections::HashMap::new();
    for rel in &service.env_file {
        let path = dir.join(rel);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable env_file");
                continue;
            }
        };
        for (key, value) in parse_env_file(&text) {
            merged.insert(key, value);
        }
    }
    merged.extend(service.environment.0.drain());
    service.environment = EnvMap(merged);
}

fn parse_env_file(text: &str) -> Vec<(String, Option<String>)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match line.split_once('=') {
            Some((key, value)) => Some((key.trim().to_string(), Some(value.trim().to_string()))),
            None => Some((line.to_string(), None)),
        })
        .collect()
}

fn load_compose_file(path: &Path) -> Result<ComposeFile, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ComposeFile = serde_yaml::from_str(&text).map_err(|source| ParseError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    if !file.extra.is_empty() {
        debug!(path = %path.display(), unknown_keys = ?file.extra.keys().collect::<Vec<_>>(), "ignoring unknown top-level compose keys");
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_one_project_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        let web_dir = dir.path().join("web");
        std::fs::create_dir_all(&web_dir).unwrap();
        std::fs::write(
            web_dir.join("docker-compose.yml"),
            "services:\n  api:\n    image: nginx:1.25\n",
        )
        .unwrap();

        let projects = discover_projects(dir.path()).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "web");
        assert!(projects[0].services.contains_key("api"));
    }

    #[test]
    fn merges_multiple_files_in_the_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("compose.yaml"),
            "services:\n  api:\n    image: nginx\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("compose.override.compose.yaml"),
            "services:\n  edge:\n    image: traefik\n",
        )
        .unwrap();

        let projects = discover_projects(dir.path()).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].services.len(), 2);
    }

    #[test]
    fn env_file_entries_are_merged_with_inline_environment_taking_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "FOO=from-file\nBAR=also-from-file\n").unwrap();
        std::fs::write(
            dir.path().join("compose.yaml"),
            "services:\n  api:\n    image: nginx\n    env_file:\n      - .env\n    environment:\n      - FOO=from-inline\n",
        )
        .unwrap();

        let projects = discover_projects(dir.path()).unwrap();
        let service = &projects[0].services["api"];
        assert_eq!(service.environment.0.get("FOO"), Some(&Some("from-inline".to_string())));
        assert_eq!(service.environment.0.get("BAR"), Some(&Some("also-from-file".to_string())));
    }
}
