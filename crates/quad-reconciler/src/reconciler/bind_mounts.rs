//! # Bind-Mount Hashing
//!
//! Hashes the host-side file behind each bind-mount volume entry so
//! external changes to that file (not to the generated artifact text)
//! still trigger a restart (spec §4.8 step 2b, §8 scenario S6).

use crate::compose::{ComposeProject, Service};
use crate::hash::ContentHash;
use std::collections::HashMap;
use std::path::Path;

/// For one service, the `{hostPath → hash}` map for every bind-mount
/// (non-named-volume) entry in its `volumes:` list. Relative host paths
/// are resolved against `project_dir`. A referenced path that is missing
/// or not a regular file hashes to the empty hash.
#[must_use]
pub fn bind_mount_hashes(project_dir: &Path, project: &ComposeProject, service: &Service) -> HashMap<String, ContentHash> {
    let mut out = HashMap::new();
    for entry in &service.volumes {
        let Some(source) = entry.split(':').next() else { continue };
        if project.volumes.contains_key(source) {
            continue;
        }
        if !is_host_path(source) {
            continue;
        }
        let resolved = if Path::new(source).is_absolute() {
            Path::new(source).to_path_buf()
        } else {
            project_dir.join(source)
        };
        let hash = match std::fs::metadata(&resolved) {
            Ok(meta) if meta.is_file() => std::fs::read(&resolved).map_or_else(|_| ContentHash::of_empty(), |b| ContentHash::of(&b)),
            _ => ContentHash::of_empty(),
        };
        out.insert(source.to_string(), hash);
    }
    out
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('.') || source.starts_with('/') || source.starts_with('~')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_an_existing_bind_mounted_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), b"key: value\n").unwrap();

        let project = ComposeProject { name: "web".to_string(), ..Default::default() };
        let service = Service { volumes: vec!["./config.yaml:/etc/app.yaml".to_string()], ..Default::default() };

        let hashes = bind_mount_hashes(dir.path(), &project, &service);
        assert_eq!(hashes.get("./config.yaml"), Some(&ContentHash::of(b"key: value\n")));
    }

    #[test]
    fn missing_file_hashes_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let project = ComposeProject { name: "web".to_string(), ..Default::default() };
        let service = Service { volumes: vec!["./missing.yaml:/etc/app.yaml".to_string()], ..Default::default() };

        let hashes = bind_mount_hashes(dir.path(), &project, &service);
        assert_eq!(hashes.get("./missing.yaml"), Some(&ContentHash::of_empty()));
    }

    #[test]
    fn named_volume_refs_are_not_treated_as_bind_mounts() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = ComposeProject { name: "web".to_string(), ..Default::default() };
        project.volumes.insert("data".to_string(), crate::compose::VolumeDef::default());
        let service = Service { volumes: vec!["data:/var/lib/data".to_string()], ..Default::default() };

        let hashes = bind_mount_hashes(dir.path(), &project, &service);
        assert!(hashes.is_empty());
    }
}
