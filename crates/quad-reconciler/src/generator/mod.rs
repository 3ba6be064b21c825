//! # Unit Generator
//!
//! Deterministic, side-effect-free translation of a [`ComposeProject`] into
//! the canonical, sorted set of quadlet [`Artifact`]s (spec §4.4).

pub mod build;
pub mod container;
pub mod env;
pub mod ini;
pub mod network;
pub mod secrets;
pub mod volume;

use crate::artifact::{Artifact, UnitKey, UnitType};
use crate::compose::ComposeProject;
use container::{ContainerError, ContainerInput};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Container(#[from] ContainerError),
}

const DEFAULT_NETWORK_NAME: &str = "default";

fn service_is_active(profiles: &[String], active_profiles: &HashSet<String>) -> bool {
    if profiles.is_empty() || active_profiles.is_empty() {
        return true;
    }
    profiles.iter().any(|p| active_profiles.contains(p))
}

/// Generates every artifact for one compose project: one `.container` per
/// active service, one `.volume` per declared volume, one `.network` per
/// referenced network (declared or the synthesized default), one `.build`
/// per build stanza, one `.image` per shared or `pull_policy: always`
/// image, and one `.pod` per `x-podman-pod` group. Output is sorted by
/// [`UnitKey`] for determinism.
pub fn generate_project(
    project: &ComposeProject,
    managed_by: &str,
    active_profiles: &HashSet<String>,
) -> Result<Vec<Artifact>, GenerateError> {
    let volume_names: HashSet<String> = project.volumes.keys().cloned().collect();
    let mut artifacts = Vec::new();

    let mut active_service_names: Vec<&String> = project
        .services
        .iter()
        .filter(|(_, svc)| service_is_active(&svc.profiles, active_profiles))
        .map(|(name, _)| name)
        .collect();
    active_service_names.sort();

    let mut image_counts: HashMap<&str, u32> = HashMap::new();
    for name in &active_service_names {
        let service = &project.services[*name];
        if let Some(image) = &service.image {
            *image_counts.entry(image.as_str()).or_default() += 1;
        }
    }

    let mut used_networks: HashSet<String> = HashSet::new();
    let mut pod_names: HashSet<String> = HashSet::new();
    let mut pulled_images: HashSet<String> = HashSet::new();

    for name in &active_service_names {
        let service = &project.services[*name];

        if service.networks.is_empty() {
            used_networks.insert(DEFAULT_NETWORK_NAME.to_string());
        } else {
            used_networks.extend(service.networks.iter().cloned());
        }
        if let Some(pod) = &service.podman_pod {
            pod_names.insert(pod.clone());
        }

        let container = container::generate(ContainerInput {
            project_name: &project.name,
            service_name: name,
            service,
            volume_names: &volume_names,
            managed_by,
        })?;
        artifacts.push(container);

        if let Some(build_spec) = &service.build {
            artifacts.push(build::generate(&project.name, name, build_spec, managed_by));
        }

        if let Some(image) = &service.image {
            let shared = image_counts.get(image.as_str()).copied().unwrap_or(0) >= 2;
            let pull_always = service.pull_policy.as_deref() == Some("always");
            if (shared || pull_always) && pulled_images.insert(image.clone()) {
                artifacts.push(generate_image(&project.name, image, managed_by));
            }
        }
    }

    used_networks.extend(project.networks.keys().cloned());
    let mut network_names: Vec<&String> = used_networks.iter().collect();
    network_names.sort();
    for name in network_names {
        let network_def = project.networks.get(name).cloned().unwrap_or_default();
        artifacts.push(network::generate(&project.name, name, &network_def, managed_by));
    }

    let mut volume_name_list: Vec<&String> = project.volumes.keys().collect();
    volume_name_list.sort();
    for name in volume_name_list {
        artifacts.push(volume::generate(&project.name, name, &project.volumes[name], managed_by));
    }

    let mut pod_name_list: Vec<&String> = pod_names.iter().collect();
    pod_name_list.sort();
    for name in pod_name_list {
        artifacts.push(generate_pod(&project.name, name, managed_by));
    }

    for (key, value) in &project.secrets {
        debug!(project = project.name, secret = key, file = ?value.file, "top-level secret declaration noted, content resolved per-service");
    }

    artifacts.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(artifacts)
}

fn generate_image(project_name: &str, image: &str, managed_by: &str) -> Artifact {
    let mut doc = ini::IniDocument::new();
    let name = image.replace(['/', ':'], "-");
    doc.section("Unit").entry("Description", format!("{project_name}-{name} pre-pull"));
    doc.section("Image").entry("Image", image);
    doc.entry("Label", format!("managed-by={managed_by}"));
    doc.section("Install").entry("WantedBy", "multi-user.target");
    let key = UnitKey::new(&format!("{project_name}-{name}"), UnitType::Image);
    Artifact::new(key, doc.render().into_bytes())
}

fn generate_pod(project_name: &str, pod_name: &str, managed_by: &str) -> Artifact {
    let mut doc = ini::IniDocument::new();
    doc.section("Unit").entry("Description", format!("{project_name}-{pod_name} pod"));
    let pod_key = UnitKey::new(&format!("{project_name}-{pod_name}"), UnitType::Pod);
    doc.section("Pod").entry("PodName", pod_key.as_str());
    doc.entry("Label", format!("managed-by={managed_by}"));
    doc.section("Install").entry("WantedBy", "multi-user.target");
    Artifact::new(pod_key, doc.render().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::Service;

    fn project_with_one_service() -> ComposeProject {
        let mut project = ComposeProject { name: "web".to_string(), ..Default::default() };
        project.services.insert(
            "api".to_string(),
            Service { image: Some("nginx:1.25".to_string()), ..Default::default() },
        );
        project
    }

    #[test]
    fn generates_container_and_default_network() {
        let project = project_with_one_service();
        let artifacts = generate_project(&project, "quad-reconciler", &HashSet::new()).unwrap();
        let keys: Vec<&str> = artifacts.iter().map(|a| a.key.as_str()).collect();
        assert!(keys.contains(&"web-api.container"));
        assert!(keys.contains(&"web-default.network"));
    }

    #[test]
    fn output_is_sorted_by_unit_key() {
        let project = project_with_one_service();
        let artifacts = generate_project(&project, "quad-reconciler", &HashSet::new()).unwrap();
        let mut sorted = artifacts.clone().into_iter().map(|a| a.key).collect::<Vec<_>>();
        sorted.sort();
        assert_eq!(artifacts.into_iter().map(|a| a.key).collect::<Vec<_>>(), sorted);
    }

    #[test]
    fn inactive_profile_service_is_excluded_entirely() {
        let mut project = project_with_one_service();
        project.services.get_mut("api").unwrap().profiles = vec!["debug".to_string()];
        let active: HashSet<String> = ["release".to_string()].into_iter().collect();
        let artifacts = generate_project(&project, "quad-reconciler", &active).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn shared_image_gets_a_pre_pull_unit() {
        let mut project = ComposeProject { name: "web".to_string(), ..Default::default() };
        project.services.insert(
            "a".to_string(),
            Service { image: Some("alpine:3".to_string()), ..Default::default() },
        );
        project.services.insert(
            "b".to_string(),
            Service { image: Some("alpine:3".to_string()), ..Default::default() },
        );
        let artifacts = generate_project(&project, "quad-reconciler", &HashSet::new()).unwrap();
        let image_units: Vec<_> = artifacts.iter().filter(|a| a.key.unit_type() == Some(UnitType::Image)).collect();
        assert_eq!(image_units.len(), 1);
    }

    #[test]
    fn missing_image_fails_the_project() {
        let mut project = ComposeProject { name: "web".to_string(), ..Default::default() };
        project.services.insert("broken".to_string(), Service::default());
        let result = generate_project(&project, "quad-reconciler", &HashSet::new());
        assert!(matches!(result, Err(GenerateError::Container(ContainerError::MissingImage(_)))));
    }
}
