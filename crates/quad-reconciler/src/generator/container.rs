//! # Container Unit Generation
//!
//! Translates one compose service into a `.container` quadlet unit, including
//! the runtime-native argument fallback for features quadlet itself has no
//! first-class key for (spec §4.4: "resource constraints and capabilities/
//! devices/DNS/IPC/PID/shm/cgroup/storage-opt/MAC/runtime").

use crate::artifact::{Artifact, UnitKey, UnitType};
use crate::compose::{Service, StringOrList};
use crate::generator::env::{resolve_environment, resolve_labels};
use crate::generator::ini::IniDocument;
use crate::generator::secrets::{resolve_secrets, ResolvedSecretKind, SecretError};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("service {0:?} has no image and no build stanza")]
    MissingImage(String),
    #[error(transparent)]
    Secret(#[from] SecretError),
}

#[derive(Debug)]
pub struct ContainerInput<'a> {
    pub project_name: &'a str,
    pub service_name: &'a str,
    pub service: &'a Service,
    pub volume_names: &'a HashSet<String>,
    pub managed_by: &'a str,
}

/// Maps compose's `restart:` values onto the three policies the service
/// manager's `Restart=` key understands (spec §4.4).
pub fn restart_policy(restart: Option<&str>) -> &'static str {
    match restart {
        Some("on-failure") => "on-failure",
        Some("always" | "unless-stopped") => "always",
        Some("no") | None => "no",
        Some(other) => {
            warn!(policy = other, "unrecognized restart policy, defaulting to \"no\"");
            "no"
        }
    }
}

/// Resolves a `healthcheck.test` entry into the `HealthCmd` argv, applying
/// the `CMD`/`CMD-SHELL`/`NONE` rules and `${VAR}` substitution from the
/// service's resolved environment (spec §4.4).
pub fn health_cmd(test: &StringOrList, environment: &[(String, String)]) -> Option<Vec<String>> {
    let items = &test.0;
    match items.first().map(String::as_str) {
        None | Some("NONE") => None,
        Some("CMD" | "CMD-SHELL") => {
            Some(items.iter().map(|s| substitute_vars(s, environment)).collect())
        }
        _ => Some(
            std::iter::once("CMD-SHELL".to_string())
                .chain(items.iter().map(|s| substitute_vars(s, environment)))
                .collect(),
        ),
    }
}

fn substitute_vars(raw: &str, environment: &[(String, String)]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw.as_bytes()[i] == b'$' && raw[i..].starts_with("${") {
            if let Some(rel_end) = raw[i..].find('}') {
                let name = &raw[i + 2..i + rel_end];
                match environment.iter().find(|(k, _)| k == name) {
                    Some((_, v)) => out.push_str(v),
                    None => out.push_str(&raw[i..=i + rel_end]),
                }
                i += rel_end + 1;
                continue;
            }
        }
        let ch = raw[i..].chars().next().expect("i < raw.len()");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn rewrite_volume_ref(entry: &str, project_name: &str, volume_names: &HashSet<String>) -> String {
    let mut parts: Vec<&str> = entry.split(':').collect();
    if let Some(source) = parts.first().copied() {
        if volume_names.contains(source) {
            let key = UnitKey::new(&format!("{project_name}-{source}"), UnitType::Volume);
            let rewritten = key.as_str().to_string();
            parts[0] = &rewritten;
            return parts.join(":");
        }
    }
    entry.to_string()
}

/// Renders one `ulimits` entry as `name=soft[:hard]`, accepting both the
/// bare-number and `{soft, hard}` compose forms.
fn format_ulimit(name: &str, value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Mapping(map) => {
            let soft = map.get("soft").map(yaml_scalar_to_string);
            let hard = map.get("hard").map(yaml_scalar_to_string);
            match (soft, hard) {
                (Some(s), Some(h)) if s != h => format!("{name}={s}:{h}"),
                (Some(s), _) => format!("{name}={s}"),
                (None, Some(h)) => format!("{name}={h}"),
                (None, None) => format!("{name}=0"),
            }
        }
        other => format!("{name}={}", yaml_scalar_to_string(other)),
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

fn network_key(project_name: &str, name: &str) -> String {
    UnitKey::new(&format!("{project_name}-{name}"), UnitType::Network)
        .as_str()
        .to_string()
}

/// Runtime-native `PodmanArgs` built from compose fields quadlet has no
/// first-class key for. Each populated feature logs a warning naming the
/// feature and the service, per spec §4.4.
fn fallback_args(service: &Service, service_name: &str) -> Vec<String> {
    let mut args = Vec::new();
    let warn_feature = |feature: &str| {
        warn!(service = service_name, feature, "mapped through runtime-native PodmanArgs, no first-class unit key");
    };

    for cap in &service.cap_add {
        args.push(format!("--cap-add={cap}"));
    }
    if !service.cap_add.is_empty() {
        warn_feature("cap_add");
    }
    for cap in &service.cap_drop {
        args.push(format!("--cap-drop={cap}"));
    }
    if !service.cap_drop.is_empty() {
        warn_feature("cap_drop");
    }
    for device in &service.devices {
        args.push(format!("--device={device}"));
    }
    if !service.devices.is_empty() {
        warn_feature("devices");
    }
    for dns in &service.dns {
        args.push(format!("--dns={dns}"));
    }
    if !service.dns.is_empty() {
        warn_feature("dns");
    }
    for search in &service.dns_search {
        args.push(format!("--dns-search={search}"));
    }
    if !service.dns_search.is_empty() {
        warn_feature("dns_search");
    }
    if let Some(ipc) = &service.ipc {
        args.push(format!("--ipc={ipc}"));
        warn_feature("ipc");
    }
    if let Some(pid) = &service.pid {
        args.push(format!("--pid={pid}"));
        warn_feature("pid");
    }
    if let Some(shm) = &service.shm_size {
        args.push(format!("--shm-size={shm}"));
        warn_feature("shm_size");
    }
    if let Some(parent) = &service.cgroup_parent {
        args.push(format!("--cgroup-parent={parent}"));
        warn_feature("cgroup_parent");
    }
    for (k, v) in crate::generator::env::sorted_map(&service.storage_opt) {
        args.push(format!("--storage-opt={k}={v}"));
    }
    if !service.storage_opt.is_empty() {
        warn_feature("storage_opt");
    }
    if let Some(mac) = &service.mac_address {
        args.push(format!("--mac-address={mac}"));
        warn_feature("mac_address");
    }
    if let Some(runtime) = &service.runtime {
        args.push(format!("--runtime={runtime}"));
        warn_feature("runtime");
    }
    if let Some(userns) = &service.userns_mode {
        args.push(format!("--userns={userns}"));
        warn_feature("userns_mode");
    }
    if let Some(deploy) = &service.deploy {
        for (k, v) in crate::generator::env::sorted_map(&deploy.resources.limits) {
            args.push(format!("--{k}={v}"));
        }
        for (k, v) in crate::generator::env::sorted_map(&deploy.resources.reservations) {
            args.push(format!("--{k}-reservation={v}"));
        }
        if !deploy.resources.limits.is_empty() || !deploy.resources.reservations.is_empty() {
            warn_feature("resources");
        }
    }

    args.sort();
    args
}

pub fn generate(input: ContainerInput<'_>) -> Result<Artifact, ContainerError> {
    let ContainerInput { project_name, service_name, service, volume_names, managed_by } = input;

    if service.image.is_none() && service.build.is_none() {
        return Err(ContainerError::MissingImage(service_name.to_string()));
    }

    let environment = resolve_environment(&service.environment);
    let labels = resolve_labels(&service.labels, managed_by);
    let secrets = resolve_secrets(&service.secrets, &service.podman_env_secrets)?;

    let mut doc = IniDocument::new();
    doc.section("Unit").entry("Description", service_name);

    doc.section("Container");
    if let Some(image) = &service.image {
        doc.entry("Image", image);
    } else {
        doc.entry(
            "Image",
            UnitKey::new(&format!("{project_name}-{service_name}"), UnitType::Build).as_str(),
        );
    }
    if let Some(entrypoint) = &service.entrypoint {
        doc.entries("Entrypoint", entrypoint.0.iter().cloned());
    }
    if let Some(command) = &service.command {
        doc.entries("Exec", command.0.iter().cloned());
    }
    for (k, v) in &environment {
        doc.entry("Environment", format!("{k}={v}"));
    }
    let mut env_files = service.env_file.clone();
    env_files.sort();
    doc.entries("EnvironmentFile", env_files);

    let mut volumes: Vec<String> = service
        .volumes
        .iter()
        .map(|v| rewrite_volume_ref(v, project_name, volume_names))
        .collect();
    volumes.sort();
    doc.entries("Volume", volumes);

    let mut networks: Vec<String> = if service.networks.is_empty() {
        vec![network_key(project_name, "default")]
    } else {
        service.networks.iter().map(|n| network_key(project_name, n)).collect()
    };
    networks.sort();
    doc.entries("Network", networks);

    let mut ports = service.ports.clone();
    ports.sort();
    doc.entries("PublishPort", ports);

    if let Some(health) = &service.healthcheck {
        if !health.disable {
            if let Some(test) = &health.test {
                if let Some(cmd) = health_cmd(test, &environment) {
                    doc.entry("HealthCmd", cmd.join(" "));
                    if let Some(interval) = &health.interval {
                        doc.entry("HealthInterval", interval);
                    }
                    if let Some(timeout) = &health.timeout {
                        doc.entry("HealthTimeout", timeout);
                    }
                    if let Some(retries) = health.retries {
                        doc.entry("HealthRetries", retries.to_string());
                    }
                }
            }
        }
    }

    for secret in &secrets {
        let entry = match &secret.kind {
            ResolvedSecretKind::Mount { target, mode } => {
                format!("{},type=mount,target={},mode={:04o}", secret.source, target, mode)
            }
            ResolvedSecretKind::Env { env_var } => {
                format!("{},type=env,target={}", secret.source, env_var)
            }
        };
        doc.entry("Secret", entry);
    }

    if let Some(user) = &service.user {
        doc.entry("User", user);
    }
    if let Some(dir) = &service.working_dir {
        doc.entry("WorkingDir", dir);
    }
    if let Some(hostname) = &service.hostname {
        doc.entry("HostName", hostname);
    }
    if service.read_only {
        doc.entry("ReadOnly", "true");
    }
    if service.init {
        doc.entry("RunInit", "true");
    }
    if let Some(pod) = &service.podman_pod {
        doc.entry("Pod", UnitKey::new(&format!("{project_name}-{pod}"), UnitType::Pod).as_str());
    }

    let mut tmpfs = service.tmpfs.0.clone();
    tmpfs.sort();
    doc.entries("Tmpfs", tmpfs);

    for (k, v) in crate::generator::env::sorted_map(&service.sysctls) {
        doc.entry("Sysctl", format!("{k}={v}"));
    }

    let mut ulimits: Vec<String> = service.ulimits.iter().map(|(name, v)| format_ulimit(name, v)).collect();
    ulimits.sort();
    doc.entries("Ulimit", ulimits);

    if let Some(logging) = &service.logging {
        if let Some(driver) = &logging.driver {
            doc.entry("LogDriver", driver);
        }
        let mut log_opts: Vec<String> = logging.options.iter().map(|(k, v)| format!("{k}={v}")).collect();
        log_opts.sort();
        doc.entries("LogOpt", log_opts);
    }

    let args = fallback_args(service, service_name);
    doc.entries("PodmanArgs", args);

    for (k, v) in &labels {
        doc.entry("Label", format!("{k}={v}"));
    }

    doc.section("Service").entry("Restart", restart_policy(service.restart.as_deref()));
    doc.section("Install").entry("WantedBy", "multi-user.target");

    let key = UnitKey::new(&format!("{project_name}-{service_name}"), UnitType::Container);
    Ok(Artifact::new(key, doc.render().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_image(image: &str) -> Service {
        Service { image: Some(image.to_string()), ..Default::default() }
    }

    #[test]
    fn missing_image_and_build_is_an_error() {
        let service = Service::default();
        let result = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &HashSet::new(),
            managed_by: "quad-reconciler",
        });
        assert!(matches!(result, Err(ContainerError::MissingImage(s)) if s == "api"));
    }

    #[test]
    fn default_network_is_assigned_when_none_declared() {
        let service = service_with_image("nginx:1.25");
        let artifact = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &HashSet::new(),
            managed_by: "quad-reconciler",
        })
        .unwrap();
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("Network=web-default.network"));
        assert!(text.contains("Image=nginx:1.25"));
        assert_eq!(artifact.key.as_str(), "web-api.container");
    }

    #[test]
    fn managed_by_label_is_emitted_first() {
        let mut service = service_with_image("nginx:1.25");
        service.labels = crate::compose::EnvMap(
            [("team".to_string(), Some("platform".to_string()))].into_iter().collect(),
        );
        let artifact = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &HashSet::new(),
            managed_by: "quad-reconciler",
        })
        .unwrap();
        let text = String::from_utf8(artifact.content).unwrap();
        let managed_by_pos = text.find("Label=managed-by=quad-reconciler").unwrap();
        let team_pos = text.find("Label=team=platform").unwrap();
        assert!(managed_by_pos < team_pos);
    }

    #[test]
    fn volume_refs_are_namespaced_to_the_project() {
        let mut service = service_with_image("nginx:1.25");
        service.volumes = vec!["data:/var/lib/data".to_string(), "./cfg:/etc/cfg:ro".to_string()];
        let mut volume_names = HashSet::new();
        volume_names.insert("data".to_string());
        let artifact = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &volume_names,
            managed_by: "quad-reconciler",
        })
        .unwrap();
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("Volume=./cfg:/etc/cfg:ro"));
        assert!(text.contains("Volume=web-data.volume:/var/lib/data"));
    }

    #[test]
    fn cap_add_falls_back_to_podman_args_with_warning() {
        let mut service = service_with_image("nginx:1.25");
        service.cap_add = vec!["NET_ADMIN".to_string()];
        let artifact = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &HashSet::new(),
            managed_by: "quad-reconciler",
        })
        .unwrap();
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("PodmanArgs=--cap-add=NET_ADMIN"));
    }

    #[test]
    fn ulimits_render_as_sorted_native_entries() {
        let mut service = service_with_image("nginx:1.25");
        service.ulimits = [
            ("nofile".to_string(), serde_yaml::Value::from(1024)),
            (
                "nproc".to_string(),
                serde_yaml::Value::Mapping(
                    [
                        (serde_yaml::Value::from("soft"), serde_yaml::Value::from(65535)),
                        (serde_yaml::Value::from("hard"), serde_yaml::Value::from(65536)),
                    ]
                    .into_iter()
                    .collect(),
                ),
            ),
        ]
        .into_iter()
        .collect();
        let artifact = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &HashSet::new(),
            managed_by: "quad-reconciler",
        })
        .unwrap();
        let text = String::from_utf8(artifact.content).unwrap();
        let nofile_pos = text.find("Ulimit=nofile=1024").unwrap();
        let nproc_pos = text.find("Ulimit=nproc=65535:65536").unwrap();
        assert!(nofile_pos < nproc_pos, "ulimit entries must be sorted by name");
    }

    #[test]
    fn logging_driver_and_options_are_emitted() {
        let mut service = service_with_image("nginx:1.25");
        service.logging = Some(crate::compose::Logging {
            driver: Some("journald".to_string()),
            options: [("tag".to_string(), "web-api".to_string())].into_iter().collect(),
        });
        let artifact = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &HashSet::new(),
            managed_by: "quad-reconciler",
        })
        .unwrap();
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("LogDriver=journald"));
        assert!(text.contains("LogOpt=tag=web-api"));
    }

    #[test]
    fn userns_mode_falls_back_to_podman_args_with_warning() {
        let mut service = service_with_image("nginx:1.25");
        service.userns_mode = Some("keep-id".to_string());
        let artifact = generate(ContainerInput {
            project_name: "web",
            service_name: "api",
            service: &service,
            volume_names: &HashSet::new(),
            managed_by: "quad-reconciler",
        })
        .unwrap();
        let text = String::from_utf8(artifact.content).unwrap();
        assert!(text.contains("PodmanArgs=--userns=keep-id"));
    }

    #[test]
    fn health_cmd_substitutes_inline_vars() {
        let test = StringOrList(vec!["CMD-SHELL".to_string(), "curl ${HOST}/health".to_string()]);
        let env = vec![("HOST".to_string(), "localhost".to_string())];
        assert_eq!(
            health_cmd(&test, &env),
            Some(vec!["CMD-SHELL".to_string(), "curl localhost/health".to_string()])
        );
    }

    #[test]
    fn health_cmd_none_disables() {
        let test = StringOrList(vec!["NONE".to_string()]);
        assert_eq!(health_cmd(&test, &[]), None);
    }

    #[test]
    fn restart_policy_maps_unless_stopped_to_always() {
        assert_eq!(restart_policy(Some("unless-stopped")), "always");
        assert_eq!(restart_policy(None), "no");
    }
}
