//! # Compose Model
//!
//! Explicit records for the compose-spec subset named in spec §6. Unknown
//! top-level keys on any type are captured into `extra` and logged at
//! DEBUG rather than silently dropped (Design Notes: "Dynamic reflection
//! over compose types" → "model the compose subset as explicit records;
//! unknown keys are warnings, not silent drops").

pub mod parse;

use serde::Deserialize;
use std::collections::HashMap;

/// One compose document's worth of services/volumes/networks/secrets.
/// Several documents sharing a project name are merged by the caller
/// into a [`ComposeProject`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComposeFile {
    #[serde(default)]
    pub services: HashMap<String, Service>,
    #[serde(default)]
    pub volumes: HashMap<String, VolumeDef>,
    #[serde(default)]
    pub networks: HashMap<String, NetworkDef>,
    #[serde(default)]
    pub secrets: HashMap<String, SecretDef>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

/// A named group of services/volumes/networks/secrets loaded from one or
/// more compose documents sharing a project name.
#[derive(Debug, Clone, Default)]
pub struct ComposeProject {
    pub name: String,
    pub services: HashMap<String, Service>,
    pub volumes: HashMap<String, VolumeDef>,
    pub networks: HashMap<String, NetworkDef>,
    pub secrets: HashMap<String, SecretDef>,
}

impl ComposeProject {
    pub fn merge(&mut self, file: ComposeFile) {
        self.services.extend(file.services);
        self.volumes.extend(file.volumes);
        self.networks.extend(file.networks);
        self.secrets.extend(file.secrets);
    }
}

/// A value that may appear as a bare string or as a list of strings in
/// YAML (`command: foo` vs `command: [foo, bar]`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringOrList(pub Vec<String>);

impl<'de> Deserialize<'de> for StringOrList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(s) => StringOrList(vec![s]),
            Repr::Many(v) => StringOrList(v),
        })
    }
}

/// `environment`/`labels`-style fields that may be a `KEY=VALUE` list or
/// a `{KEY: VALUE}` map. Values of `None` mean "unset" (dereferenced from
/// the process environment) per spec §4.4.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap(pub HashMap<String, Option<String>>);

impl<'de> Deserialize<'de> for EnvMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<String>),
            Map(HashMap<String, Option<String>>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::List(items) => {
                let mut map = HashMap::new();
                for item in items {
                    match item.split_once('=') {
                        Some((k, v)) => {
                            map.insert(k.to_string(), Some(v.to_string()));
                        }
                        None => {
                            map.insert(item, None);
                        }
                    }
                }
                EnvMap(map)
            }
            Repr::Map(map) => EnvMap(map),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSpec {
    pub context: Option<String>,
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub args: EnvMap,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Healthcheck {
    pub test: Option<StringOrList>,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub retries: Option<u32>,
    #[serde(default)]
    pub disable: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServiceSecret {
    Short(String),
    Long {
        source: String,
        target: Option<String>,
        mode: Option<u32>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeployResources {
    #[serde(default)]
    pub limits: HashMap<String, String>,
    #[serde(default)]
    pub reservations: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Deploy {
    #[serde(default)]
    pub resources: DeployResources,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub driver: Option<String>,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Service {
    pub image: Option<String>,
    pub build: Option<BuildSpec>,
    pub command: Option<StringOrList>,
    pub entrypoint: Option<StringOrList>,
    #[serde(default)]
    pub environment: EnvMap,
    #[serde(default)]
    pub env_file: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub healthcheck: Option<Healthcheck>,
    pub restart: Option<String>,
    #[serde(default)]
    pub secrets: Vec<ServiceSecret>,
    pub deploy: Option<Deploy>,
    #[serde(default)]
    pub cap_add: Vec<String>,
    #[serde(default)]
    pub cap_drop: Vec<String>,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub dns_search: Vec<String>,
    pub ipc: Option<String>,
    pub pid: Option<String>,
    pub shm_size: Option<String>,
    pub cgroup_parent: Option<String>,
    #[serde(default)]
    pub storage_opt: HashMap<String, String>,
    pub mac_address: Option<String>,
    pub runtime: Option<String>,
    #[serde(default)]
    pub init: bool,
    pub user: Option<String>,
    pub working_dir: Option<String>,
    pub hostname: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub ulimits: HashMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub sysctls: HashMap<String, String>,
    #[serde(default)]
    pub tmpfs: StringOrList,
    pub userns_mode: Option<String>,
    pub logging: Option<Logging>,
    #[serde(default)]
    pub labels: EnvMap,
    #[serde(default)]
    pub profiles: Vec<String>,
    pub pull_policy: Option<String>,
    /// `x-podman-env-secrets`: `{secretName→envVarName}`.
    #[serde(rename = "x-podman-env-secrets", default)]
    pub podman_env_secrets: HashMap<String, String>,
    /// `x-podman-pod`: group this service into a shared pod unit.
    #[serde(rename = "x-podman-pod", default)]
    pub podman_pod: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeDef {
    pub driver: Option<String>,
    #[serde(default)]
    pub driver_opts: HashMap<String, String>,
    #[serde(default)]
    pub labels: EnvMap,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ipam {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub config: Vec<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkDef {
    pub driver: Option<String>,
    pub ipam: Option<Ipam>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub enable_ipv6: bool,
    #[serde(default)]
    pub labels: EnvMap,
    #[serde(default)]
    pub options: HashMap<String, String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretDef {
    pub file: Option<String>,
    pub environment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_accepts_list_or_map() {
        let file: ComposeFile = serde_yaml::from_str(
            "services:\n  api:\n    image: nginx\n    environment:\n      - FOO=bar\n      - BAZ\n",
        )
        .unwrap();
        let env = &file.services["api"].environment.0;
        assert_eq!(env.get("FOO"), Some(&Some("bar".to_string())));
        assert_eq!(env.get("BAZ"), Some(&None));
    }

    #[test]
    fn command_accepts_bare_string() {
        let file: ComposeFile =
            serde_yaml::from_str("services:\n  api:\n    image: nginx\n    command: run\n").unwrap();
        assert_eq!(file.services["api"].command.as_ref().unwrap().0, vec!["run"]);
    }

    #[test]
    fn unknown_keys_are_captured_not_dropped() {
        let file: ComposeFile = serde_yaml::from_str(
            "services:\n  api:\n    image: nginx\nx-something-unknown:\n  foo: bar\n",
        )
        .unwrap();
        assert!(file.extra.contains_key("x-something-unknown"));
    }
}
