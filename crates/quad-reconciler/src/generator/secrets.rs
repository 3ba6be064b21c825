//! # Secret Resolution
//!
//! Resolves a service's `secrets:` entries (file-backed, mount-style) and
//! its `x-podman-env-secrets` extension (env-style) into the canonical,
//! sorted secret directive list. Structural problems (empty name, null
//! bytes, path traversal, non-absolute target) are errors per spec §9's
//! Open Question resolution; stylistic ones (length, DNS conformance)
//! are warnings only.

use crate::compose::ServiceSecret;
use std::collections::HashMap;
use tracing::warn;

pub const DEFAULT_SECRET_MODE: u32 = 0o644;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolvedSecretKind {
    Mount { target: String, mode: u32 },
    Env { env_var: String },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedSecret {
    pub source: String,
    pub kind: ResolvedSecretKind,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret name is empty")]
    EmptyName,
    #[error("secret {0:?} name contains a null byte")]
    NullByte(String),
    #[error("secret {0:?} target {1:?} escapes its mount point")]
    PathTraversal(String, String),
    #[error("secret {0:?} target {1:?} must be an absolute path")]
    NonAbsoluteTarget(String, String),
}

fn validate_name(name: &str) -> Result<(), SecretError> {
    if name.is_empty() {
        return Err(SecretError::EmptyName);
    }
    if name.contains('\0') {
        return Err(SecretError::NullByte(name.to_string()));
    }
    if name.len() > 253 {
        warn!(secret = name, "secret name exceeds 253 characters");
    }
    Ok(())
}

fn validate_target(source: &str, target: &str) -> Result<(), SecretError> {
    if !target.starts_with('/') {
        return Err(SecretError::NonAbsoluteTarget(source.to_string(), target.to_string()));
    }
    if target.split('/').any(|segment| segment == "..") {
        return Err(SecretError::PathTraversal(source.to_string(), target.to_string()));
    }
    Ok(())
}

/// Resolves the mount-style `secrets:` list and the `x-podman-env-secrets`
/// map into one sorted, validated list. Sort order is `(source, target,
/// kind)` per spec §4.4.
pub fn resolve_secrets(
    mount_secrets: &[ServiceSecret],
    env_secrets: &HashMap<String, String>,
) -> Result<Vec<ResolvedSecret>, SecretError> {
    let mut out = Vec::new();

    for secret in mount_secrets {
        let (source, target, mode) = match secret {
            ServiceSecret::Short(source) => {
                (source.clone(), format!("/run/secrets/{source}"), DEFAULT_SECRET_MODE)
            }
            ServiceSecret::Long { source, target, mode } => (
                source.clone(),
                target.clone().unwrap_or_else(|| format!("/run/secrets/{source}")),
                mode.unwrap_or(DEFAULT_SECRET_MODE),
            ),
        };
        validate_name(&source)?;
        validate_target(&source, &target)?;
        out.push(ResolvedSecret {
            source,
            kind: ResolvedSecretKind::Mount { target, mode },
        });
    }

    for (source, env_var) in env_secrets {
        validate_name(source)?;
        out.push(ResolvedSecret {
            source: source.clone(),
            kind: ResolvedSecretKind::Env { env_var: env_var.clone() },
        });
    }

    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_defaults_target_and_mode() {
        let secrets = vec![ServiceSecret::Short("api-key".to_string())];
        let resolved = resolve_secrets(&secrets, &HashMap::new()).unwrap();
        assert_eq!(
            resolved[0],
            ResolvedSecret {
                source: "api-key".to_string(),
                kind: ResolvedSecretKind::Mount {
                    target: "/run/secrets/api-key".to_string(),
                    mode: DEFAULT_SECRET_MODE,
                },
            }
        );
    }

    #[test]
    fn rejects_non_absolute_target() {
        let secrets = vec![ServiceSecret::Long {
            source: "api-key".to_string(),
            target: Some("relative/path".to_string()),
            mode: None,
        }];
        assert_eq!(
            resolve_secrets(&secrets, &HashMap::new()),
            Err(SecretError::NonAbsoluteTarget("api-key".to_string(), "relative/path".to_string()))
        );
    }

    #[test]
    fn rejects_path_traversal() {
        let secrets = vec![ServiceSecret::Long {
            source: "api-key".to_string(),
            target: Some("/run/secrets/../etc/passwd".to_string()),
            mode: None,
        }];
        assert!(matches!(
            resolve_secrets(&secrets, &HashMap::new()),
            Err(SecretError::PathTraversal(..))
        ));
    }

    #[test]
    fn rejects_empty_name() {
        let secrets = vec![ServiceSecret::Short(String::new())];
        assert_eq!(resolve_secrets(&secrets, &HashMap::new()), Err(SecretError::EmptyName));
    }

    #[test]
    fn sorts_by_source_then_target_then_kind() {
        let mut env_secrets = HashMap::new();
        env_secrets.insert("b-secret".to_string(), "B_VAR".to_string());
        let mount_secrets = vec![ServiceSecret::Short("a-secret".to_string())];
        let resolved = resolve_secrets(&mount_secrets, &env_secrets).unwrap();
        assert_eq!(resolved[0].source, "a-secret");
        assert_eq!(resolved[1].source, "b-secret");
    }
}
