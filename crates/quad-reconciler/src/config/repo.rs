//! # Repository Descriptor
//!
//! Static, per-run description of one Git repository the reconciler
//! tracks.

use regex::Regex;
use std::sync::LazyLock;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid regex"));

/// One repository the reconciler syncs and reconciles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Unique name, also used as the key in persisted state.
    pub name: String,
    pub url: String,
    /// Commit hash, branch, or tag. Empty means "default branch".
    pub reference: String,
    /// Subdirectory (relative to the repo root) to search for compose
    /// files in.
    pub compose_subdir: String,
}

impl RepoDescriptor {
    /// DNS-safe name check: lowercase alphanumeric and `-`, not
    /// starting or ending with `-`, max 63 characters (RFC 1123 label).
    pub fn validate_name(&self) -> Result<(), String> {
        if !NAME_PATTERN.is_match(&self.name) {
            return Err(format!(
                "{:?} must be a DNS-safe label (lowercase alphanumeric and '-', \
                 not starting/ending with '-', max 63 chars)",
                self.name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> RepoDescriptor {
        RepoDescriptor {
            name: name.to_string(),
            url: "https://example.com/repo.git".to_string(),
            reference: String::new(),
            compose_subdir: String::new(),
        }
    }

    #[test]
    fn accepts_dns_safe_names() {
        repo("web-app").validate_name().unwrap();
        repo("a").validate_name().unwrap();
    }

    #[test]
    fn rejects_uppercase_and_leading_dash() {
        assert!(repo("Web-App").validate_name().is_err());
        assert!(repo("-web").validate_name().is_err());
        assert!(repo("web-").validate_name().is_err());
        assert!(repo("").validate_name().is_err());
    }
}
