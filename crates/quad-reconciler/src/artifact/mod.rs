//! # Artifact Model
//!
//! In-memory representation of a unit file about to be written, and its
//! identity key.

mod store;

pub use store::{ArtifactStore, StoreError};

use crate::hash::ContentHash;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default permission bits for a written artifact.
pub const DEFAULT_MODE: u32 = 0o600;

/// The quadlet unit type suffix, matching the seven unit kinds the
/// service manager's quadlet generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitType {
    Container,
    Volume,
    Network,
    Build,
    Image,
    Pod,
    Kube,
}

impl UnitType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Container => "container",
            UnitType::Volume => "volume",
            UnitType::Network => "network",
            UnitType::Build => "build",
            UnitType::Image => "image",
            UnitType::Pod => "pod",
            UnitType::Kube => "kube",
        }
    }
}

impl FromStr for UnitType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "container" => UnitType::Container,
            "volume" => UnitType::Volume,
            "network" => UnitType::Network,
            "build" => UnitType::Build,
            "image" => UnitType::Image,
            "pod" => UnitType::Pod,
            "kube" => UnitType::Kube,
            _ => return Err(()),
        })
    }
}

/// Identity of one generated unit: `{name}.{type}`, one-to-one with the
/// artifact's relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey(String);

impl UnitKey {
    #[must_use]
    pub fn new(name: &str, unit_type: UnitType) -> Self {
        Self(format!("{name}.{}", unit_type.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn unit_type(&self) -> Option<UnitType> {
        self.0.rsplit_once('.').and_then(|(_, t)| t.parse().ok())
    }

    /// Splits `{project}-{service}` by the first `-`, per spec §4.5.
    #[must_use]
    pub fn split_project_prefix(&self) -> Option<(&str, &str)> {
        let stem = self.0.split('.').next()?;
        stem.split_once('-')
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UnitKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A unit file about to be written: relative path, payload, mode, and a
/// content hash computed over that payload.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub key: UnitKey,
    pub rel_path: PathBuf,
    pub content: Vec<u8>,
    pub mode: u32,
    pub hash: ContentHash,
}

impl Artifact {
    /// Builds an artifact, computing its hash from `content` and
    /// deriving its relative path from the unit key.
    #[must_use]
    pub fn new(key: UnitKey, content: Vec<u8>) -> Self {
        let rel_path = PathBuf::from(key.as_str());
        let hash = ContentHash::of(&content);
        Self {
            key,
            rel_path,
            content,
            mode: DEFAULT_MODE,
            hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_key_splits_project_prefix() {
        let key = UnitKey::new("web-api", UnitType::Container);
        assert_eq!(key.split_project_prefix(), Some(("web", "api")));
        assert_eq!(key.unit_type(), Some(UnitType::Container));
    }

    #[test]
    fn artifact_hash_matches_content() {
        let a = Artifact::new(UnitKey::new("web-api", UnitType::Container), b"hi".to_vec());
        assert_eq!(a.hash, ContentHash::of(b"hi"));
    }
}
