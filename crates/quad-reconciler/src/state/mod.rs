//! # State
//!
//! The single persisted document tracking, per repository, which commit
//! was last reconciled and which units are currently managed, plus
//! per-unit content/bind-mount hashes used for change detection.

mod store;

pub use store::{StateStore, StateStoreError};

use crate::artifact::UnitKey;
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current and previous commit reconciled for one repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoState {
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub previous: String,
}

impl RepoState {
    /// Idempotent on an equal hash; otherwise shifts current→previous.
    pub fn set_commit(&mut self, hash: &str) {
        if self.current == hash {
            return;
        }
        self.previous = std::mem::take(&mut self.current);
        self.current = hash.to_string();
    }
}

/// Content and bind-mount hashes recorded for one managed unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitState {
    pub content_hash: ContentHash,
    #[serde(default)]
    pub bind_mount_hashes: HashMap<String, ContentHash>,
}

/// The root persisted document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct State {
    #[serde(default)]
    pub repositories: HashMap<String, RepoState>,
    #[serde(default, rename = "managed_units")]
    pub managed_units: HashMap<String, Vec<UnitKeyJson>>,
    #[serde(default, rename = "unit_states")]
    pub unit_states: HashMap<String, UnitState>,
}

/// `UnitKey` serializes as its plain string form; this newtype exists
/// purely so `managed_units` round-trips through serde without pulling
/// `UnitKey` itself into a `(De)Serialize` bound it doesn't otherwise need.
pub type UnitKeyJson = String;

impl State {
    pub fn set_commit(&mut self, repo: &str, hash: &str) {
        self.repositories.entry(repo.to_string()).or_default().set_commit(hash);
    }

    #[must_use]
    pub fn get_previous(&self, repo: &str) -> Option<&str> {
        self.repositories.get(repo).map(|r| r.previous.as_str())
    }

    pub fn set_managed_units(&mut self, repo: &str, keys: &[UnitKey]) {
        self.managed_units.insert(
            repo.to_string(),
            keys.iter().map(|k| k.as_str().to_string()).collect(),
        );
    }

    #[must_use]
    pub fn get_managed_units(&self, repo: &str) -> Vec<UnitKey> {
        self.managed_units
            .get(repo)
            .map(|keys| keys.iter().cloned().map(UnitKey::from).collect())
            .unwrap_or_default()
    }

    pub fn set_unit_state(&mut self, key: &UnitKey, state: UnitState) {
        self.unit_states.insert(key.as_str().to_string(), state);
    }

    #[must_use]
    pub fn get_unit_state(&self, key: &UnitKey) -> Option<&UnitState> {
        self.unit_states.get(key.as_str())
    }

    pub fn remove_unit_state(&mut self, key: &UnitKey) {
        self.unit_states.remove(key.as_str());
    }

    /// Keys that previously existed whose content or bind-mount hashes
    /// changed. New keys (no prior `UnitState`) are excluded — they get
    /// started, not restarted.
    #[must_use]
    pub fn changed_units(&self, new_states: &HashMap<UnitKey, UnitState>) -> Vec<UnitKey> {
        new_states
            .iter()
            .filter_map(|(key, new_state)| {
                let old_state = self.get_unit_state(key)?;
                (old_state != new_state).then(|| key.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_commit_is_idempotent_on_equal_hash() {
        let mut s = RepoState::default();
        s.set_commit("abc");
        assert_eq!(s.current, "abc");
        assert_eq!(s.previous, "");
        s.set_commit("abc");
        assert_eq!(s.previous, "", "no-op on equal hash must not shift previous");
        s.set_commit("def");
        assert_eq!(s.current, "def");
        assert_eq!(s.previous, "abc");
    }

    #[test]
    fn missing_file_shape_normalizes_to_empty_maps() {
        let s = State::default();
        assert!(s.repositories.is_empty());
        assert!(s.managed_units.is_empty());
        assert!(s.unit_states.is_empty());
    }

    #[test]
    fn changed_units_excludes_brand_new_keys() {
        let mut state = State::default();
        let existing = UnitKey::new("web-api", crate::artifact::UnitType::Container);
        state.set_unit_state(
            &existing,
            UnitState { content_hash: ContentHash::of(b"old"), bind_mount_hashes: HashMap::new() },
        );

        let new_key = UnitKey::new("web-edge", crate::artifact::UnitType::Container);
        let mut new_states = HashMap::new();
        new_states.insert(
            existing.clone(),
            UnitState { content_hash: ContentHash::of(b"new"), bind_mount_hashes: HashMap::new() },
        );
        new_states.insert(
            new_key.clone(),
            UnitState { content_hash: ContentHash::of(b"brand-new"), bind_mount_hashes: HashMap::new() },
        );

        let changed = state.changed_units(&new_states);
        assert_eq!(changed, vec![existing]);
    }
}
