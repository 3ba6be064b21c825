//! # Environment Resolution
//!
//! Dereferences `environment:` entries with no inline value against the
//! process environment, dropping any that still resolve to nothing, and
//! returns the result sorted by key (spec §4.4: "sorted by key; values
//! dereferenced; unset values omitted").

use crate::compose::EnvMap;
use std::collections::HashMap;

#[must_use]
pub fn resolve_environment(env: &EnvMap) -> Vec<(String, String)> {
    resolve_environment_from(env, |key| std::env::var(key).ok())
}

/// Testable variant: takes the lookup function for unset values instead
/// of reading the real process environment.
pub fn resolve_environment_from(
    env: &EnvMap,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<(String, String)> {
    let mut resolved: Vec<(String, String)> = env
        .0
        .iter()
        .filter_map(|(key, value)| match value {
            Some(v) => Some((key.clone(), v.clone())),
            None => lookup(key).map(|v| (key.clone(), v)),
        })
        .collect();
    resolved.sort_by(|a, b| a.0.cmp(&b.0));
    resolved
}

#[must_use]
pub fn resolve_labels(labels: &EnvMap, managed_by: &str) -> Vec<(String, String)> {
    let mut sorted = resolve_environment_from(labels, |_| None);
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let mut out = vec![("managed-by".to_string(), managed_by.to_string())];
    out.extend(sorted);
    out
}

#[must_use]
pub fn sorted_map(map: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut out: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_are_omitted_when_lookup_misses() {
        let mut map = HashMap::new();
        map.insert("FOO".to_string(), Some("bar".to_string()));
        map.insert("UNSET".to_string(), None);
        let env = EnvMap(map);
        let resolved = resolve_environment_from(&env, |_| None);
        assert_eq!(resolved, vec![("FOO".to_string(), "bar".to_string())]);
    }

    #[test]
    fn unset_values_dereference_from_lookup() {
        let mut map = HashMap::new();
        map.insert("FOO".to_string(), None);
        let env = EnvMap(map);
        let resolved = resolve_environment_from(&env, |k| (k == "FOO").then(|| "from-env".to_string()));
        assert_eq!(resolved, vec![("FOO".to_string(), "from-env".to_string())]);
    }

    #[test]
    fn result_is_sorted_by_key() {
        let mut map = HashMap::new();
        map.insert("ZETA".to_string(), Some("1".to_string()));
        map.insert("ALPHA".to_string(), Some("2".to_string()));
        let env = EnvMap(map);
        let resolved = resolve_environment_from(&env, |_| None);
        assert_eq!(resolved[0].0, "ALPHA");
        assert_eq!(resolved[1].0, "ZETA");
    }

    #[test]
    fn labels_always_start_with_managed_by() {
        let labels = resolve_labels(&EnvMap::default(), "quad-reconciler");
        assert_eq!(labels[0], ("managed-by".to_string(), "quad-reconciler".to_string()));
    }
}
