//! # Dependency Graph
//!
//! Per-project DAG built from `depends_on` plus the implicit volume- and
//! network-reference edges, used to order restarts and to suppress
//! redundant restarts of units whose dependents already restarted
//! (spec §4.5).

use crate::artifact::UnitKey;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct DependencyNode {
    pub deps: HashSet<UnitKey>,
    pub dependents: HashSet<UnitKey>,
    /// Subset of `deps`/`dependents` coming from an explicit `depends_on`
    /// relationship between two services, as opposed to the implicit
    /// network/volume edges the generator also adds for start ordering.
    /// Only this subset feeds the "already restarted" suppression, since
    /// starting a freshly-created network must never skip starting the
    /// container that attaches to it (spec §4.5, §8 S1).
    pub service_deps: HashSet<UnitKey>,
    pub service_dependents: HashSet<UnitKey>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<UnitKey, DependencyNode>,
}

#[derive(Debug, thiserror::Error)]
#[error("dependency cycle detected: {}", cycle.iter().map(UnitKey::as_str).collect::<Vec<_>>().join(" -> "))]
pub struct CycleError {
    pub cycle: Vec<UnitKey>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node_mut(&mut self, key: &UnitKey) -> &mut DependencyNode {
        self.nodes.entry(key.clone()).or_default()
    }

    /// Adds a directed edge `from` depends on `to`, for ordering only.
    pub fn add_edge(&mut self, from: &UnitKey, to: &UnitKey) {
        self.node_mut(from).deps.insert(to.clone());
        self.node_mut(to).dependents.insert(from.clone());
        self.node_mut(from);
        self.node_mut(to);
    }

    /// Adds a `depends_on`-backed edge: participates in ordering like
    /// `add_edge`, and additionally feeds restart suppression.
    pub fn add_service_edge(&mut self, from: &UnitKey, to: &UnitKey) {
        self.add_edge(from, to);
        self.node_mut(from).service_deps.insert(to.clone());
        self.node_mut(to).service_dependents.insert(from.clone());
    }

    /// Registers a unit with no edges, so it still appears in topological
    /// order even if nothing depends on it or it depends on nothing.
    pub fn add_node(&mut self, key: &UnitKey) {
        self.node_mut(key);
    }

    pub fn nodes_iter(&self) -> impl Iterator<Item = &UnitKey> {
        self.nodes.keys()
    }

    pub fn deps_of(&self, key: &UnitKey) -> impl Iterator<Item = &UnitKey> {
        self.nodes.get(key).into_iter().flat_map(|n| n.deps.iter())
    }

    pub fn dependents_of(&self, key: &UnitKey) -> impl Iterator<Item = &UnitKey> {
        self.nodes.get(key).into_iter().flat_map(|n| n.dependents.iter())
    }

    pub fn service_deps_of(&self, key: &UnitKey) -> impl Iterator<Item = &UnitKey> {
        self.nodes.get(key).into_iter().flat_map(|n| n.service_deps.iter())
    }

    pub fn service_dependents_of(&self, key: &UnitKey) -> impl Iterator<Item = &UnitKey> {
        self.nodes.get(key).into_iter().flat_map(|n| n.service_dependents.iter())
    }

    /// Deterministic topological order (dependencies before dependents),
    /// ties broken by `UnitKey` ordering so output is stable run to run.
    pub fn topological_order(&self) -> Result<Vec<UnitKey>, CycleError> {
        let mut marks: HashMap<&UnitKey, Mark> =
            self.nodes.keys().map(|k| (k, Mark::Unvisited)).collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();

        let mut keys: Vec<&UnitKey> = self.nodes.keys().collect();
        keys.sort();

        for start in keys {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            self.visit(start, &mut marks, &mut stack, &mut order)?;
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        key: &'a UnitKey,
        marks: &mut HashMap<&'a UnitKey, Mark>,
        stack: &mut Vec<&'a UnitKey>,
        order: &mut Vec<UnitKey>,
    ) -> Result<(), CycleError> {
        marks.insert(key, Mark::InProgress);
        stack.push(key);

        let mut deps: Vec<&UnitKey> = self.deps_of(key).collect();
        deps.sort();
        for dep in deps {
            match marks.get(dep).copied().unwrap_or(Mark::Unvisited) {
                Mark::Unvisited => self.visit(dep, marks, stack, order)?,
                Mark::InProgress => {
                    let start = stack.iter().position(|k| *k == dep).unwrap_or(0);
                    let mut cycle: Vec<UnitKey> = stack[start..].iter().map(|k| (*k).clone()).collect();
                    cycle.push(dep.clone());
                    return Err(CycleError { cycle });
                }
                Mark::Done => {}
            }
        }

        stack.pop();
        marks.insert(key, Mark::Done);
        order.push(key.clone());
        Ok(())
    }
}

/// Sets `restarted[start] = true` and recurses into every dependent,
/// transitively (spec §4.5).
pub fn mark_dependents_as_restarted(start: &UnitKey, graph: &DependencyGraph, restarted: &mut HashSet<UnitKey>) {
    if !restarted.insert(start.clone()) {
        return;
    }
    for dependent in graph.service_dependents_of(start) {
        mark_dependents_as_restarted(dependent, graph, restarted);
    }
}

/// True iff `key` itself was restarted, or any of its *transitive
/// dependencies* was. Note the asymmetry: a restarted dependent does not
/// cover its dependency (spec §4.5).
#[must_use]
pub fn is_service_already_restarted(key: &UnitKey, graph: &DependencyGraph, restarted: &HashSet<UnitKey>) -> bool {
    if restarted.contains(key) {
        return true;
    }
    let mut seen = HashSet::new();
    let mut stack: Vec<&UnitKey> = graph.service_deps_of(key).collect();
    while let Some(dep) = stack.pop() {
        if !seen.insert(dep) {
            continue;
        }
        if restarted.contains(dep) {
            return true;
        }
        stack.extend(graph.service_deps_of(dep));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::UnitType;

    fn key(name: &str) -> UnitKey {
        UnitKey::new(name, UnitType::Container)
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(&key("web-edge"), &key("web-api"));
        let order = graph.topological_order().unwrap();
        let api_pos = order.iter().position(|k| *k == key("web-api")).unwrap();
        let edge_pos = order.iter().position(|k| *k == key("web-edge")).unwrap();
        assert!(api_pos < edge_pos);
    }

    #[test]
    fn detects_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(&key("a"), &key("b"));
        graph.add_edge(&key("b"), &key("a"));
        graph.topological_order().unwrap_err();
    }

    #[test]
    fn implicit_network_edge_never_suppresses_its_container() {
        // A container's ordering edge to its network (add_edge) must
        // order network before container, but must not suppress the
        // container's own start just because the network started first.
        let mut graph = DependencyGraph::new();
        graph.add_edge(&key("web-api"), &key("web-default-network"));
        let mut restarted = HashSet::new();
        mark_dependents_as_restarted(&key("web-default-network"), &graph, &mut restarted);
        assert!(!is_service_already_restarted(&key("web-api"), &graph, &restarted));
    }

    #[test]
    fn restarting_a_dependency_does_not_cover_its_dependent() {
        let mut graph = DependencyGraph::new();
        graph.add_service_edge(&key("web-edge"), &key("web-api"));
        let mut restarted = HashSet::new();
        mark_dependents_as_restarted(&key("web-api"), &graph, &mut restarted);
        assert!(is_service_already_restarted(&key("web-edge"), &graph, &restarted));
        assert!(!is_service_already_restarted(&key("web-api"), &graph, &HashSet::new()));
    }

    #[test]
    fn asymmetry_a_restarted_dependent_does_not_cover_its_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_service_edge(&key("web-edge"), &key("web-api"));
        let mut restarted = HashSet::new();
        mark_dependents_as_restarted(&key("web-edge"), &graph, &mut restarted);
        assert!(!is_service_already_restarted(&key("web-api"), &graph, &restarted));
    }
}
