//! Non-canonical name resolution over an explicit graph.
//!
//! The hierarchical namespace is a forest encoded as a node set plus a
//! labeled-edge adjacency table. Resolution walks a query
//! component-by-component, preferring exact canonical prefixes and
//! falling back to the parent's alias table, with one level of alias
//! chaining and visited-prefix cycle detection.

use docweb_types::CanonicalName;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A pure, immutable view of the entry graph for name resolution.
#[derive(Debug, Clone, Default)]
pub struct NameGraph {
    nodes: BTreeSet<CanonicalName>,
    /// parent -> [(local_name, target)]
    edges: BTreeMap<CanonicalName, Vec<(String, CanonicalName)>>,
}

impl NameGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a canonical entry name.
    pub fn add_node(&mut self, name: CanonicalName) {
        self.nodes.insert(name);
    }

    /// Registers a labeled edge from `parent` to `target`.
    pub fn add_edge(&mut self, parent: CanonicalName, local_name: impl Into<String>, target: CanonicalName) {
        self.edges
            .entry(parent)
            .or_default()
            .push((local_name.into(), target));
    }

    /// Returns true when the name is a canonical entry.
    #[must_use]
    pub fn contains(&self, name: &CanonicalName) -> bool {
        self.nodes.contains(name)
    }

    fn edge_target(&self, parent: &CanonicalName, local: &str) -> Option<&CanonicalName> {
        self.edges
            .get(parent)
            .and_then(|edges| edges.iter().find(|(l, _)| l == local))
            .map(|(_, t)| t)
    }

    /// Resolves a possibly non-canonical query to a canonical entry name.
    ///
    /// Exact matches win. Otherwise the query is walked component by
    /// component; at each step an exact canonical prefix is preferred,
    /// with the parent's alias table consulted when none exists. Alias
    /// targets are chased through at most one extra level of indirection.
    /// A repeating prefix aborts the aliased path and falls back to the
    /// literal component join.
    #[must_use]
    pub fn resolve(&self, query: &str) -> Option<CanonicalName> {
        let name = CanonicalName::new(query);
        if self.contains(&name) {
            return Some(name);
        }

        let sep = name.separator();
        let components = name.components();
        if components.len() < 2 {
            return None;
        }

        let mut current = CanonicalName::new(components[0]);
        let mut visited: HashSet<CanonicalName> = HashSet::new();
        visited.insert(current.clone());

        for comp in &components[1..] {
            let candidate = CanonicalName::new(format!("{current}{sep}{comp}"));
            if self.contains(&candidate) {
                current = candidate;
            } else {
                let target = self.edge_target(&current, comp)?;
                let mut next = target.clone();
                if !self.contains(&next) {
                    // One level of chaining: follow the target's own
                    // alias in its parent before giving up on it.
                    if let (Some(parent), leaf) = (next.parent(), next.leaf().to_string()) {
                        if let Some(chained) = self.edge_target(&parent, &leaf) {
                            next = chained.clone();
                        }
                    }
                }
                if !visited.insert(next.clone()) {
                    // Cycle: abort this path, fall back to the literal join.
                    let literal = CanonicalName::from_components(&components, sep);
                    return self.contains(&literal).then_some(literal);
                }
                current = next;
            }
        }

        self.contains(&current).then_some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> NameGraph {
        let mut g = NameGraph::new();
        for n in ["pkg", "pkg.mod", "pkg.mod.func", "pkg.other"] {
            g.add_node(CanonicalName::new(n));
        }
        g
    }

    #[test]
    fn exact_match_wins() {
        let g = graph();
        assert_eq!(g.resolve("pkg.mod.func"), Some(CanonicalName::new("pkg.mod.func")));
    }

    #[test]
    fn alias_substitution() {
        let mut g = graph();
        // pkg re-exports mod.func under the name f
        g.add_edge(CanonicalName::new("pkg"), "f", CanonicalName::new("pkg.mod.func"));
        assert_eq!(g.resolve("pkg.f"), Some(CanonicalName::new("pkg.mod.func")));
    }

    #[test]
    fn alias_mid_path() {
        let mut g = graph();
        g.add_edge(CanonicalName::new("pkg"), "m", CanonicalName::new("pkg.mod"));
        assert_eq!(g.resolve("pkg.m.func"), Some(CanonicalName::new("pkg.mod.func")));
    }

    #[test]
    fn cycle_detection_falls_back() {
        let mut g = NameGraph::new();
        g.add_node(CanonicalName::new("a"));
        g.add_edge(CanonicalName::new("a"), "x", CanonicalName::new("a"));
        assert_eq!(g.resolve("a.x.y"), None);
    }

    #[test]
    fn unknown_name_is_not_found() {
        assert_eq!(graph().resolve("pkg.nothing"), None);
        assert_eq!(graph().resolve("lone"), None);
    }
}
