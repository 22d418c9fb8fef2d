//! In-memory dependency graph for one plan (or one project's plans).
//!
//! The graph is a plain data holder built fresh from persisted records for
//! every operation. Each node maps to its `blocked_by` list: an edge
//! `t -> b` means `t` cannot start before `b` completes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Directed "blocked by" graph over node identifiers of type `N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph<N>
where
    N: Copy + Eq + Hash,
{
    edges: HashMap<N, Vec<N>>,
}

impl<N> Default for DependencyGraph<N>
where
    N: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }
}

impl<N> DependencyGraph<N>
where
    N: Copy + Eq + Hash,
{
    /// Builds a graph from `(node, blocked_by)` pairs.
    ///
    /// Duplicate blockers are collapsed, keeping first-seen order. Blockers
    /// that are not themselves listed as nodes are kept as edges but have no
    /// outgoing edges of their own.
    #[must_use]
    pub fn from_edges<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, E)>,
        E: IntoIterator<Item = N>,
    {
        let edges = entries
            .into_iter()
            .map(|(node, blocked_by)| (node, dedup_preserving_order(blocked_by)))
            .collect();
        Self { edges }
    }

    /// Returns the blockers of `node`, or an empty slice for unknown nodes.
    #[must_use]
    pub fn edges_of(&self, node: N) -> &[N] {
        self.edges.get(&node).map_or(&[][..], Vec::as_slice)
    }

    /// Iterates over every node in the graph in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.edges.keys().copied()
    }

    /// Returns `true` when `node` is part of the graph.
    #[must_use]
    pub fn contains(&self, node: N) -> bool {
        self.edges.contains_key(&node)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` when the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns every node that lists `node` among its blockers.
    #[must_use]
    pub fn dependents_of(&self, node: N) -> Vec<N> {
        self.edges
            .iter()
            .filter(|(_, blocked_by)| blocked_by.contains(&node))
            .map(|(dependent, _)| *dependent)
            .collect()
    }

    /// Returns a copy of the graph with `node`'s blockers replaced.
    ///
    /// The node is added when it is not yet present.
    #[must_use]
    pub fn with_candidate_edges(&self, node: N, blocked_by: &[N]) -> Self {
        let mut candidate = self.clone();
        candidate
            .edges
            .insert(node, dedup_preserving_order(blocked_by.iter().copied()));
        candidate
    }

    /// Orders nodes so that every node follows all of its blockers.
    ///
    /// Among nodes that are ready at the same time, the one with the smallest
    /// `key` comes first. Blockers that are not nodes of the graph are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns the nodes that could not be ordered when the graph contains a
    /// cycle.
    pub fn topological_order<K, F>(&self, key: F) -> Result<Vec<N>, Vec<N>>
    where
        N: Ord,
        K: Ord,
        F: Fn(N) -> K,
    {
        let mut remaining_blockers: HashMap<N, usize> = HashMap::with_capacity(self.edges.len());
        let mut dependents: HashMap<N, Vec<N>> = HashMap::new();
        for (node, blocked_by) in &self.edges {
            let known: Vec<N> = blocked_by
                .iter()
                .copied()
                .filter(|blocker| self.edges.contains_key(blocker))
                .collect();
            remaining_blockers.insert(*node, known.len());
            for blocker in known {
                dependents.entry(blocker).or_default().push(*node);
            }
        }

        let mut ready: BTreeSet<(K, N)> = remaining_blockers
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| (key(*node), *node))
            .collect();
        let mut ordered = Vec::with_capacity(self.edges.len());

        while let Some((_, node)) = ready.pop_first() {
            ordered.push(node);
            for dependent in dependents.get(&node).map_or(&[][..], Vec::as_slice) {
                if let Some(count) = remaining_blockers.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert((key(*dependent), *dependent));
                    }
                }
            }
        }

        if ordered.len() == self.edges.len() {
            return Ok(ordered);
        }
        let placed: HashSet<N> = ordered.into_iter().collect();
        let mut stuck: Vec<N> = self
            .edges
            .keys()
            .copied()
            .filter(|node| !placed.contains(node))
            .collect();
        stuck.sort();
        Err(stuck)
    }
}

fn dedup_preserving_order<N>(items: impl IntoIterator<Item = N>) -> Vec<N>
where
    N: Copy + Eq + Hash,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(*item))
        .collect()
}
