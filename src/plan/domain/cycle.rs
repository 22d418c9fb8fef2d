//! Cycle detection over candidate dependency edges.
//!
//! A cycle through node `t` exists exactly when `t` is reachable from one of
//! its proposed blockers. The detector walks outward from the candidate set
//! along existing `blocked_by` edges and, if `t` is reached, traces a
//! concrete path for diagnostics.

use super::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Closed dependency path that starts and ends at the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CyclePath<N>(Vec<N>);

impl<N> CyclePath<N> {
    /// Returns the nodes of the path, first and last being the same node.
    #[must_use]
    pub fn nodes(&self) -> &[N] {
        &self.0
    }

    /// Consumes the path and returns its nodes.
    #[must_use]
    pub fn into_nodes(self) -> Vec<N> {
        self.0
    }
}

impl<N: fmt::Display> fmt::Display for CyclePath<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, node) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// Outcome of validating a candidate `blocked_by` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleVerdict<N> {
    /// Committing the candidate set keeps the graph acyclic.
    Acyclic,
    /// The candidate set contains the node itself.
    SelfBlock(N),
    /// Committing the candidate set would close the given cycle.
    Cycle(CyclePath<N>),
}

impl<N: fmt::Display> CycleVerdict<N> {
    /// Returns `true` when the candidate set may be committed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Acyclic)
    }

    /// Human-readable reason for rejection, if any.
    #[must_use]
    pub fn error_detail(&self) -> Option<String> {
        match self {
            Self::Acyclic => None,
            Self::SelfBlock(node) => Some(format!("{node} cannot be blocked by itself")),
            Self::Cycle(path) => Some(format!("circular dependency detected: {path}")),
        }
    }
}

/// Decides whether `node` may be blocked by exactly `candidate`.
///
/// `graph` holds the current edge sets of every node; the node's own current
/// edges are ignored in favour of `candidate`. A self-reference is reported
/// as [`CycleVerdict::SelfBlock`] before any traversal happens.
#[must_use]
pub fn check_candidate_edges<N>(
    graph: &DependencyGraph<N>,
    node: N,
    candidate: &[N],
) -> CycleVerdict<N>
where
    N: Copy + Eq + Hash,
{
    if candidate.contains(&node) {
        return CycleVerdict::SelfBlock(node);
    }

    let proposed = graph.with_candidate_edges(node, candidate);
    if !reaches(&proposed, candidate, node) {
        return CycleVerdict::Acyclic;
    }

    // Reachability guarantees a path exists, so tracing cannot come back
    // empty on a consistent graph.
    trace_cycle(&proposed, node).map_or(CycleVerdict::Acyclic, CycleVerdict::Cycle)
}

/// Iterative depth-first reachability from `frontier` to `target`.
fn reaches<N>(graph: &DependencyGraph<N>, frontier: &[N], target: N) -> bool
where
    N: Copy + Eq + Hash,
{
    let mut stack: Vec<N> = frontier.iter().rev().copied().collect();
    let mut visited = HashSet::new();

    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        stack.extend(graph.edges_of(current).iter().rev().copied());
    }
    false
}

/// Finds a path `start -> ... -> start` using an explicit stack that carries
/// the current path, so deep graphs cannot exhaust the call stack.
fn trace_cycle<N>(graph: &DependencyGraph<N>, start: N) -> Option<CyclePath<N>>
where
    N: Copy + Eq + Hash,
{
    let mut path = vec![start];
    let mut cursors = vec![0_usize];
    let mut on_path = HashSet::from([start]);
    let mut exhausted = HashSet::new();

    while let Some(&current) = path.last() {
        let edges = graph.edges_of(current);
        let Some(cursor) = cursors.last_mut() else {
            break;
        };
        let Some(&next) = edges.get(*cursor) else {
            exhausted.insert(current);
            on_path.remove(&current);
            path.pop();
            cursors.pop();
            continue;
        };
        *cursor += 1;

        if next == start {
            path.push(start);
            return Some(CyclePath(path));
        }
        if on_path.contains(&next) || exhausted.contains(&next) {
            continue;
        }
        on_path.insert(next);
        path.push(next);
        cursors.push(0);
    }
    None
}
