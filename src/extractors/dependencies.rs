//! Task execution-order resolution.
//!
//! Turns chain expressions like `"extract >> transform >> load"` into
//! upstream/downstream adjacency. Both directions are materialized so a task
//! passage can look up either side directly. The graph lives only for one
//! workflow sub-document; cycles in malformed input are kept as-is.

use std::collections::HashMap;

/// Chain separator in execution-order expressions.
pub const CHAIN_SEPARATOR: &str = ">>";

/// Upstream/downstream adjacency derived from execution chains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDependencies {
    upstream: HashMap<String, Vec<String>>,
    downstream: HashMap<String, Vec<String>>,
}

impl TaskDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adjacency from a list of chain expressions.
    ///
    /// Segments are trimmed; empty segments (stray `>>`) are skipped, so
    /// `"a >> >> b"` links `a` directly to `b`. Repeated edges are recorded
    /// once.
    pub fn from_chains<S: AsRef<str>>(chains: &[S]) -> Self {
        let mut deps = Self::new();
        for chain in chains {
            deps.add_chain(chain.as_ref());
        }
        deps
    }

    /// Add one chain expression.
    pub fn add_chain(&mut self, chain: &str) {
        let segments: Vec<&str> = chain
            .split(CHAIN_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        for pair in segments.windows(2) {
            self.add_edge(pair[0], pair[1]);
        }
    }

    /// Record `before` as running before `after`.
    pub fn add_edge(&mut self, before: &str, after: &str) {
        push_unique(self.downstream.entry(before.to_string()).or_default(), after);
        push_unique(self.upstream.entry(after.to_string()).or_default(), before);
    }

    /// Tasks that run directly before `task`, in first-seen order.
    pub fn upstream_of(&self, task: &str) -> Option<&[String]> {
        self.upstream.get(task).map(Vec::as_slice)
    }

    /// Tasks that run directly after `task`, in first-seen order.
    pub fn downstream_of(&self, task: &str) -> Option<&[String]> {
        self.downstream.get(task).map(Vec::as_slice)
    }

    /// Iterate `(before, after)` edges. Order is unspecified.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.downstream
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.as_str(), to.as_str())))
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
