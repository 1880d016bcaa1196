// Reference graph: which method uses which member

use crate::entry::{Entry, EntryReference, ReferenceKind};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Directed graph of references made from method bodies.
///
/// Nodes are entries; an edge `caller -> target` carries the kind of use.
/// A caller/target/kind triple is stored at most once.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// The underlying directed graph
    inner: DiGraph<Entry, ReferenceKind>,

    /// Map from entry to node index
    node_map: HashMap<Entry, NodeIndex>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, entry: &Entry) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(entry) {
            return idx;
        }
        let idx = self.inner.add_node(entry.clone());
        self.node_map.insert(entry.clone(), idx);
        idx
    }

    /// Record that `from` uses `to`. Returns false if the edge already existed.
    pub(crate) fn add_reference(&mut self, from: &Entry, to: &Entry, kind: ReferenceKind) -> bool {
        let from_idx = self.node(from);
        let to_idx = self.node(to);
        if self
            .inner
            .edges_connecting(from_idx, to_idx)
            .any(|edge| *edge.weight() == kind)
        {
            return false;
        }
        self.inner.add_edge(from_idx, to_idx, kind);
        true
    }

    /// Every use of `entry` matching `filter`, with the user as context.
    /// A user touching `entry` in several ways is listed once.
    pub fn references_to<F>(&self, entry: &Entry, filter: F) -> Vec<EntryReference>
    where
        F: Fn(ReferenceKind) -> bool,
    {
        let Some(&node_idx) = self.node_map.get(entry) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        self.inner
            .edges_directed(node_idx, Direction::Incoming)
            .filter(|edge| filter(*edge.weight()))
            .filter_map(|edge| {
                let source = self.inner.node_weight(edge.source())?;
                Some(EntryReference::new(entry.clone(), Some(source.clone())))
            })
            .filter(|reference| seen.insert(reference.clone()))
            .collect()
    }

    /// Everything `caller` uses, matching `filter`
    pub fn references_from<F>(&self, caller: &Entry, filter: F) -> Vec<EntryReference>
    where
        F: Fn(ReferenceKind) -> bool,
    {
        let Some(&node_idx) = self.node_map.get(caller) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        self.inner
            .edges_directed(node_idx, Direction::Outgoing)
            .filter(|edge| filter(*edge.weight()))
            .filter_map(|edge| {
                let target = self.inner.node_weight(edge.target())?;
                Some(EntryReference::new(target.clone(), Some(caller.clone())))
            })
            .filter(|reference| seen.insert(reference.clone()))
            .collect()
    }

    /// Check if an entry is used by anything
    pub fn is_referenced(&self, entry: &Entry) -> bool {
        let Some(&node_idx) = self.node_map.get(entry) else {
            return false;
        };

        let mut seen: HashSet<EntryReference> = HashSet::new();
        self.inner
            .edges_directed(node_idx, Direction::Incoming)
            .next()
            .is_some()
    }

    /// Get the number of references
    pub fn reference_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Get the underlying petgraph for advanced operations
    pub fn inner(&self) -> &DiGraph<Entry, ReferenceKind> {
        &self.inner
    }
}
