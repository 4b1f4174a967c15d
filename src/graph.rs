//! Concept graph: directed accumulation of discovered concepts
//!
//! Nodes are concept labels (case-sensitive identity), edges are
//! parent-discovered-child links. Insertion order is preserved because the
//! root is defined as the *first* node with zero in-degree.

use std::collections::HashMap;
use thiserror::Error;

/// Errors when projecting a graph to a tree (rendering, export)
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("graph has no root node")]
    EmptyGraph,
}

/// A directed graph of concept labels.
///
/// Normally tree-shaped (each node discovered once), but a node re-added as
/// a child of a second parent is tolerated: consumers walk with a per-pass
/// visited set instead of the graph enforcing single parentage.
#[derive(Debug, Default, Clone)]
pub struct ConceptGraph {
    /// Node labels in insertion order
    order: Vec<String>,
    /// Outgoing edges per node, in edge-insertion order
    children: HashMap<String, Vec<String>>,
    /// Incoming edges per node, in edge-insertion order
    parents: HashMap<String, Vec<String>>,
    edge_count: usize,
}

impl ConceptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if absent. Returns true when the node was new.
    pub fn add_node(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.children.contains_key(&label) {
            return false;
        }
        self.children.insert(label.clone(), Vec::new());
        self.parents.insert(label.clone(), Vec::new());
        self.order.push(label);
        true
    }

    /// Add a directed edge `parent -> child`, creating missing endpoints.
    ///
    /// An identical existing edge is left alone (idempotent).
    pub fn add_edge(&mut self, parent: &str, child: &str) {
        self.add_node(parent);
        self.add_node(child);
        let out = self.children.get_mut(parent).expect("parent just inserted");
        if out.iter().any(|c| c == child) {
            return;
        }
        out.push(child.to_string());
        self.parents
            .get_mut(child)
            .expect("child just inserted")
            .push(parent.to_string());
        self.edge_count += 1;
    }

    pub fn contains(&self, label: &str) -> bool {
        self.children.contains_key(label)
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Children of a node in discovery order. Empty for unknown labels.
    pub fn successors(&self, label: &str) -> &[String] {
        self.children.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parents of a node in discovery order. Empty for unknown labels.
    pub fn predecessors(&self, label: &str) -> &[String] {
        self.parents.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first node (insertion order) with zero in-degree.
    ///
    /// When several zero-in-degree nodes exist only the first is reported;
    /// later ones are never rendered. Known edge case, kept as-is.
    pub fn root(&self) -> Option<&str> {
        self.order
            .iter()
            .find(|label| {
                self.parents
                    .get(label.as_str())
                    .map(|p| p.is_empty())
                    .unwrap_or(true)
            })
            .map(String::as_str)
    }

    /// Ancestor chain from the root down to `label` (inclusive), following
    /// the *first* predecessor at each step. A node with multiple parents
    /// yields an arbitrary single chain.
    pub fn ancestor_path(&self, label: &str) -> Vec<String> {
        if !self.contains(label) {
            return Vec::new();
        }
        let mut path = vec![label.to_string()];
        let mut current = label.to_string();
        while let Some(parent) = self.predecessors(&current).first() {
            // A cycle back into the path would loop forever; bail out.
            if path.iter().any(|p| p == parent) {
                break;
            }
            path.push(parent.clone());
            current = parent.clone();
        }
        path.reverse();
        path
    }
}
