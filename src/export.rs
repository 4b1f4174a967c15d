//! Plain exporter — full-tree serialization for the output file
//!
//! Unbounded depth, no styling, no sampling. Shares the renderer's
//! per-branch visited-set discipline so a cycle renders its node once more
//! with a continuation marker instead of recursing forever.

use crate::graph::{ConceptGraph, TreeError};
use std::collections::HashSet;

fn walk(
    graph: &ConceptGraph,
    label: &str,
    prefix: &str,
    is_last: bool,
    mut visited: HashSet<String>,
) -> String {
    let connector = if is_last { "└── " } else { "├── " };

    if visited.contains(label) {
        return format!("{prefix}{connector}{label} (...)\n");
    }
    visited.insert(label.to_string());

    let mut out = format!("{prefix}{connector}{label}\n");
    let children = graph.successors(label);
    if children.is_empty() {
        return out;
    }

    let next_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
    for (i, child) in children.iter().enumerate() {
        let last_child = i + 1 == children.len();
        out.push_str(&walk(graph, child, &next_prefix, last_child, visited.clone()));
    }
    out
}

/// Serialize the whole tree from the detected root, one node per line.
pub fn export_tree(graph: &ConceptGraph) -> Result<String, TreeError> {
    let root = graph.root().ok_or(TreeError::EmptyGraph)?;
    Ok(walk(graph, root, "", true, HashSet::new()))
}
