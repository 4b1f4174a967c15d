//! Bounded tree renderer
//!
//! Projects the concept graph into at most `height` lines of branch-drawn
//! text. The focus path (root → node being explored) is always retained;
//! when a node's children outnumber the remaining line budget, a
//! representative head/middle/tail sample is shown with a "more nodes"
//! marker. The emitted line count, markers included, never exceeds the
//! viewport height.

use crate::graph::{ConceptGraph, TreeError};
use colored::Colorize;
use std::collections::HashSet;

/// Options for one bounded render pass.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Node whose ancestor chain is preferentially retained
    pub focus: Option<String>,
    /// Display depth cap; raised to fit the focus path, defaulted from
    /// the viewport height when absent
    pub max_depth: Option<usize>,
    /// Maximum lines the renderer may emit
    pub height: usize,
    /// Terminal width used for label clipping
    pub width: usize,
    /// Node currently being expanded (highlighted)
    pub current: Option<String>,
    /// Most recently added node (highlighted)
    pub last_added: Option<String>,
    /// ANSI styling on/off; positional output is identical either way
    pub styled: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            focus: None,
            max_depth: None,
            height: 24,
            width: 80,
            current: None,
            last_added: None,
            styled: true,
        }
    }
}

/// Pick up to `size` items: roughly a third from the start, a third around
/// the middle, and a third from the end, deduplicated in order.
///
/// Pure so the sampling contract is testable apart from the recursion.
pub fn sample_spread(items: &[String], size: usize) -> Vec<String> {
    if items.len() <= size {
        return items.to_vec();
    }
    if size == 0 {
        return Vec::new();
    }
    let third = (size / 3).max(1);
    let mid = items.len() / 2;
    let mid_lo = mid.saturating_sub(third / 2);
    let mid_hi = (mid + third / 2).min(items.len());
    let head = items[..third].iter();
    let middle = items[mid_lo..mid_hi].iter();
    let tail = items[items.len() - third..].iter();

    let mut picked: Vec<String> = Vec::new();
    for label in head.chain(middle).chain(tail) {
        if !picked.iter().any(|p| p == label) {
            picked.push(label.clone());
        }
    }
    picked.truncate(size);
    picked
}

/// Choose which children to emit given the remaining line budget.
///
/// Focus-path children are always kept. Returns the selection plus whether
/// anything was dropped (and a marker row should follow).
fn select_children(
    ordered: &[String],
    focus: &HashSet<String>,
    remaining: usize,
) -> (Vec<String>, bool) {
    if ordered.len() <= remaining {
        return (ordered.to_vec(), false);
    }
    let (focus_children, non_focus): (Vec<String>, Vec<String>) = ordered
        .iter()
        .cloned()
        .partition(|c| focus.contains(c));

    if focus_children.len() < remaining {
        // Reserve one row for the marker.
        let sample_size = remaining - focus_children.len() - 1;
        let sampled = sample_spread(&non_focus, sample_size);
        let mut picked = focus_children;
        picked.extend(sampled);
        let has_more = picked.len() < ordered.len();
        (picked, has_more)
    } else {
        let keep = remaining.saturating_sub(1);
        (focus_children[..keep].to_vec(), true)
    }
}

struct TreePass<'a> {
    graph: &'a ConceptGraph,
    focus: HashSet<String>,
    max_depth: usize,
    opts: &'a RenderOptions,
    lines: usize,
}

impl<'a> TreePass<'a> {
    /// One node's line: prefix, connector, clipped label, status styling.
    fn line(&self, label: &str, prefix: &str, is_last: bool, depth: usize) -> String {
        let connector = if is_last { "└── " } else { "├── " };
        let budget = self
            .opts
            .width
            .saturating_sub(prefix.chars().count() + connector.chars().count() + 5);
        let label = if label.chars().count() > budget && budget >= 4 {
            let kept: String = label.chars().take(budget - 3).collect();
            format!("{kept}...")
        } else {
            label.to_string()
        };

        if !self.opts.styled {
            return format!("{prefix}{connector}{label}");
        }

        let painted = if self.opts.current.as_deref() == Some(label.as_str()) {
            label.white().on_blue()
        } else if self.opts.last_added.as_deref() == Some(label.as_str()) {
            label.black().on_green()
        } else {
            match depth {
                0 => label.magenta().bold(),
                1 => label.yellow(),
                2 => label.green(),
                3 => label.blue(),
                4 => label.magenta(),
                5 => label.red(),
                _ => label.white(),
            }
        };
        format!("{prefix}{}{painted}", connector.cyan())
    }

    fn marker(&self, prefix: &str) -> String {
        let text = "(...more nodes...)";
        if self.opts.styled {
            format!("{prefix}{}{}\n", "└── ".cyan(), text.red())
        } else {
            format!("{prefix}└── {text}\n")
        }
    }

    /// Emit `label` and (budget permitting) its subtree.
    ///
    /// `visited` is copied on descent so cycle detection stays branch-local;
    /// `self.lines` is threaded across the whole pass so the total never
    /// exceeds the viewport.
    fn emit(
        &mut self,
        label: &str,
        prefix: &str,
        is_last: bool,
        mut visited: HashSet<String>,
        depth: usize,
    ) -> String {
        if self.lines >= self.opts.height {
            return String::new();
        }

        // Ancestor-chain cycle, or past the depth cap: show the node once
        // with a continuation marker instead of recursing.
        if visited.contains(label) || depth > self.max_depth {
            self.lines += 1;
            let ellipsis = if self.opts.styled {
                "(...)".red().to_string()
            } else {
                "(...)".to_string()
            };
            return format!("{} {ellipsis}\n", self.line(label, prefix, is_last, depth));
        }
        visited.insert(label.to_string());

        let mut out = format!("{}\n", self.line(label, prefix, is_last, depth));
        self.lines += 1;

        let children = self.graph.successors(label);
        if children.is_empty() || self.lines >= self.opts.height {
            return out;
        }

        let next_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });

        // Focus-path children first, otherwise stable.
        let mut ordered: Vec<String> = children.to_vec();
        ordered.sort_by_key(|c| !self.focus.contains(c));

        let remaining = self.opts.height - self.lines;
        let (picked, has_more) = select_children(&ordered, &self.focus, remaining);

        for (i, child) in picked.iter().enumerate() {
            let last_child = i + 1 == picked.len() && !has_more;
            out.push_str(&self.emit(child, &next_prefix, last_child, visited.clone(), depth + 1));
            if self.lines >= self.opts.height {
                break;
            }
        }

        if has_more && self.lines < self.opts.height {
            out.push_str(&self.marker(&next_prefix));
            self.lines += 1;
        }
        out
    }
}

/// Render the graph from its root into at most `opts.height` lines.
pub fn render_tree(graph: &ConceptGraph, opts: &RenderOptions) -> Result<String, TreeError> {
    let root = graph.root().ok_or(TreeError::EmptyGraph)?;

    let focus_path: Vec<String> = opts
        .focus
        .as_deref()
        .map(|f| graph.ancestor_path(f))
        .unwrap_or_default();

    let max_depth = if focus_path.is_empty() {
        // More height, more levels, within a small range.
        opts.max_depth
            .unwrap_or_else(|| (opts.height / 3).clamp(2, 5))
    } else {
        // Always deep enough to show the focus node's children.
        opts.max_depth.unwrap_or(0).max(focus_path.len() + 1)
    };

    let mut pass = TreePass {
        graph,
        focus: focus_path.into_iter().collect(),
        max_depth,
        opts,
        lines: 0,
    };
    Ok(pass.emit(root, "", true, HashSet::new(), 0))
}
