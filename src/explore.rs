//! Exploration engine — breadth-first concept discovery
//!
//! Owns the run's mutable state (graph, seen-as-source set, highlight
//! markers) and drives the gateway one expansion at a time. Strictly
//! sequential: one generation call in flight, a view refresh after every
//! graph mutation, and short pauses as a courtesy toward the backend.

use crate::gateway::ConceptGateway;
use crate::graph::{ConceptGraph, TreeError};
use crate::render::{render_tree, RenderOptions};
use crate::score::rank_by_diversity;
use colored::Colorize;
use std::collections::{HashSet, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Absolute expansion depth ceiling, independent of the configured limit.
const HARD_DEPTH_CEILING: usize = 5;

/// Cooperative cancellation for an exploration run.
///
/// The interrupt handler sets the token; the engine checks it at the top of
/// each queue iteration, so committed nodes and edges stay valid and the
/// partial graph remains exportable.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// What the live view needs to know about the run, per refresh.
pub struct ViewStatus<'a> {
    /// Node whose ancestor chain should stay visible
    pub focus: Option<&'a str>,
    /// Node currently being expanded
    pub current: Option<&'a str>,
    /// Most recently added node
    pub last_added: Option<&'a str>,
    /// Display depth cap chosen by the engine
    pub display_depth: Option<usize>,
}

/// Read-only observer of exploration progress.
pub trait LiveView {
    fn refresh(&mut self, graph: &ConceptGraph, status: &ViewStatus);
}

/// View that does nothing. For tests and quiet runs.
#[derive(Debug, Default)]
pub struct NullView;

impl LiveView for NullView {
    fn refresh(&mut self, _graph: &ConceptGraph, _status: &ViewStatus) {}
}

/// Full-screen terminal view: header, bounded tree, stats footer.
///
/// Terminal size is re-read on every refresh so resizes take effect
/// mid-run; an 80x24 fallback covers environments without a size probe.
#[derive(Debug, Default)]
pub struct TerminalView;

impl TerminalView {
    pub fn new() -> Self {
        Self
    }
}

impl LiveView for TerminalView {
    fn refresh(&mut self, graph: &ConceptGraph, status: &ViewStatus) {
        let (width, height) = crossterm::terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((80, 24));

        let mut stdout = std::io::stdout();
        let _ = crossterm::execute!(
            stdout,
            crossterm::terminal::Clear(crossterm::terminal::ClearType::All),
            crossterm::cursor::MoveTo(0, 0)
        );

        let rule = "═".repeat(50.min(width.saturating_sub(2)));
        let _ = writeln!(stdout, "{}", "🌳 CONCEPT EXPLORER 🌳".green().bold());
        let _ = writeln!(stdout, "{}\n", rule.cyan());

        // Header (3) + footer (3) + exploring line (2) + margins (2).
        let tree_height = height.saturating_sub(10).max(1);
        let opts = RenderOptions {
            focus: status.focus.map(str::to_string),
            max_depth: status.display_depth,
            height: tree_height,
            width,
            current: status.current.map(str::to_string),
            last_added: status.last_added.map(str::to_string),
            styled: true,
        };
        match render_tree(graph, &opts) {
            Ok(tree) => {
                let _ = write!(stdout, "{tree}");
            }
            Err(TreeError::EmptyGraph) => {
                let _ = writeln!(stdout, "{}", "No root nodes found yet".red());
            }
        }

        let _ = writeln!(stdout, "\n{}", rule.cyan());
        let stats = format!(
            "📊 Concepts: {} | Connections: {} | Display depth: {}",
            graph.node_count(),
            graph.edge_count(),
            status
                .display_depth
                .map(|d| d.to_string())
                .unwrap_or_else(|| "auto".to_string()),
        );
        let _ = writeln!(stdout, "{}", stats.yellow());

        if let Some(current) = status.current {
            let mut shown = current.to_string();
            let budget = width.saturating_sub(25);
            if shown.chars().count() > budget && budget > 3 {
                shown = shown.chars().take(budget - 3).collect::<String>() + "...";
            }
            let _ = writeln!(stdout, "{} {}", "🔍 Exploring:".cyan(), shown.yellow());
        }
        let _ = stdout.flush();
    }
}

/// Tunables for one exploration run.
#[derive(Debug, Clone)]
pub struct ExploreOptions {
    /// Expansion stops at this depth (the hard ceiling of 5 still applies)
    pub max_depth: usize,
    /// Probability that a batch of candidates is reordered by novelty
    pub diversity_bias: f64,
    /// Pause after each node addition (live-view pacing)
    pub node_pause: Duration,
    /// Pause after each full expansion (backend rate limiting)
    pub expand_pause: Duration,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            diversity_bias: 0.8,
            node_pause: Duration::from_millis(500),
            expand_pause: Duration::from_millis(500),
        }
    }
}

/// The exploration engine. Create one per run.
pub struct Explorer {
    gateway: ConceptGateway,
    graph: ConceptGraph,
    seen: HashSet<String>,
    current: Option<String>,
    last_added: Option<String>,
    options: ExploreOptions,
    cancel: CancelToken,
    view: Box<dyn LiveView + Send>,
    /// Uniform draw in [0,1) deciding the diversity-reorder branch.
    /// Injected so tests can force either outcome.
    draw: Box<dyn FnMut() -> f64 + Send>,
}

impl Explorer {
    pub fn new(gateway: ConceptGateway) -> Self {
        Self {
            gateway,
            graph: ConceptGraph::new(),
            seen: HashSet::new(),
            current: None,
            last_added: None,
            options: ExploreOptions::default(),
            cancel: CancelToken::new(),
            view: Box::new(NullView),
            draw: Box::new(rand::random::<f64>),
        }
    }

    pub fn with_options(mut self, options: ExploreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_view(mut self, view: impl LiveView + Send + 'static) -> Self {
        self.view = Box::new(view);
        self
    }

    pub fn with_draw(mut self, draw: impl FnMut() -> f64 + Send + 'static) -> Self {
        self.draw = Box::new(draw);
        self
    }

    /// Token to cancel this run from another task (e.g. a ctrl-c handler).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn graph(&self) -> &ConceptGraph {
        &self.graph
    }

    fn refresh(&mut self, focus: Option<&str>, display_depth: Option<usize>) {
        let status = ViewStatus {
            focus,
            current: self.current.as_deref(),
            last_added: self.last_added.as_deref(),
            display_depth,
        };
        self.view.refresh(&self.graph, &status);
    }

    /// Build the concept web breadth-first from `root`.
    ///
    /// The graph is mutated in place and readable through [`Self::graph`]
    /// afterwards — including after cancellation, when it holds whatever
    /// was committed so far.
    pub async fn explore(&mut self, root: &str) {
        self.graph.add_node(root);
        self.refresh(None, None);

        let display_depth = self.options.max_depth.min(3);
        let mut queue: VecDeque<(String, usize, Vec<String>)> = VecDeque::new();
        queue.push_back((root.to_string(), 0, Vec::new()));

        while let Some((concept, depth, path)) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                info!("exploration cancelled; keeping {} concepts", self.graph.node_count());
                break;
            }
            if depth >= self.options.max_depth {
                continue;
            }
            // Loop guard plus the absolute ceiling: a concept expands at
            // most once, and never past depth 5.
            if self.seen.contains(&concept) || depth > HARD_DEPTH_CEILING {
                debug!("skipping expansion of {concept:?} at depth {depth}");
                continue;
            }
            self.seen.insert(concept.clone());
            self.current = Some(concept.clone());
            self.refresh(Some(&concept), Some(display_depth));

            info!("exploring concepts related to {concept:?}");
            let mut candidates = self
                .gateway
                .fetch_related(&concept, &path, &self.seen)
                .await;

            if !candidates.is_empty() && (self.draw)() < self.options.diversity_bias {
                rank_by_diversity(&mut candidates, &self.seen);
            }

            for candidate in candidates {
                if self.graph.add_node(candidate.clone()) {
                    self.last_added = Some(candidate.clone());
                }
                self.graph.add_edge(&concept, &candidate);

                let mut child_path = path.clone();
                child_path.push(concept.clone());
                queue.push_back((candidate.clone(), depth + 1, child_path));

                self.refresh(Some(&candidate), Some(display_depth));
                tokio::time::sleep(self.options.node_pause).await;
            }

            tokio::time::sleep(self.options.expand_pause).await;
        }

        self.current = None;
        self.last_added = None;
        self.refresh(None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::MockOllama;

    fn quiet_options() -> ExploreOptions {
        ExploreOptions {
            node_pause: Duration::ZERO,
            expand_pause: Duration::ZERO,
            ..Default::default()
        }
    }

    fn explorer(client: Arc<MockOllama>, options: ExploreOptions) -> Explorer {
        let gateway = ConceptGateway::new(client, "llama3");
        Explorer::new(gateway).with_options(options)
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn root_with_two_children_in_returned_order_when_draw_fails() {
        let client = Arc::new(
            MockOllama::with_models(&["llama3:latest"]).with_reply(r#"concept: "X""#, r#"["Y", "Z"]"#),
        );
        let mut engine = explorer(client, quiet_options())
            // Draw never under the bias: generator order is kept.
            .with_draw(|| 1.0);
        engine.explore("X").await;

        assert_eq!(engine.graph().successors("X"), ["Y", "Z"]);
        assert_eq!(engine.graph().root(), Some("X"));
        assert_eq!(engine.graph().node_count(), 3);
    }

    #[tokio::test]
    async fn forced_draw_reorders_candidates_by_novelty() {
        let client = Arc::new(
            MockOllama::with_models(&["llama3:latest"])
                .with_reply(r#"concept: "ocean currents""#, r#"["ocean floor", "clockwork"]"#),
        );
        let mut engine = explorer(client, quiet_options()).with_draw(|| 0.0);
        engine.explore("ocean currents").await;

        // "clockwork" shares no word with the seen set, "ocean floor" does.
        assert_eq!(
            engine.graph().successors("ocean currents"),
            ["clockwork", "ocean floor"]
        );
    }

    #[tokio::test]
    async fn malformed_response_enqueues_nothing() {
        let client = Arc::new(
            MockOllama::with_models(&["llama3:latest"])
                .with_reply(r#"concept: "Seed""#, "no brackets in this reply")
                .with_fallback(r#"["should never appear"]"#),
        );
        let mut engine = explorer(client.clone(), quiet_options());
        engine.explore("Seed").await;

        assert_eq!(engine.graph().node_count(), 1);
        assert_eq!(engine.graph().edge_count(), 0);
        // Only the seed was ever expanded.
        assert_eq!(client.prompts().len(), 1);
    }

    #[tokio::test]
    async fn a_concept_is_expanded_as_a_source_at_most_once() {
        // B and C both point back at each other through the LLM, but the
        // seen guard keeps each to a single expansion.
        let client = Arc::new(
            MockOllama::with_models(&["llama3:latest"])
                .with_reply(r#"concept: "Seed""#, r#"["B", "C"]"#)
                .with_reply(r#"concept: "B""#, r#"["C"]"#)
                .with_reply(r#"concept: "C""#, r#"["B"]"#),
        );
        let mut engine = explorer(client.clone(), quiet_options()).with_draw(|| 1.0);
        engine.explore("Seed").await;

        let expanded: Vec<String> = client.prompts();
        assert_eq!(expanded.len(), 3, "seed, B, C — nothing twice");
    }

    #[tokio::test]
    async fn expansion_respects_the_hard_depth_ceiling() {
        let mut client = MockOllama::with_models(&["llama3:latest"])
            .with_reply(r#"concept: "Seed""#, r#"["C1"]"#);
        for i in 1..10 {
            client = client.with_reply(
                format!(r#"concept: "C{i}""#),
                format!(r#"["C{}"]"#, i + 1),
            );
        }
        let options = ExploreOptions {
            max_depth: 50,
            ..quiet_options()
        };
        let mut engine = explorer(Arc::new(client), options).with_draw(|| 1.0);
        engine.explore("Seed").await;

        // C6 sits at depth 6 — discovered, but never expanded.
        assert!(engine.graph().contains("C6"));
        assert!(!engine.graph().contains("C7"));
    }

    #[tokio::test]
    async fn cancelled_run_stops_immediately_but_stays_exportable() {
        let client = Arc::new(
            MockOllama::with_models(&["llama3:latest"]).with_reply(r#"concept: "Seed""#, r#"["B"]"#),
        );
        let mut engine = explorer(client, quiet_options());
        engine.cancel_token().cancel();
        engine.explore("Seed").await;

        assert_eq!(engine.graph().node_count(), 1);
        assert!(crate::export::export_tree(engine.graph()).is_ok());
    }

    #[tokio::test]
    async fn unreachable_backend_leaves_only_the_seed() {
        let mut engine = explorer(Arc::new(MockOllama::unreachable()), quiet_options());
        engine.explore("Seed").await;
        assert_eq!(engine.graph().node_count(), 1);
        assert_eq!(engine.graph().root(), Some("Seed"));
    }
}
