//! Ramify: Diversity-Biased Concept Explorer
//!
//! Grows a directed concept tree by repeatedly asking a local LLM (Ollama)
//! for related concepts, breadth-first, while rendering the tree live inside
//! a bounded terminal viewport.
//!
//! # Core Concepts
//!
//! - **Concept Graph**: concepts as labeled nodes, discovery links as edges
//! - **Exploration Engine**: BFS with dedup, depth limits, and a
//!   diversity-biased reordering of newly discovered concepts
//! - **Bounded Renderer**: projects an arbitrarily wide tree into at most
//!   `height` terminal rows, always keeping the focus path visible
//!
//! # Example
//!
//! ```
//! use ramify::ConceptGraph;
//!
//! let mut graph = ConceptGraph::new();
//! graph.add_node("Consciousness");
//! assert_eq!(graph.root(), Some("Consciousness"));
//! ```

mod graph;
pub mod explore;
pub mod export;
pub mod gateway;
pub mod ollama;
pub mod render;
pub mod score;

pub use explore::{
    CancelToken, ExploreOptions, Explorer, LiveView, NullView, TerminalView, ViewStatus,
};
pub use export::export_tree;
pub use gateway::ConceptGateway;
pub use graph::{ConceptGraph, TreeError};
pub use ollama::{resolve_model, HttpOllama, MockOllama, OllamaClient, OllamaError};
pub use render::{render_tree, RenderOptions};
pub use score::{diversity_score, rank_by_diversity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
