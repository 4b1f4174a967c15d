//! Ramify CLI — grow a concept web from a seed, live in the terminal.
//!
//! Usage:
//!   ramify [SEED] [--model llama3] [--diversity 0.8] [--depth 3]

use clap::Parser;
use colored::Colorize;
use ramify::ollama::DEFAULT_HOST;
use ramify::{
    export_tree, resolve_model, ConceptGateway, ExploreOptions, Explorer, HttpOllama,
    OllamaClient, TerminalView,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "ramify",
    version,
    about = "Diversity-biased concept explorer with a live terminal tree view"
)]
struct Cli {
    /// Seed concept to explore from
    #[arg(default_value = "Consciousness")]
    seed: String,
    /// Ollama model to query; a bare name resolves to its first tag
    #[arg(long, default_value = "llama3")]
    model: String,
    /// Probability (0-1) that new candidates are reordered by lexical novelty
    #[arg(long, default_value_t = 0.8)]
    diversity: f64,
    /// Maximum exploration depth
    #[arg(long, default_value_t = 3)]
    depth: usize,
    /// Ollama endpoint
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
}

/// Candidate labels get a third of the terminal width, like the tree does.
fn label_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize / 3)
        .unwrap_or(26)
        .max(8)
}

/// Verify the configured model exists before starting; a missing model is
/// startup-fatal, with the available list printed for the operator.
async fn preflight(client: &HttpOllama, configured: &str) -> Option<String> {
    let available = match client.list_models().await {
        Ok(models) => models,
        Err(e) => {
            eprintln!("{}", format!("Error connecting to Ollama: {e}").red());
            return None;
        }
    };
    if let Some(model) = resolve_model(&available, configured) {
        return Some(model);
    }
    eprintln!(
        "{}",
        format!("Error: model '{configured}' is not available in Ollama.").red()
    );
    eprintln!(
        "{}",
        format!("Pull it first with: 'ollama pull {configured}'").yellow()
    );
    if available.is_empty() {
        eprintln!("No models available. Pull one with: 'ollama pull <model_name>'");
    } else {
        eprintln!("{}", "Available models:".green());
        for (i, model) in available.iter().enumerate() {
            eprintln!("  {}. {}", i + 1, model.cyan());
        }
        eprintln!("Try one of these with: ramify --model=<model_name>");
    }
    None
}

async fn run(cli: Cli) -> i32 {
    let diversity = if (0.0..=1.0).contains(&cli.diversity) {
        cli.diversity
    } else {
        warn!("invalid diversity {}, using default 0.8", cli.diversity);
        0.8
    };
    let depth = if cli.depth == 0 {
        warn!("invalid depth 0, using default 3");
        3
    } else {
        cli.depth
    };

    let client = Arc::new(HttpOllama::with_host(&cli.host));
    let Some(model) = preflight(client.as_ref(), &cli.model).await else {
        return 1;
    };

    println!("{} {}", "Starting concept:".yellow(), cli.seed.white().bold());
    println!("{} {}", "Using model:".yellow(), model.white());
    println!("{} {}", "Diversity bias:".yellow(), diversity);
    println!("{} {}", "Max depth:".yellow(), depth);

    let gateway = ConceptGateway::new(client, model).with_label_width(label_width());
    let mut engine = Explorer::new(gateway)
        .with_options(ExploreOptions {
            max_depth: depth,
            diversity_bias: diversity,
            ..Default::default()
        })
        .with_view(TerminalView::new());

    let token = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    engine.explore(&cli.seed).await;

    if engine.cancel_token().is_cancelled() {
        println!("\n{}", "Exploration interrupted by user.".yellow());
    } else {
        println!("\n{}", "🎉 Concept exploration complete!".green());
    }

    // Partial graphs export the same way completed ones do.
    let out_path = format!("{}_concept_web.txt", cli.seed.to_lowercase());
    match export_tree(engine.graph()) {
        Ok(text) => {
            if let Err(e) = std::fs::write(&out_path, text) {
                eprintln!("Error: could not write '{out_path}': {e}");
                return 1;
            }
            println!("{} {}", "📝 Tree exported to".green(), out_path);
        }
        Err(e) => {
            eprintln!("Warning: nothing to export: {e}");
        }
    }

    println!(
        "{}",
        format!(
            "✨ Generated concept web with {} concepts and {} connections.",
            engine.graph().node_count(),
            engine.graph().edge_count()
        )
        .green()
    );
    0
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}
