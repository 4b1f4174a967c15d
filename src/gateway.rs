//! Generator gateway — turns one concept into candidate related concepts
//!
//! Owns the prompt, the best-effort JSON-array extraction, and the candidate
//! filtering. Every failure mode (backend unreachable, model missing,
//! malformed response) is absorbed here and surfaced as an empty candidate
//! list with a diagnostic; nothing propagates to the exploration loop.

use crate::ollama::{resolve_model, OllamaClient};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default display-width budget for a candidate label.
pub const DEFAULT_LABEL_WIDTH: usize = 26;

/// Extract the first `[` .. last `]` span of `raw` as a JSON string array.
///
/// Best-effort by design: it tolerates prose wrapped around the array, and
/// mis-parses when explanatory prose itself contains a bracket before the
/// real array. Known limitation, deliberately preserved.
fn extract_array(raw: &str) -> Option<Vec<String>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if start >= end {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Truncate a label to `width` display characters, ellipsis included.
fn clip_label(label: &str, width: usize) -> String {
    if label.chars().count() <= width {
        return label.to_string();
    }
    let kept: String = label.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Gateway to the generation backend for one exploration run.
pub struct ConceptGateway {
    client: Arc<dyn OllamaClient>,
    model: String,
    max_label_width: usize,
}

impl ConceptGateway {
    pub fn new(client: Arc<dyn OllamaClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_label_width: DEFAULT_LABEL_WIDTH,
        }
    }

    /// Set the display-width budget candidates are clipped to.
    pub fn with_label_width(mut self, width: usize) -> Self {
        self.max_label_width = width.max(4);
        self
    }

    /// The model the gateway currently targets (tag-qualified once resolved).
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Confirm the configured model is available, upgrading a bare name to
    /// its tag-qualified form for subsequent calls.
    pub async fn ensure_model(&mut self) -> bool {
        let available = match self.client.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!("could not list models: {e}");
                return false;
            }
        };
        match resolve_model(&available, &self.model) {
            Some(resolved) => {
                if resolved != self.model {
                    info!("resolved model '{}' to '{}'", self.model, resolved);
                    self.model = resolved;
                }
                true
            }
            None => {
                warn!("model '{}' is not available", self.model);
                false
            }
        }
    }

    fn build_prompt(&self, concept: &str, path: &[String]) -> String {
        let mut full_path: Vec<&str> = path.iter().map(String::as_str).collect();
        full_path.push(concept);
        let trail = full_path.join(" → ");
        format!(
            r#"Starting with the concept: "{concept}", generate 4-5 fascinating and unexpected related concepts.

Context: We're building a concept web and have followed this path to get here:
{trail}

Guidelines:
1. Seek maximum intellectual diversity - span across domains like science, art, philosophy, technology, culture, etc.
2. Each concept should be expressed in 1-5 words (shorter is better)
3. Avoid obvious associations - prefer surprising or thought-provoking connections
4. Consider how your suggested concepts relate to BOTH:
   - The immediate parent concept "{concept}"
   - The overall path context: {trail}
5. Consider these different types of relationships:
   - Metaphorical parallels
   - Contrasting opposites
   - Historical connections
   - Philosophical implications
   - Cross-disciplinary applications

Avoid any concepts already in the path. Be creative but maintain meaningful connections.

Return ONLY a JSON array of strings, with no explanation or additional text.
Example: ["Related concept 1", "Related concept 2", "Related concept 3", "Related concept 4"]
"#
        )
    }

    /// Drop empty candidates and candidates case-insensitively equal to a
    /// seen concept; clip the rest to the label width budget.
    fn filter_candidates(&self, raw: Vec<String>, seen: &HashSet<String>) -> Vec<String> {
        let seen_lower: HashSet<String> = seen.iter().map(|s| s.to_lowercase()).collect();
        let mut kept = Vec::new();
        for candidate in raw {
            let candidate = clip_label(&candidate, self.max_label_width);
            if candidate.trim().is_empty() || seen_lower.contains(&candidate.to_lowercase()) {
                debug!("rejected candidate: {candidate:?}");
                continue;
            }
            kept.push(candidate);
        }
        kept
    }

    /// Fetch related concepts for `concept`, with `path` (its ancestors) as
    /// prompt context and `seen` as the novelty filter.
    ///
    /// Always returns a list; failures yield an empty one.
    pub async fn fetch_related(
        &mut self,
        concept: &str,
        path: &[String],
        seen: &HashSet<String>,
    ) -> Vec<String> {
        if !self.ensure_model().await {
            return Vec::new();
        }

        let prompt = self.build_prompt(concept, path);
        let raw = match self.client.generate(&self.model, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("generation failed for {concept:?}: {e}");
                return Vec::new();
            }
        };

        let Some(decoded) = extract_array(&raw) else {
            warn!("no JSON array in response for {concept:?}; raw response: {raw}");
            return Vec::new();
        };

        let kept = self.filter_candidates(decoded, seen);
        info!("found {} valid related concepts for {concept:?}", kept.len());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::MockOllama;

    fn gateway(client: MockOllama) -> ConceptGateway {
        ConceptGateway::new(Arc::new(client), "llama3")
    }

    #[test]
    fn extract_array_tolerates_surrounding_prose() {
        let raw = "Here are some concepts:\n[\"Entropy\", \"Origami\"]\nEnjoy!";
        assert_eq!(
            extract_array(raw),
            Some(vec!["Entropy".to_string(), "Origami".to_string()])
        );
    }

    #[test]
    fn extract_array_fails_without_brackets() {
        assert_eq!(extract_array("no array here"), None);
        assert_eq!(extract_array("] backwards ["), None);
    }

    #[test]
    fn extract_array_fails_on_non_string_items() {
        assert_eq!(extract_array("[1, 2, 3]"), None);
    }

    #[test]
    fn clip_label_appends_ellipsis() {
        assert_eq!(clip_label("short", 26), "short");
        assert_eq!(clip_label("abcdefghij", 8), "abcde...");
    }

    #[tokio::test]
    async fn fetch_returns_decoded_candidates_in_order() {
        let client = MockOllama::with_models(&["llama3:latest"])
            .with_reply("Consciousness", r#"["Mirror Test", "Qualia", "Sleep"]"#);
        let mut gw = gateway(client);
        let out = gw
            .fetch_related("Consciousness", &[], &HashSet::new())
            .await;
        assert_eq!(out, ["Mirror Test", "Qualia", "Sleep"]);
        // Bare name upgraded to the tagged form for subsequent calls.
        assert_eq!(gw.model(), "llama3:latest");
    }

    #[tokio::test]
    async fn fetch_filters_seen_case_insensitively_and_blanks() {
        let client = MockOllama::with_models(&["llama3:latest"])
            .with_reply("Time", r#"["  ", "ENTROPY", "Sundials"]"#);
        let mut gw = gateway(client);
        let seen: HashSet<String> = ["Entropy".to_string()].into();
        let out = gw.fetch_related("Time", &[], &seen).await;
        assert_eq!(out, ["Sundials"]);
    }

    #[tokio::test]
    async fn fetch_clips_overlong_candidates() {
        let client = MockOllama::with_models(&["llama3:latest"])
            .with_reply("X", r#"["A very long sprawling multi-word candidate label"]"#);
        let mut gw = gateway(client).with_label_width(12);
        let out = gw.fetch_related("X", &[], &HashSet::new()).await;
        assert_eq!(out, ["A very lo..."]);
    }

    #[tokio::test]
    async fn malformed_response_yields_no_candidates() {
        let client = MockOllama::with_models(&["llama3:latest"])
            .with_reply("Time", "I would rather chat about time in prose.");
        let mut gw = gateway(client);
        assert!(gw.fetch_related("Time", &[], &HashSet::new()).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_yields_no_candidates() {
        let mut gw = gateway(MockOllama::unreachable());
        assert!(gw.fetch_related("Time", &[], &HashSet::new()).await.is_empty());
    }

    #[tokio::test]
    async fn missing_model_yields_no_candidates() {
        let client = MockOllama::with_models(&["qwen2:7b"]);
        let mut gw = gateway(client);
        assert!(gw.fetch_related("Time", &[], &HashSet::new()).await.is_empty());
    }

    #[tokio::test]
    async fn prompt_carries_the_ancestor_trail() {
        let gw = gateway(MockOllama::with_models(&["llama3"]));
        let path = vec!["Consciousness".to_string(), "Dreams".to_string()];
        let prompt = gw.build_prompt("Lucidity", &path);
        assert!(prompt.contains("Consciousness → Dreams → Lucidity"));
        assert!(prompt.contains("JSON array of strings"));
    }
}
