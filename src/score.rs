//! Lexical diversity scoring
//!
//! A deliberately naive novelty heuristic: a candidate earns one point for
//! every existing concept it shares no (lowercased, whitespace-split) word
//! with. No embeddings, no stemming.

use std::cmp::Reverse;
use std::collections::HashSet;

fn word_set(label: &str) -> HashSet<String> {
    label
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Score a candidate against already-seen concepts. Higher = more novel.
///
/// Monotonic: adding another lexically-disjoint existing concept can only
/// increase the score, never decrease it.
pub fn diversity_score<'a, I>(candidate: &str, existing: I) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    let candidate_words = word_set(candidate);
    existing
        .into_iter()
        .filter(|seen| word_set(seen).is_disjoint(&candidate_words))
        .count()
}

/// Stable sort, most lexically novel first. Ties keep the generator's order.
pub fn rank_by_diversity(candidates: &mut [String], existing: &HashSet<String>) {
    candidates.sort_by_key(|c| Reverse(diversity_score(c, existing)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(labels: &[&str]) -> HashSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn disjoint_concepts_each_add_one() {
        let existing = seen(&["ocean currents", "quantum foam"]);
        assert_eq!(diversity_score("clock towers", &existing), 2);
    }

    #[test]
    fn shared_word_scores_zero_for_that_concept() {
        let existing = seen(&["deep ocean", "mountain peaks"]);
        // Shares "ocean" with the first, disjoint from the second.
        assert_eq!(diversity_score("ocean floor", &existing), 1);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let existing = seen(&["Ocean Currents"]);
        assert_eq!(diversity_score("ocean floor", &existing), 0);
    }

    #[test]
    fn empty_seen_set_scores_zero() {
        assert_eq!(diversity_score("anything", &HashSet::new()), 0);
    }

    #[test]
    fn score_is_monotonic_in_disjoint_additions() {
        let mut existing = seen(&["red shift"]);
        let before = diversity_score("baroque music", &existing);
        existing.insert("plate tectonics".to_string());
        let after = diversity_score("baroque music", &existing);
        assert!(after >= before);
        assert_eq!(after, before + 1);
    }

    #[test]
    fn ranking_puts_most_novel_first_and_is_stable() {
        let existing = seen(&["ocean currents", "ocean floor"]);
        let mut candidates = vec![
            "ocean light".to_string(),  // shares a word with both: score 0
            "clockwork".to_string(),    // disjoint from both: score 2
            "tidal pull".to_string(),   // disjoint from both: score 2
        ];
        rank_by_diversity(&mut candidates, &existing);
        assert_eq!(candidates, ["clockwork", "tidal pull", "ocean light"]);
    }
}
