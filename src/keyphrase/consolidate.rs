//! Keyphrase consolidation
//!
//! Near-duplicate phrases produced by several extraction methods are folded
//! into their longest common substring; phrases with no close match pass
//! through. Auxiliary phrases found verbatim in the document are appended.

use super::lcs::longest_common_substring;
use super::similarity::{close_matches, SimilarityMeasure};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Consolidation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationParams {
    /// Minimum similarity for two phrases to fall in one cluster
    pub cutoff: f64,
    pub measure: SimilarityMeasure,
    /// Tokens of the common substring shorter than this are dropped
    pub min_token_chars: usize,
}

impl Default for ConsolidationParams {
    fn default() -> Self {
        Self {
            cutoff: 0.7,
            measure: SimilarityMeasure::JaroWinkler,
            min_token_chars: 3,
        }
    }
}

/// Folds multi-method extraction output into one phrase list per document
#[derive(Debug, Clone, Default)]
pub struct KeyphraseConsolidator {
    params: ConsolidationParams,
}

impl KeyphraseConsolidator {
    pub fn new(params: ConsolidationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ConsolidationParams {
        &self.params
    }

    /// Consolidate the outputs of each method (in method order) and append the
    /// auxiliary phrases matched against `text`.
    pub fn consolidate(&self, method_outputs: &[Vec<String>], text: &str, auxiliary: &[String]) -> Vec<String> {
        let flattened: Vec<String> = method_outputs.iter().flatten().cloned().collect();
        let mut phrases = remove_common_strings(&flattened, &self.params);
        let merged = phrases.len();

        for found in find_keys_in_text(text, auxiliary) {
            if !phrases.contains(&found) {
                phrases.push(found);
            }
        }
        debug!(
            candidates = flattened.len(),
            consolidated = merged,
            auxiliary = phrases.len() - merged,
            "keyphrases consolidated"
        );
        phrases
    }
}

/// The longest common substring of a cluster, with short tokens removed
fn cluster_phrase(members: &[&str], min_token_chars: usize) -> String {
    let common = longest_common_substring(members);
    common
        .split_whitespace()
        .filter(|token| token.chars().count() >= min_token_chars)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace each phrase that has close matches by the longest common substring
/// of its cluster. Output is lower-cased and deduplicated in first-seen order.
pub fn remove_common_strings(phrases: &[String], params: &ConsolidationParams) -> Vec<String> {
    let lowered: Vec<String> = phrases.iter().map(|p| p.to_lowercase()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();

    for phrase in &lowered {
        let matches = close_matches(phrase, &lowered, params.cutoff, params.measure);
        let candidate = if matches.len() > 1 {
            let mut members: Vec<&str> = vec![phrase.as_str()];
            members.extend(matches.iter().map(|&i| lowered[i].as_str()));
            cluster_phrase(&members, params.min_token_chars)
        } else {
            phrase.clone()
        };

        if !candidate.is_empty() && seen.insert(candidate.clone()) {
            results.push(candidate);
        }
    }
    results
}

/// Auxiliary phrases that occur verbatim (case-insensitively) in `text`,
/// lower-cased, blank entries ignored
pub fn find_keys_in_text(text: &str, keyphrases: &[String]) -> Vec<String> {
    let text = text.to_lowercase();
    let mut found: Vec<String> = Vec::new();
    for key in keyphrases.iter().map(|k| k.trim().to_lowercase()) {
        if !key.is_empty() && text.contains(&key) && !found.contains(&key) {
            found.push(key);
        }
    }
    found
}

fn token_set(phrase: &str) -> HashSet<String> {
    phrase.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Number of phrases in the shorter list sharing at least one token with some
/// phrase of the longer list
pub fn partial_match(assigned: &[String], extracted: &[String]) -> f64 {
    let (shorter, longer) = if assigned.len() <= extracted.len() {
        (assigned, extracted)
    } else {
        (extracted, assigned)
    };
    let longer_sets: Vec<HashSet<String>> = longer.iter().map(|p| token_set(p)).collect();
    shorter
        .iter()
        .map(|p| token_set(p))
        .filter(|tokens| longer_sets.iter().any(|other| !tokens.is_disjoint(other)))
        .count() as f64
}

/// Phrases of `source` sharing no token with any phrase of `target`
pub fn keyphrase_difference(source: &[String], target: &[String]) -> Vec<String> {
    let target_sets: Vec<HashSet<String>> = target.iter().map(|p| token_set(p)).collect();
    source
        .iter()
        .filter(|p| {
            let tokens = token_set(p);
            target_sets.iter().all(|other| tokens.is_disjoint(other))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn with_cutoff(cutoff: f64) -> ConsolidationParams {
        ConsolidationParams {
            cutoff,
            ..ConsolidationParams::default()
        }
    }

    #[test]
    fn test_near_duplicates_collapse() {
        let result = remove_common_strings(&strings(&["energy", "energy storage"]), &with_cutoff(0.7));
        assert_eq!(result, vec!["energy"]);
    }

    #[test]
    fn test_singletons_pass_through_lowercased() {
        let result = remove_common_strings(&strings(&["Biomass", "ocean waves"]), &with_cutoff(0.7));
        assert_eq!(result, vec!["biomass", "ocean waves"]);
    }

    #[test]
    fn test_short_tokens_are_dropped() {
        let phrase = cluster_phrase(&["an ev charger", "an ev charging"], 3);
        assert_eq!(phrase, "charg");
        assert_eq!(cluster_phrase(&["ab", "ab"], 3), "");
    }

    #[test]
    fn test_consolidate_flattens_in_method_order_and_appends_auxiliary() {
        let consolidator = KeyphraseConsolidator::default();
        let outputs = vec![strings(&["Smart Grid", "biomass"]), strings(&["smart grids"])];
        let auxiliary = strings(&["Horizon 2020", "fusion", "", "BIOMASS"]);
        let text = "A Horizon 2020 project on smart grids and biomass.";

        let result = consolidator.consolidate(&outputs, text, &auxiliary);
        assert_eq!(result, vec!["smart grid", "biomass", "horizon 2020"]);
    }

    #[test]
    fn test_deterministic() {
        let phrases = strings(&["solar cells", "solar cell", "perovskite", "perovskite solar", "tandem"]);
        let params = ConsolidationParams::default();
        assert_eq!(remove_common_strings(&phrases, &params), remove_common_strings(&phrases, &params));
    }

    #[test]
    fn test_cutoff_is_monotone() {
        let phrases = strings(&["solar cells", "solar cell", "perovskite", "perovskite solar", "tandem cells"]);
        let cluster_sizes = |cutoff: f64| -> usize {
            phrases
                .iter()
                .map(|p| close_matches(p, &phrases, cutoff, SimilarityMeasure::JaroWinkler).len())
                .sum()
        };
        let mut previous = usize::MAX;
        for cutoff in [0.3, 0.5, 0.7, 0.8, 0.9, 1.0] {
            let size = cluster_sizes(cutoff);
            assert!(size <= previous);
            previous = size;
        }
        assert_eq!(previous, phrases.len());
    }

    #[test]
    fn test_output_bound() {
        let phrases = strings(&["wind", "wind farm", "wind farms", "offshore wind"]);
        let auxiliary = strings(&["turbine"]);
        let consolidator = KeyphraseConsolidator::default();
        let result = consolidator.consolidate(&[phrases.clone()], "offshore turbine", &auxiliary);
        assert!(result.len() <= phrases.len() + auxiliary.len());
    }

    #[test]
    fn test_find_keys_in_text() {
        let keys = strings(&["Fuel Cell", "hydrogen", "fuel cell", "  "]);
        assert_eq!(
            find_keys_in_text("Hydrogen FUEL CELL stacks", &keys),
            vec!["fuel cell", "hydrogen"]
        );
    }

    #[test]
    fn test_partial_match_uses_shorter_list() {
        let assigned = strings(&["energy storage", "grid"]);
        let extracted = strings(&["storage systems", "battery", "smart grid", "policy"]);
        assert_eq!(partial_match(&assigned, &extracted), 2.0);
        assert_eq!(partial_match(&extracted, &assigned), 2.0);
        assert_eq!(partial_match(&[], &extracted), 0.0);
    }

    #[test]
    fn test_keyphrase_difference() {
        let source = strings(&["solar power", "wind farm", "biomass"]);
        let target = strings(&["Power grid", "farm subsidies"]);
        assert_eq!(keyphrase_difference(&source, &target), vec!["biomass"]);
    }
}
