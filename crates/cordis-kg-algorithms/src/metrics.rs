//! Ranking metrics for binary link classification.

/// Area under the precision-recall curve (average precision).
///
/// `examples` are `(score, is_positive, weight)`. Higher scores mean "more
/// likely a link". Weights let a down-sampled negative class stand in for the
/// full class distribution. Tied scores are treated as a single threshold.
/// Returns 0.0 when there is no positive weight.
pub fn aucpr(examples: &[(f64, bool, f64)]) -> f64 {
    let total_pos: f64 = examples
        .iter()
        .filter(|(_, positive, _)| *positive)
        .map(|(_, _, w)| w)
        .sum();
    if total_pos <= 0.0 {
        return 0.0;
    }

    let mut sorted: Vec<&(f64, bool, f64)> = examples.iter().collect();
    sorted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut prev_recall = 0.0;
    let mut area = 0.0;

    let mut i = 0;
    while i < sorted.len() {
        let threshold = sorted[i].0;
        while i < sorted.len() && (sorted[i].0 - threshold).abs() < 1e-15 {
            let (_, positive, w) = *sorted[i];
            if positive {
                tp += w;
            } else {
                fp += w;
            }
            i += 1;
        }
        if tp + fp > 0.0 {
            let recall = tp / total_pos;
            let precision = tp / (tp + fp);
            area += (recall - prev_recall) * precision;
            prev_recall = recall;
        }
    }

    area.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking() {
        let examples = vec![(0.9, true, 1.0), (0.8, true, 1.0), (0.2, false, 1.0), (0.1, false, 1.0)];
        assert!((aucpr(&examples) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_ranking() {
        // pos ranked after both negatives: precision 1/3 at recall .5, 2/4 at recall 1
        let examples = vec![(0.9, false, 1.0), (0.8, false, 1.0), (0.2, true, 1.0), (0.1, true, 1.0)];
        let expected = 0.5 * (1.0 / 3.0) + 0.5 * 0.5;
        assert!((aucpr(&examples) - expected).abs() < 1e-12);
    }

    #[test]
    fn all_tied_equals_prevalence() {
        let examples = vec![(0.5, true, 1.0), (0.5, false, 1.0), (0.5, false, 1.0), (0.5, false, 1.0)];
        assert!((aucpr(&examples) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn negative_weights_lower_precision() {
        let unweighted = vec![(0.9, true, 1.0), (0.8, false, 1.0), (0.7, true, 1.0)];
        let weighted = vec![(0.9, true, 1.0), (0.8, false, 3.0), (0.7, true, 1.0)];
        assert!(aucpr(&weighted) < aucpr(&unweighted));
    }

    #[test]
    fn no_positives() {
        assert_eq!(aucpr(&[(0.3, false, 1.0)]), 0.0);
        assert_eq!(aucpr(&[]), 0.0);
    }
}
