//! Supervised link prediction
//!
//! Trains an L2-regularized logistic regression on topological pair features
//! (common neighbors, Jaccard, Adamic-Adar, resource allocation, preferential
//! attachment) computed on the training relationships only. Negative examples
//! are sampled from unlinked pairs and re-weighted by the class ratio so the
//! classifier sees the true negative-to-positive imbalance. Hyperparameters are
//! chosen by stratified k-fold cross-validation on AUCPR.

use crate::common::GraphView;
use crate::error::{AlgoError, AlgoResult};
use crate::metrics::aucpr;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashSet};

pub const FEATURE_NAMES: [&str; 5] = [
    "commonNeighbors",
    "jaccard",
    "adamicAdar",
    "resourceAllocation",
    "preferentialAttachment",
];

const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// One point of the hyperparameter grid
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogisticParams {
    pub penalty: f64,
    pub max_iterations: usize,
}

/// Link prediction training configuration
#[derive(Debug, Clone)]
pub struct LinkPredictionConfig {
    /// Negative-to-positive class ratio of the full pair space
    pub class_ratio: f64,
    pub validation_folds: usize,
    pub random_seed: u64,
    /// Candidate hyperparameters, evaluated in order; ties keep the earlier one
    pub params: Vec<LogisticParams>,
    pub learning_rate: f64,
}

/// L2 penalties tried when no grid is given, in evaluation order
pub const DEFAULT_PENALTIES: [f64; 3] = [0.5, 1.0, 0.0];

impl Default for LinkPredictionConfig {
    fn default() -> Self {
        Self {
            class_ratio: 1.0,
            validation_folds: 5,
            random_seed: 2,
            params: DEFAULT_PENALTIES
                .iter()
                .map(|&penalty| LogisticParams {
                    penalty,
                    max_iterations: 1000,
                })
                .collect(),
            learning_rate: 0.5,
        }
    }
}

/// A trained classifier, including the feature standardization it expects
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkPredictionModel {
    pub params: LogisticParams,
    pub coefficients: Vec<f64>,
    pub bias: f64,
    pub feature_means: Vec<f64>,
    pub feature_scales: Vec<f64>,
}

impl LinkPredictionModel {
    /// Probability that the pair described by raw `features` is linked
    pub fn predict(&self, features: &[f64]) -> f64 {
        let z: f64 = features
            .iter()
            .enumerate()
            .map(|(k, &f)| self.coefficients[k] * (f - self.feature_means[k]) / self.feature_scales[k])
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: LinkPredictionModel,
    /// Mean validation AUCPR per candidate, in grid order
    pub validation: Vec<(LogisticParams, f64)>,
    pub train_aucpr: f64,
    pub test_aucpr: f64,
    pub train_examples: usize,
    pub test_examples: usize,
}

/// Undirected neighbor sets of the training graph
pub struct PairFeatures {
    neighbors: Vec<BTreeSet<usize>>,
}

impl PairFeatures {
    pub fn new(view: &GraphView) -> Self {
        let neighbors = (0..view.node_count)
            .map(|i| view.undirected_neighbors(i))
            .collect();
        Self { neighbors }
    }

    pub fn features(&self, u: usize, v: usize) -> [f64; FEATURE_COUNT] {
        let nu = &self.neighbors[u];
        let nv = &self.neighbors[v];
        let common: Vec<usize> = nu.intersection(nv).copied().collect();
        let union = nu.len() + nv.len() - common.len();

        let mut adamic_adar = 0.0;
        let mut resource_allocation = 0.0;
        for &w in &common {
            let degree = self.neighbors[w].len() as f64;
            if degree > 1.0 {
                adamic_adar += 1.0 / degree.ln();
            }
            if degree > 0.0 {
                resource_allocation += 1.0 / degree;
            }
        }

        [
            common.len() as f64,
            if union == 0 { 0.0 } else { common.len() as f64 / union as f64 },
            adamic_adar,
            resource_allocation,
            (1.0 + (nu.len() * nv.len()) as f64).ln(),
        ]
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z.clamp(-35.0, 35.0)).exp())
}

fn canonical(u: usize, v: usize) -> (usize, usize) {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

/// Distinct undirected pairs, self-loops dropped, first-seen order kept
fn distinct_pairs(pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut seen = HashSet::new();
    pairs
        .iter()
        .filter(|(u, v)| u != v)
        .map(|&(u, v)| canonical(u, v))
        .filter(|p| seen.insert(*p))
        .collect()
}

/// Sample up to `count` unlinked pairs not already in `excluded`; chosen pairs are added to it.
fn sample_negatives(
    node_count: usize,
    count: usize,
    excluded: &mut HashSet<(usize, usize)>,
    rng: &mut StdRng,
) -> AlgoResult<Vec<(usize, usize)>> {
    let total_pairs = node_count * node_count.saturating_sub(1) / 2;
    let available = total_pairs.saturating_sub(excluded.len());
    if available == 0 {
        return Err(AlgoError::NoNegativeExamples);
    }
    let target = count.min(available);

    let mut chosen = Vec::with_capacity(target);
    if available <= target * 4 {
        let mut candidates: Vec<(usize, usize)> = (0..node_count)
            .flat_map(|u| (u + 1..node_count).map(move |v| (u, v)))
            .filter(|p| !excluded.contains(p))
            .collect();
        candidates.shuffle(rng);
        candidates.truncate(target);
        chosen = candidates;
    } else {
        while chosen.len() < target {
            let u = rng.gen_range(0..node_count);
            let v = rng.gen_range(0..node_count);
            if u == v {
                continue;
            }
            let pair = canonical(u, v);
            if !excluded.contains(&pair) && !chosen.contains(&pair) {
                chosen.push(pair);
            }
        }
    }

    excluded.extend(chosen.iter().copied());
    Ok(chosen)
}

fn feature_matrix(features: &PairFeatures, pairs: &[(usize, usize)]) -> AlgoResult<Array2<f64>> {
    let data: Vec<f64> = pairs
        .iter()
        .flat_map(|&(u, v)| features.features(u, v))
        .collect();
    Array2::from_shape_vec((pairs.len(), FEATURE_COUNT), data)
        .map_err(|e| AlgoError::InvalidParameter(format!("feature matrix: {}", e)))
}

fn standardization(x: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(FEATURE_COUNT));
    let scales = x
        .std_axis(Axis(0), 0.0)
        .mapv(|s| if s > 1e-12 { s } else { 1.0 });
    (means, scales)
}

fn fit(
    x: &Array2<f64>,
    y: &Array1<f64>,
    sample_weights: &Array1<f64>,
    params: LogisticParams,
    learning_rate: f64,
) -> (Array1<f64>, f64) {
    let mut coefficients = Array1::<f64>::zeros(x.ncols());
    let mut bias = 0.0;
    let total_weight = sample_weights.sum().max(f64::EPSILON);

    for _ in 0..params.max_iterations {
        let predictions = (x.dot(&coefficients) + bias).mapv(sigmoid);
        let residual = (&predictions - y) * sample_weights;
        let gradient = x.t().dot(&residual) / total_weight + &coefficients * params.penalty;
        let bias_gradient = residual.sum() / total_weight;

        coefficients.scaled_add(-learning_rate, &gradient);
        bias -= learning_rate * bias_gradient;

        let largest = gradient
            .iter()
            .fold(bias_gradient.abs(), |acc, g| acc.max(g.abs()));
        if largest < 1e-7 {
            break;
        }
    }

    (coefficients, bias)
}

fn score(
    x: &Array2<f64>,
    y: &Array1<f64>,
    sample_weights: &Array1<f64>,
    coefficients: &Array1<f64>,
    bias: f64,
) -> f64 {
    let predictions = (x.dot(coefficients) + bias).mapv(sigmoid);
    let examples: Vec<(f64, bool, f64)> = predictions
        .iter()
        .zip(y.iter())
        .zip(sample_weights.iter())
        .map(|((&p, &label), &w)| (p, label > 0.5, w))
        .collect();
    aucpr(&examples)
}

/// Labels and weights for `positives` followed by `negatives`
fn labels_and_weights(positives: usize, negatives: usize, class_ratio: f64) -> (Array1<f64>, Array1<f64>) {
    let negative_weight = if negatives == 0 {
        0.0
    } else {
        class_ratio * positives as f64 / negatives as f64
    };
    let labels = (0..positives + negatives)
        .map(|i| if i < positives { 1.0 } else { 0.0 })
        .collect();
    let weights = (0..positives + negatives)
        .map(|i| if i < positives { 1.0 } else { negative_weight })
        .collect();
    (labels, weights)
}

/// Train a link classifier.
///
/// `view` must contain only the training relationships; `train_pairs` and
/// `test_pairs` are dense node indices into it.
pub fn train_link_predictor(
    view: &GraphView,
    train_pairs: &[(usize, usize)],
    test_pairs: &[(usize, usize)],
    config: &LinkPredictionConfig,
) -> AlgoResult<TrainingOutcome> {
    if config.params.is_empty() {
        return Err(AlgoError::InvalidParameter("empty hyperparameter grid".to_string()));
    }
    if config.validation_folds < 2 {
        return Err(AlgoError::InvalidParameter(format!(
            "validation folds must be at least 2, got {}",
            config.validation_folds
        )));
    }
    if !config.class_ratio.is_finite() || config.class_ratio <= 0.0 {
        return Err(AlgoError::InvalidParameter(format!(
            "class ratio must be positive, got {}",
            config.class_ratio
        )));
    }

    let train_pos = distinct_pairs(train_pairs);
    let test_pos = distinct_pairs(test_pairs);
    if train_pos.is_empty() {
        return Err(AlgoError::InsufficientData("no training relationships".to_string()));
    }
    if test_pos.is_empty() {
        return Err(AlgoError::InsufficientData("no test relationships".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let mut excluded: HashSet<(usize, usize)> = train_pos.iter().chain(test_pos.iter()).copied().collect();
    let train_neg = sample_negatives(view.node_count, train_pos.len(), &mut excluded, &mut rng)?;
    let test_neg = sample_negatives(view.node_count, test_pos.len(), &mut excluded, &mut rng)?;

    let k = config.validation_folds;
    if train_pos.len() < k || train_neg.len() < k {
        return Err(AlgoError::InsufficientData(format!(
            "{} positive and {} negative training examples cannot fill {} folds",
            train_pos.len(),
            train_neg.len(),
            k
        )));
    }

    let features = PairFeatures::new(view);
    let train_all: Vec<(usize, usize)> = train_pos.iter().chain(train_neg.iter()).copied().collect();
    let test_all: Vec<(usize, usize)> = test_pos.iter().chain(test_neg.iter()).copied().collect();

    let raw_train = feature_matrix(&features, &train_all)?;
    let (means, scales) = standardization(&raw_train);
    let x_train = (&raw_train - &means) / &scales;
    let x_test = (&feature_matrix(&features, &test_all)? - &means) / &scales;

    let (y_train, w_train) = labels_and_weights(train_pos.len(), train_neg.len(), config.class_ratio);
    let (y_test, w_test) = labels_and_weights(test_pos.len(), test_neg.len(), config.class_ratio);

    // Stratified folds: shuffle each class, deal round-robin
    let mut fold_of = vec![0usize; train_all.len()];
    let mut pos_idx: Vec<usize> = (0..train_pos.len()).collect();
    let mut neg_idx: Vec<usize> = (train_pos.len()..train_all.len()).collect();
    pos_idx.shuffle(&mut rng);
    neg_idx.shuffle(&mut rng);
    for (position, &i) in pos_idx.iter().enumerate() {
        fold_of[i] = position % k;
    }
    for (position, &i) in neg_idx.iter().enumerate() {
        fold_of[i] = position % k;
    }

    let mut validation = Vec::with_capacity(config.params.len());
    for &params in &config.params {
        let mut total = 0.0;
        for fold in 0..k {
            let fit_rows: Vec<usize> = (0..train_all.len()).filter(|&i| fold_of[i] != fold).collect();
            let val_rows: Vec<usize> = (0..train_all.len()).filter(|&i| fold_of[i] == fold).collect();

            let (coefficients, bias) = fit(
                &x_train.select(Axis(0), &fit_rows),
                &y_train.select(Axis(0), &fit_rows),
                &w_train.select(Axis(0), &fit_rows),
                params,
                config.learning_rate,
            );
            total += score(
                &x_train.select(Axis(0), &val_rows),
                &y_train.select(Axis(0), &val_rows),
                &w_train.select(Axis(0), &val_rows),
                &coefficients,
                bias,
            );
        }
        validation.push((params, total / k as f64));
    }

    let mut best = validation[0];
    for &candidate in &validation[1..] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }

    let (coefficients, bias) = fit(&x_train, &y_train, &w_train, best.0, config.learning_rate);
    let train_aucpr = score(&x_train, &y_train, &w_train, &coefficients, bias);
    let test_aucpr = score(&x_test, &y_test, &w_test, &coefficients, bias);

    Ok(TrainingOutcome {
        model: LinkPredictionModel {
            params: best.0,
            coefficients: coefficients.to_vec(),
            bias,
            feature_means: means.to_vec(),
            feature_scales: scales.to_vec(),
        },
        validation,
        train_aucpr,
        test_aucpr,
        train_examples: train_all.len(),
        test_examples: test_all.len(),
    })
}

/// Shuffle `items` with a seeded generator and split off a holdout share.
///
/// Returns `(remaining, holdout)`; the holdout has `round(len * fraction)` items.
pub fn holdout_split<T: Clone>(items: &[T], holdout_fraction: f64, random_seed: u64) -> AlgoResult<(Vec<T>, Vec<T>)> {
    if !(0.0..=1.0).contains(&holdout_fraction) {
        return Err(AlgoError::InvalidParameter(format!(
            "holdout fraction must be within [0, 1], got {}",
            holdout_fraction
        )));
    }
    let mut shuffled = items.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(random_seed));
    let holdout_len = (items.len() as f64 * holdout_fraction).round() as usize;
    let remaining = shuffled.split_off(holdout_len);
    Ok((remaining, shuffled))
}
