//! Random forest: bootstrap-aggregated decision trees with feature subsampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeOptions};
use super::{Classifier, MlError, TrainSet};
use crate::dataset::{Features, N_CLASSES, N_FEATURES};

#[derive(Debug, Clone)]
pub struct ForestOptions {
    pub n_trees: usize,
    /// Features examined per split; defaults to `floor(sqrt(N_FEATURES))`.
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_features: (N_FEATURES as f64).sqrt().floor() as usize,
            max_depth: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(data: &TrainSet<'_>, options: &ForestOptions) -> Result<Self, MlError> {
        if options.n_trees == 0 {
            return Err(MlError::InvalidOption("n_trees must be > 0".to_string()));
        }
        let n = data.len();
        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut trees = Vec::with_capacity(options.n_trees);
        for _ in 0..options.n_trees {
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            let tree_options = TreeOptions {
                max_depth: options.max_depth,
                min_samples_split: 2,
                max_features: Some(options.max_features),
                seed: rng.random::<u64>(),
            };
            trees.push(DecisionTree::fit_indices(data, &bootstrap, &tree_options)?);
        }
        Ok(Self { trees })
    }

    /// Mean impurity-decrease importance across trees, normalized to sum to 1.
    pub fn feature_importances(&self) -> Features {
        let mut total = [0.0f64; N_FEATURES];
        for tree in &self.trees {
            for (sum, value) in total.iter_mut().zip(tree.feature_importances()) {
                *sum += value;
            }
        }
        let norm: f64 = total.iter().sum();
        if norm <= 0.0 {
            return [0.0; N_FEATURES];
        }
        total.map(|value| value / norm)
    }
}

impl Classifier for RandomForest {
    fn predict_proba(&self, features: &Features) -> [f64; N_CLASSES] {
        let mut mean = [0.0f64; N_CLASSES];
        if self.trees.is_empty() {
            return [1.0 / N_CLASSES as f64; N_CLASSES];
        }
        let weight = 1.0 / self.trees.len() as f64;
        for tree in &self.trees {
            for (acc, p) in mean.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p * weight;
            }
        }
        mean
    }
}
