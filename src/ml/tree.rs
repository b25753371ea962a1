//! CART decision tree with Gini impurity.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{Classifier, MlError, TrainSet, normalize};
use crate::dataset::{Features, N_CLASSES, N_FEATURES};

/// Training hyperparameters for a single tree.
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Maximum depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum rows a node needs before it may split.
    pub min_samples_split: usize,
    /// Number of features examined per split; `None` examines all of them.
    pub max_features: Option<usize>,
    /// Seed for the per-node feature order.
    pub seed: u64,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// Tree node; leaves keep the class distribution of their training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        distribution: [f64; N_CLASSES],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub root: Node,
    /// Total weighted impurity decrease per feature, unnormalized.
    pub impurity_decrease: Features,
}

impl DecisionTree {
    /// Grow a tree on every row of `data`.
    pub fn fit(data: &TrainSet<'_>, options: &TreeOptions) -> Result<Self, MlError> {
        let indices: Vec<usize> = (0..data.len()).collect();
        Self::fit_indices(data, &indices, options)
    }

    /// Grow a tree on the rows selected by `indices` (repeats allowed).
    pub fn fit_indices(
        data: &TrainSet<'_>,
        indices: &[usize],
        options: &TreeOptions,
    ) -> Result<Self, MlError> {
        if indices.is_empty() {
            return Err(MlError::EmptyTrainingSet);
        }
        if let Some(k) = options.max_features {
            if k == 0 || k > N_FEATURES {
                return Err(MlError::InvalidOption(format!(
                    "max_features must be within 1..={N_FEATURES}, got {k}"
                )));
            }
        }
        let mut builder = Builder {
            data,
            options,
            rng: StdRng::seed_from_u64(options.seed),
            impurity_decrease: [0.0; N_FEATURES],
            total: indices.len() as f64,
        };
        let mut working = indices.to_vec();
        let root = builder.grow(&mut working, 0);
        Ok(Self {
            root,
            impurity_decrease: builder.impurity_decrease,
        })
    }

    /// Normalized feature importances (sum to 1 unless the tree is a stump leaf).
    pub fn feature_importances(&self) -> Features {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total <= 0.0 {
            return [0.0; N_FEATURES];
        }
        self.impurity_decrease.map(|value| value / total)
    }

    /// Depth of the deepest leaf; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

impl Classifier for DecisionTree {
    fn predict_proba(&self, features: &Features) -> [f64; N_CLASSES] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { distribution } => return *distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

struct Builder<'a, 'b> {
    data: &'a TrainSet<'b>,
    options: &'a TreeOptions,
    rng: StdRng,
    impurity_decrease: Features,
    total: f64,
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl Builder<'_, '_> {
    fn grow(&mut self, indices: &mut [usize], depth: usize) -> Node {
        let counts = self.counts(indices);
        let node_gini = gini(&counts, indices.len());
        let depth_reached = self.options.max_depth.is_some_and(|max| depth >= max);
        if node_gini <= 0.0 || depth_reached || indices.len() < self.options.min_samples_split.max(2) {
            return leaf(&counts);
        }
        let Some(best) = self.best_split(indices) else {
            return leaf(&counts);
        };

        let n = indices.len() as f64;
        self.impurity_decrease[best.feature] += (n / self.total) * (node_gini - best.impurity);

        let (left, right) = partition(indices, |idx| self.data.x[idx][best.feature] <= best.threshold);
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn counts(&self, indices: &[usize]) -> [usize; N_CLASSES] {
        let mut counts = [0usize; N_CLASSES];
        for &idx in indices {
            counts[self.data.y[idx]] += 1;
        }
        counts
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let mut features: Vec<usize> = (0..N_FEATURES).collect();
        match self.options.max_features {
            Some(k) if k < N_FEATURES => {
                features.shuffle(&mut self.rng);
                features.truncate(k);
                features
            }
            _ => features,
        }
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let mut best: Option<BestSplit> = None;
        for feature in self.candidate_features() {
            let Some(candidate) = self.best_split_for_feature(indices, feature) else {
                continue;
            };
            if best.is_none_or(|current| candidate.impurity < current.impurity) {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(&self, indices: &[usize], feature: usize) -> Option<BestSplit> {
        let mut sorted: Vec<(f64, usize)> = indices
            .iter()
            .map(|&idx| (self.data.x[idx][feature], self.data.y[idx]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = sorted.len();
        let mut right = [0usize; N_CLASSES];
        for &(_, label) in &sorted {
            right[label] += 1;
        }
        let mut left = [0usize; N_CLASSES];
        let mut best: Option<BestSplit> = None;
        for pos in 0..n - 1 {
            let (value, label) = sorted[pos];
            left[label] += 1;
            right[label] -= 1;
            let next = sorted[pos + 1].0;
            if next <= value {
                continue;
            }
            let left_n = pos + 1;
            let right_n = n - left_n;
            let impurity = (left_n as f64 * gini(&left, left_n)
                + right_n as f64 * gini(&right, right_n))
                / n as f64;
            if best.is_none_or(|current| impurity < current.impurity) {
                best = Some(BestSplit {
                    feature,
                    threshold: value + (next - value) / 2.0,
                    impurity,
                });
            }
        }
        best
    }
}

fn leaf(counts: &[usize; N_CLASSES]) -> Node {
    Node::Leaf {
        distribution: normalize(counts.map(|count| count as f64)),
    }
}

fn gini(counts: &[usize; N_CLASSES], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&count| {
            let p = count as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Stable in-place partition returning `(matching, rest)`.
fn partition(indices: &mut [usize], mut pred: impl FnMut(usize) -> bool) -> (&mut [usize], &mut [usize]) {
    let (mut yes, no): (Vec<usize>, Vec<usize>) = indices.iter().copied().partition(|&idx| pred(idx));
    let split = yes.len();
    yes.extend(no);
    indices.copy_from_slice(&yes);
    indices.split_at_mut(split)
}
