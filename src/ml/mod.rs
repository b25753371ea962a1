//! Classifier strategies, model selection, and prediction export.
//!
//! Every strategy is trained in-crate from plain feature vectors so that
//! training is reproducible from a seed and fitted models serialize to JSON.

pub mod bundle;
pub mod export;
pub mod forest;
pub mod knn;
pub mod logreg;
pub mod metrics;
pub mod model;
pub mod selector;
pub mod svm;
pub mod tree;

use crate::dataset::{Features, N_CLASSES};

pub use model::{FittedModel, ModelKind, TrainedModel};
pub use selector::{ModelScore, ModelSelector, Prediction, SelectorError, SelectorOptions};

/// Errors raised while fitting a classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MlError {
    #[error("Empty training set")]
    EmptyTrainingSet,
    #[error("Mismatched training inputs/labels ({features} rows, {labels} labels)")]
    LengthMismatch { features: usize, labels: usize },
    #[error("Label {0} is outside the known classes")]
    UnknownLabel(usize),
    #[error("Training set contains a non-finite measurement")]
    NonFinite,
    #[error("Training set has no rows of class {0}")]
    MissingClass(usize),
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Borrowed training data shared by every strategy.
#[derive(Debug, Clone, Copy)]
pub struct TrainSet<'a> {
    pub x: &'a [Features],
    pub y: &'a [usize],
}

impl<'a> TrainSet<'a> {
    /// Validate shapes and labels before handing the set to a learner.
    pub fn new(x: &'a [Features], y: &'a [usize]) -> Result<Self, MlError> {
        if x.is_empty() {
            return Err(MlError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(MlError::LengthMismatch {
                features: x.len(),
                labels: y.len(),
            });
        }
        if let Some(&label) = y.iter().find(|&&label| label >= N_CLASSES) {
            return Err(MlError::UnknownLabel(label));
        }
        if x.iter().flatten().any(|value| !value.is_finite()) {
            return Err(MlError::NonFinite);
        }
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Rows per class in label-code order.
    pub fn class_counts(&self) -> [usize; N_CLASSES] {
        let mut counts = [0usize; N_CLASSES];
        for &label in self.y {
            counts[label] += 1;
        }
        counts
    }
}

/// Common interface of every fitted classifier.
pub trait Classifier {
    /// Per-class probabilities in label-code order; sums to 1.
    fn predict_proba(&self, features: &Features) -> [f64; N_CLASSES];

    /// Most probable class; the lowest code wins exact ties.
    fn predict(&self, features: &Features) -> usize {
        argmax(&self.predict_proba(features))
    }
}

/// Compute a numerically-stable softmax for a set of logits.
pub fn softmax(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut exps = Vec::with_capacity(raw.len());
    let mut sum = 0.0f64;
    for &v in raw {
        let e = (v - max).exp();
        exps.push(e);
        sum += e;
    }
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / raw.len() as f64; raw.len()];
    }
    for v in &mut exps {
        *v /= sum;
    }
    exps
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

/// Normalize non-negative class scores into a probability distribution.
pub(crate) fn normalize(scores: [f64; N_CLASSES]) -> [f64; N_CLASSES] {
    let sum: f64 = scores.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return [1.0 / N_CLASSES as f64; N_CLASSES];
    }
    scores.map(|score| score / sum)
}

/// Per-feature mean and standard deviation used to standardize inputs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Standardizer {
    pub mean: Features,
    pub scale: Features,
}

impl Standardizer {
    pub fn fit(x: &[Features]) -> Self {
        let n = x.len().max(1) as f64;
        let mut mean = [0.0f64; crate::dataset::N_FEATURES];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let mut scale = [0.0f64; crate::dataset::N_FEATURES];
        for row in x {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m) / n;
            }
        }
        // Constant columns keep unit scale.
        let scale = scale.map(|var| if var > 0.0 { var.sqrt() } else { 1.0 });
        Self { mean, scale }
    }

    pub fn transform(&self, features: &Features) -> Features {
        let mut out = *features;
        for ((v, m), s) in out.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - m) / s;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one() {
        let out = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(out[2] > out[1] && out[1] > out[0]);
    }

    #[test]
    fn argmax_prefers_first_tie() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn train_set_validates_inputs() {
        let x = [[1.0, 2.0, 3.0, 4.0]];
        assert_eq!(TrainSet::new(&[], &[]).unwrap_err(), MlError::EmptyTrainingSet);
        assert!(matches!(
            TrainSet::new(&x, &[0, 1]),
            Err(MlError::LengthMismatch { .. })
        ));
        assert_eq!(TrainSet::new(&x, &[3]).unwrap_err(), MlError::UnknownLabel(3));
        let bad = [[f64::NAN, 2.0, 3.0, 4.0]];
        assert_eq!(TrainSet::new(&bad, &[0]).unwrap_err(), MlError::NonFinite);
    }

    #[test]
    fn standardizer_centers_columns() {
        let x = [[1.0, 5.0, 0.0, 2.0], [3.0, 5.0, 2.0, 4.0]];
        let scaler = Standardizer::fit(&x);
        let a = scaler.transform(&x[0]);
        let b = scaler.transform(&x[1]);
        assert!((a[0] + 1.0).abs() < 1e-12 && (b[0] - 1.0).abs() < 1e-12);
        assert_eq!(a[1], 0.0);
    }
}
