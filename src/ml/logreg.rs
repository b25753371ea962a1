//! Multinomial logistic regression on standardized measurements.

use serde::{Deserialize, Serialize};

use super::{Classifier, MlError, Standardizer, TrainSet, softmax};
use crate::dataset::{Features, N_CLASSES, N_FEATURES};

/// Training options for full-batch gradient descent.
#[derive(Debug, Clone)]
pub struct LogRegOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for LogRegOptions {
    fn default() -> Self {
        Self {
            epochs: 1000,
            learning_rate: 0.5,
            l2: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub scaler: Standardizer,
    /// Row-major `classes x features` weights.
    pub weights: [[f64; N_FEATURES]; N_CLASSES],
    pub bias: [f64; N_CLASSES],
}

impl LogisticRegression {
    pub fn fit(data: &TrainSet<'_>, options: &LogRegOptions) -> Result<Self, MlError> {
        if !(options.learning_rate > 0.0 && options.learning_rate.is_finite()) {
            return Err(MlError::InvalidOption(format!(
                "learning_rate must be > 0, got {}",
                options.learning_rate
            )));
        }
        let scaler = Standardizer::fit(data.x);
        let x: Vec<Features> = data.x.iter().map(|row| scaler.transform(row)).collect();
        let mut weights = [[0.0f64; N_FEATURES]; N_CLASSES];
        let mut bias = [0.0f64; N_CLASSES];
        let lr = options.learning_rate;
        let l2 = options.l2.max(0.0);
        let inv = 1.0 / x.len() as f64;

        for _epoch in 0..options.epochs {
            let mut grad_w = [[0.0f64; N_FEATURES]; N_CLASSES];
            let mut grad_b = [0.0f64; N_CLASSES];
            for (row, &label) in x.iter().zip(data.y) {
                let probs = softmax(&logits(&weights, &bias, row));
                for c in 0..N_CLASSES {
                    let diff = probs[c] - if c == label { 1.0 } else { 0.0 };
                    for (g, v) in grad_w[c].iter_mut().zip(row) {
                        *g += diff * v;
                    }
                    grad_b[c] += diff;
                }
            }
            for c in 0..N_CLASSES {
                for (w, g) in weights[c].iter_mut().zip(&grad_w[c]) {
                    *w -= lr * (g * inv + l2 * *w);
                }
                bias[c] -= lr * grad_b[c] * inv;
            }
        }

        if weights.iter().flatten().chain(&bias).any(|v| !v.is_finite()) {
            return Err(MlError::NonFinite);
        }
        Ok(Self {
            scaler,
            weights,
            bias,
        })
    }
}

fn logits(
    weights: &[[f64; N_FEATURES]; N_CLASSES],
    bias: &[f64; N_CLASSES],
    x: &Features,
) -> [f64; N_CLASSES] {
    let mut out = *bias;
    for (logit, row) in out.iter_mut().zip(weights) {
        *logit += row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
    }
    out
}

impl Classifier for LogisticRegression {
    fn predict_proba(&self, features: &Features) -> [f64; N_CLASSES] {
        let x = self.scaler.transform(features);
        let probs = softmax(&logits(&self.weights, &self.bias, &x));
        let mut out = [0.0f64; N_CLASSES];
        out.copy_from_slice(&probs);
        out
    }
}
