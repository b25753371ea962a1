//! RBF-kernel support vector classifier with Platt-calibrated probabilities.
//!
//! Multi-class problems are decomposed one-vs-one. Each binary machine is
//! solved with SMO using maximal-violating-pair working set selection, then a
//! sigmoid is fitted to its decision values. Pairwise probabilities are
//! coupled into class probabilities with the method of Wu, Lin and Weng.

use serde::{Deserialize, Serialize};

use super::{Classifier, MlError, TrainSet};
use crate::dataset::{Features, N_CLASSES};

const TAU: f64 = 1e-12;
const MIN_PAIR_PROB: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct SvmOptions {
    /// Box constraint.
    pub c: f64,
    /// RBF width; `None` uses `1 / (n_features * var(X))`.
    pub gamma: Option<f64>,
    /// Stopping tolerance on the KKT violation.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SvmOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tolerance: 1e-3,
            max_iterations: 100_000,
        }
    }
}

/// Platt sigmoid `P(y = 1 | f) = 1 / (1 + exp(a * f + b))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattSigmoid {
    pub a: f64,
    pub b: f64,
}

impl PlattSigmoid {
    pub fn probability(&self, decision: f64) -> f64 {
        let f = decision * self.a + self.b;
        if f >= 0.0 {
            (-f).exp() / (1.0 + (-f).exp())
        } else {
            1.0 / (1.0 + f.exp())
        }
    }
}

/// Binary machine separating `positive` (+1) from `negative` (-1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySvm {
    pub positive: usize,
    pub negative: usize,
    pub support_vectors: Vec<Features>,
    /// `alpha_i * y_i` for each support vector.
    pub coefficients: Vec<f64>,
    pub rho: f64,
    pub sigmoid: PlattSigmoid,
}

impl BinarySvm {
    pub fn decision(&self, features: &Features, gamma: f64) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, coef)| coef * rbf(sv, features, gamma))
            .sum::<f64>()
            - self.rho
    }

    fn fit(
        x: &[Features],
        labels: &[f64],
        positive: usize,
        negative: usize,
        gamma: f64,
        options: &SvmOptions,
    ) -> Self {
        let kernel = KernelMatrix::new(x, gamma);
        let (alpha, rho) = solve_smo(&kernel, labels, options);
        let decisions: Vec<f64> = (0..x.len())
            .map(|i| {
                (0..x.len())
                    .map(|j| alpha[j] * labels[j] * kernel.get(i, j))
                    .sum::<f64>()
                    - rho
            })
            .collect();
        let positives: Vec<bool> = labels.iter().map(|&label| label > 0.0).collect();
        let sigmoid = fit_sigmoid(&decisions, &positives);
        let mut support_vectors = Vec::new();
        let mut coefficients = Vec::new();
        for (idx, &a) in alpha.iter().enumerate() {
            if a > 0.0 {
                support_vectors.push(x[idx]);
                coefficients.push(a * labels[idx]);
            }
        }
        Self {
            positive,
            negative,
            support_vectors,
            coefficients,
            rho,
            sigmoid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportVectorClassifier {
    pub gamma: f64,
    /// One machine per class pair `(i, j)` with `i < j`.
    pub machines: Vec<BinarySvm>,
}

impl SupportVectorClassifier {
    pub fn fit(data: &TrainSet<'_>, options: &SvmOptions) -> Result<Self, MlError> {
        if options.c <= 0.0 || !options.c.is_finite() {
            return Err(MlError::InvalidOption(format!("C must be > 0, got {}", options.c)));
        }
        let gamma = match options.gamma {
            Some(gamma) if gamma > 0.0 && gamma.is_finite() => gamma,
            Some(gamma) => {
                return Err(MlError::InvalidOption(format!("gamma must be > 0, got {gamma}")));
            }
            None => scale_gamma(data.x),
        };
        if let Some(missing) = data.class_counts().iter().position(|&count| count == 0) {
            return Err(MlError::MissingClass(missing));
        }
        let mut machines = Vec::with_capacity(N_CLASSES * (N_CLASSES - 1) / 2);
        for positive in 0..N_CLASSES {
            for negative in positive + 1..N_CLASSES {
                let mut x = Vec::new();
                let mut labels = Vec::new();
                for (row, &label) in data.x.iter().zip(data.y) {
                    if label == positive {
                        x.push(*row);
                        labels.push(1.0);
                    } else if label == negative {
                        x.push(*row);
                        labels.push(-1.0);
                    }
                }
                machines.push(BinarySvm::fit(&x, &labels, positive, negative, gamma, options));
            }
        }
        Ok(Self { gamma, machines })
    }

    /// Raw pairwise decision values in machine order.
    pub fn decision_values(&self, features: &Features) -> Vec<f64> {
        self.machines
            .iter()
            .map(|machine| machine.decision(features, self.gamma))
            .collect()
    }
}

impl Classifier for SupportVectorClassifier {
    fn predict_proba(&self, features: &Features) -> [f64; N_CLASSES] {
        let mut pairwise = [[0.0f64; N_CLASSES]; N_CLASSES];
        for machine in &self.machines {
            let p = machine
                .sigmoid
                .probability(machine.decision(features, self.gamma))
                .clamp(MIN_PAIR_PROB, 1.0 - MIN_PAIR_PROB);
            pairwise[machine.positive][machine.negative] = p;
            pairwise[machine.negative][machine.positive] = 1.0 - p;
        }
        couple_pairwise(&pairwise)
    }
}

/// Combine pairwise estimates `r[i][j] = P(i | i or j)` into class probabilities.
fn couple_pairwise(r: &[[f64; N_CLASSES]; N_CLASSES]) -> [f64; N_CLASSES] {
    let k = N_CLASSES;
    let max_iter = 100.max(k);
    let eps = 0.005 / k as f64;
    let mut q = [[0.0f64; N_CLASSES]; N_CLASSES];
    let mut p = [1.0 / k as f64; N_CLASSES];
    let mut qp = [0.0f64; N_CLASSES];
    for t in 0..k {
        for j in 0..k {
            if j == t {
                continue;
            }
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }
    for _ in 0..max_iter {
        let mut pqp = 0.0f64;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            pqp += p[t] * qp[t];
        }
        let max_error = (0..k)
            .map(|t| (qp[t] - pqp).abs())
            .fold(0.0f64, f64::max);
        if max_error < eps {
            break;
        }
        for t in 0..k {
            let diff = (-qp[t] + pqp) / q[t][t];
            p[t] += diff;
            pqp = (pqp + diff * (diff * q[t][t] + 2.0 * qp[t])) / ((1.0 + diff) * (1.0 + diff));
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
    }
    p
}

fn rbf(a: &Features, b: &Features, gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * dist).exp()
}

/// `1 / (n_features * var(X))` over every entry of the matrix.
fn scale_gamma(x: &[Features]) -> f64 {
    let values: Vec<f64> = x.iter().flatten().copied().collect();
    let n = values.len().max(1) as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let n_features = x.first().map(|row| row.len()).unwrap_or(1) as f64;
    if var > 0.0 { 1.0 / (n_features * var) } else { 1.0 }
}

struct KernelMatrix {
    n: usize,
    values: Vec<f64>,
}

impl KernelMatrix {
    fn new(x: &[Features], gamma: f64) -> Self {
        let n = x.len();
        let mut values = vec![0.0f64; n * n];
        for i in 0..n {
            for j in i..n {
                let k = rbf(&x[i], &x[j], gamma);
                values[i * n + j] = k;
                values[j * n + i] = k;
            }
        }
        Self { n, values }
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }
}

/// Solve the C-SVC dual for labels in {-1, +1}; returns `(alpha, rho)`.
fn solve_smo(kernel: &KernelMatrix, y: &[f64], options: &SvmOptions) -> (Vec<f64>, f64) {
    let n = y.len();
    let c = options.c;
    let q = |i: usize, j: usize| y[i] * y[j] * kernel.get(i, j);
    let mut alpha = vec![0.0f64; n];
    let mut grad = vec![-1.0f64; n];

    for _ in 0..options.max_iterations {
        let Some((i, j)) = select_working_set(&alpha, &grad, y, c, options.tolerance) else {
            break;
        };
        let old_i = alpha[i];
        let old_j = alpha[j];
        if y[i] != y[j] {
            let quad = (q(i, i) + q(j, j) + 2.0 * q(i, j)).max(TAU);
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let quad = (q(i, i) + q(j, j) - 2.0 * q(i, j)).max(TAU);
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }
        let delta_i = alpha[i] - old_i;
        let delta_j = alpha[j] - old_j;
        for (k, g) in grad.iter_mut().enumerate() {
            *g += q(i, k) * delta_i + q(j, k) * delta_j;
        }
    }

    let rho = compute_rho(&alpha, &grad, y, c);
    (alpha, rho)
}

fn in_upper_set(alpha: f64, y: f64, c: f64) -> bool {
    (y > 0.0 && alpha < c) || (y < 0.0 && alpha > 0.0)
}

fn in_lower_set(alpha: f64, y: f64, c: f64) -> bool {
    (y > 0.0 && alpha > 0.0) || (y < 0.0 && alpha < c)
}

fn select_working_set(
    alpha: &[f64],
    grad: &[f64],
    y: &[f64],
    c: f64,
    tolerance: f64,
) -> Option<(usize, usize)> {
    let mut i = None;
    let mut max_up = f64::NEG_INFINITY;
    let mut j = None;
    let mut min_low = f64::INFINITY;
    for t in 0..y.len() {
        let value = -y[t] * grad[t];
        if in_upper_set(alpha[t], y[t], c) && value > max_up {
            max_up = value;
            i = Some(t);
        }
        if in_lower_set(alpha[t], y[t], c) && value < min_low {
            min_low = value;
            j = Some(t);
        }
    }
    match (i, j) {
        (Some(i), Some(j)) if max_up - min_low >= tolerance && i != j => Some((i, j)),
        _ => None,
    }
}

fn compute_rho(alpha: &[f64], grad: &[f64], y: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0f64;
    let mut free_count = 0usize;
    for t in 0..y.len() {
        let yg = y[t] * grad[t];
        if alpha[t] >= c {
            if y[t] < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if y[t] > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            free_count += 1;
            free_sum += yg;
        }
    }
    if free_count > 0 {
        free_sum / free_count as f64
    } else if upper.is_finite() && lower.is_finite() {
        (upper + lower) / 2.0
    } else {
        0.0
    }
}

/// Fit Platt's sigmoid with the Newton method of Lin, Lin and Weng.
fn fit_sigmoid(decisions: &[f64], positives: &[bool]) -> PlattSigmoid {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = positives.iter().filter(|&&p| p).count() as f64;
    let prior0 = positives.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = positives
        .iter()
        .map(|&p| if p { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let fapb = f * a + b;
                if fapb >= 0.0 {
                    t * fapb + (1.0 + (-fapb).exp()).ln()
                } else {
                    (t - 1.0) * fapb + (1.0 + fapb.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0f64;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITER {
        let mut h11 = SIGMA;
        let mut h22 = SIGMA;
        let mut h21 = 0.0f64;
        let mut g1 = 0.0f64;
        let mut g2 = 0.0f64;
        for (&f, &t) in decisions.iter().zip(&targets) {
            let fapb = f * a + b;
            let (p, q) = if fapb >= 0.0 {
                let e = (-fapb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = fapb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }
        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }
        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0f64;
        while step >= MIN_STEP {
            let new_a = a + step * da;
            let new_b = b + step * db;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            break;
        }
    }
    PlattSigmoid { a, b }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters() -> (Vec<Features>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (class, center) in [0.0, 3.0, 6.0].into_iter().enumerate() {
            for offset in [-0.2, -0.1, 0.0, 0.1, 0.2] {
                x.push([center + offset, center - offset, 1.0, center]);
                y.push(class);
            }
        }
        (x, y)
    }

    #[test]
    fn separates_clusters_with_calibrated_probabilities() {
        let (x, y) = clusters();
        let data = TrainSet::new(&x, &y).unwrap();
        let model = SupportVectorClassifier::fit(&data, &SvmOptions::default()).unwrap();
        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(model.predict(row), label);
        }
        let proba = model.predict_proba(&[6.0, 6.0, 1.0, 6.0]);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba[2] > 0.5, "{proba:?}");
    }

    #[test]
    fn sigmoid_is_monotone_decreasing_in_a_times_f() {
        let decisions = [-2.0, -1.5, -1.0, 1.0, 1.5, 2.0];
        let positives = [false, false, false, true, true, true];
        let sigmoid = fit_sigmoid(&decisions, &positives);
        assert!(sigmoid.a < 0.0);
        assert!(sigmoid.probability(2.0) > 0.5);
        assert!(sigmoid.probability(-2.0) < 0.5);
    }

    #[test]
    fn coupling_recovers_consistent_pairwise_estimates() {
        let target = [0.6, 0.3, 0.1];
        let mut r = [[0.0; N_CLASSES]; N_CLASSES];
        for i in 0..N_CLASSES {
            for j in 0..N_CLASSES {
                if i != j {
                    r[i][j] = target[i] / (target[i] + target[j]);
                }
            }
        }
        let p = couple_pairwise(&r);
        for (got, want) in p.iter().zip(target) {
            assert!((got - want).abs() < 1e-2, "{p:?}");
        }
    }

    #[test]
    fn rejects_invalid_hyperparameters() {
        let (x, y) = clusters();
        let data = TrainSet::new(&x, &y).unwrap();
        let options = SvmOptions {
            c: 0.0,
            ..SvmOptions::default()
        };
        assert!(SupportVectorClassifier::fit(&data, &options).is_err());
        let options = SvmOptions {
            gamma: Some(-1.0),
            ..SvmOptions::default()
        };
        assert!(SupportVectorClassifier::fit(&data, &options).is_err());
    }
}
