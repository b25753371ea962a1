//! Ordinary least squares with residual diagnostics.

use ndarray::{Array1, Array2};
use serde::Serialize;

use super::AnalysisError;
use super::describe::mean;
use crate::dataset::{FEATURE_NAMES, FlowerRow};

/// Relative pivot tolerance.
const PIVOT_EPS: f64 = 1e-10;

/// Moments of the residuals and the Jarque-Bera normality statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualDiagnostics {
    pub mean: f64,
    pub variance: f64,
    pub skewness: f64,
    /// Excess kurtosis (0 for a normal distribution).
    pub kurtosis: f64,
    pub jarque_bera: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionFit {
    pub target: &'static str,
    pub predictors: Vec<&'static str>,
    pub intercept: f64,
    /// One coefficient per predictor, same order.
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    pub rmse: f64,
    pub residuals: ResidualDiagnostics,
}

impl RegressionFit {
    pub fn predict(&self, values: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(values)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}

/// `petal_length ~ sepal_length`.
pub fn fit_simple(rows: &[FlowerRow]) -> Result<RegressionFit, AnalysisError> {
    fit_ols(rows, 2, &[0])
}

/// `petal_length ~ sepal_length + sepal_width + petal_width`.
pub fn fit_multiple(rows: &[FlowerRow]) -> Result<RegressionFit, AnalysisError> {
    fit_ols(rows, 2, &[0, 1, 3])
}

/// Regress feature `target` on the features in `predictors`, with an intercept.
pub fn fit_ols(rows: &[FlowerRow], target: usize, predictors: &[usize]) -> Result<RegressionFit, AnalysisError> {
    let n = rows.len();
    let p = predictors.len() + 1;
    if n == 0 {
        return Err(AnalysisError::EmptyDataset);
    }
    if n <= p {
        return Err(AnalysisError::TooFewRows {
            needed: p + 1,
            found: n,
        });
    }
    let design = Array2::from_shape_fn((n, p), |(i, j)| {
        if j == 0 { 1.0 } else { rows[i].features()[predictors[j - 1]] }
    });
    let y = Array1::from_iter(rows.iter().map(|row| row.features()[target]));

    let xtx = design.t().dot(&design);
    let xty = design.t().dot(&y);
    let beta = solve(xtx, xty)?;

    let fitted = design.dot(&beta);
    let residuals = &y - &fitted;
    let ss_res = residuals.mapv(|r| r * r).sum();
    let y_mean = y.mean().unwrap_or(0.0);
    let ss_tot = y.mapv(|v| (v - y_mean) * (v - y_mean)).sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(RegressionFit {
        target: FEATURE_NAMES[target],
        predictors: predictors.iter().map(|&idx| FEATURE_NAMES[idx]).collect(),
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
        r_squared,
        rmse: (ss_res / n as f64).sqrt(),
        residuals: diagnostics(&residuals.to_vec()),
    })
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, AnalysisError> {
    let n = b.len();
    let tolerance = PIVOT_EPS * a.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < tolerance {
            return Err(AnalysisError::Singular);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}

fn diagnostics(residuals: &[f64]) -> ResidualDiagnostics {
    let n = residuals.len() as f64;
    let mean = mean(residuals);
    let moment = |k: i32| residuals.iter().map(|r| (r - mean).powi(k)).sum::<f64>() / n;
    let m2 = moment(2);
    let (skewness, kurtosis) = if m2 > 0.0 {
        (moment(3) / m2.powf(1.5), moment(4) / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };
    ResidualDiagnostics {
        mean,
        variance: m2,
        skewness,
        kurtosis,
        jarque_bera: n / 6.0 * (skewness * skewness + kurtosis * kurtosis / 4.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Species;
    use crate::dataset::reference::reference_flowers;

    #[test]
    fn simple_fit_matches_known_iris_line() {
        let fit = fit_simple(&reference_flowers()).unwrap();
        assert_eq!(fit.predictors, vec!["sepal_length"]);
        assert!((fit.coefficients[0] - 1.858).abs() < 0.01, "{}", fit.coefficients[0]);
        assert!((fit.intercept + 7.101).abs() < 0.05, "{}", fit.intercept);
        assert!((fit.r_squared - 0.76).abs() < 0.01, "{}", fit.r_squared);
        assert!(fit.residuals.mean.abs() < 1e-9);
    }

    #[test]
    fn multiple_fit_explains_more_variance() {
        let rows = reference_flowers();
        let simple = fit_simple(&rows).unwrap();
        let multiple = fit_multiple(&rows).unwrap();
        assert_eq!(multiple.coefficients.len(), 3);
        assert!(multiple.r_squared > simple.r_squared);
        assert!(multiple.rmse < simple.rmse);
        assert!(multiple.r_squared > 0.95);
    }

    #[test]
    fn recovers_exact_line() {
        let rows: Vec<FlowerRow> = (1..=6)
            .map(|i| {
                let x = i as f64;
                FlowerRow::new([x, 1.0 + x * 0.1, 2.0 * x + 1.0, 0.5], Species::Setosa)
            })
            .collect();
        let fit = fit_simple(&rows).unwrap();
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!((fit.predict(&[10.0]) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn collinear_predictors_are_singular() {
        let rows: Vec<FlowerRow> = (1..=6)
            .map(|i| FlowerRow::new([i as f64, 2.0 * i as f64, 1.0, 0.3], Species::Setosa))
            .collect();
        assert_eq!(fit_ols(&rows, 2, &[0, 1]).unwrap_err(), AnalysisError::Singular);
        assert!(matches!(
            fit_ols(&rows[..2], 2, &[0, 1]),
            Err(AnalysisError::TooFewRows { .. })
        ));
    }
}
