//! Descriptive statistics per feature and per species.

use serde::Serialize;

use super::AnalysisError;
use crate::dataset::{FEATURE_NAMES, Features, FlowerRow, N_FEATURES, Species, species_counts};

/// Summary of one measurement column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStats {
    pub name: &'static str,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesSummary {
    pub species: Species,
    pub count: usize,
    pub proportion: f64,
    pub means: Features,
}

/// Strength of the linear relation between two features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedPair {
    pub a: &'static str,
    pub b: &'static str,
    pub r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub features: Vec<FeatureStats>,
    pub species: Vec<SpeciesSummary>,
    /// Pearson correlations in feature order.
    pub correlation: [[f64; N_FEATURES]; N_FEATURES],
}

impl DatasetSummary {
    /// Distinct feature pairs ordered by decreasing `|r|`.
    pub fn strongest_pairs(&self, limit: usize) -> Vec<CorrelatedPair> {
        let mut pairs = Vec::new();
        for i in 0..N_FEATURES {
            for j in i + 1..N_FEATURES {
                pairs.push(CorrelatedPair {
                    a: FEATURE_NAMES[i],
                    b: FEATURE_NAMES[j],
                    r: self.correlation[i][j],
                });
            }
        }
        pairs.sort_by(|x, y| y.r.abs().total_cmp(&x.r.abs()));
        pairs.truncate(limit);
        pairs
    }
}

pub fn describe(rows: &[FlowerRow]) -> Result<DatasetSummary, AnalysisError> {
    if rows.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }
    let columns: Vec<Vec<f64>> = (0..N_FEATURES)
        .map(|feature| rows.iter().map(|row| row.features()[feature]).collect())
        .collect();
    let features = columns
        .iter()
        .zip(FEATURE_NAMES)
        .map(|(column, name)| column_stats(name, column))
        .collect();

    let counts = species_counts(rows);
    let species = Species::ALL
        .iter()
        .zip(counts)
        .map(|(&species, count)| {
            let mut means = [0.0f64; N_FEATURES];
            for row in rows.iter().filter(|row| row.species == species) {
                for (mean, value) in means.iter_mut().zip(row.features()) {
                    *mean += value;
                }
            }
            if count > 0 {
                means = means.map(|sum| sum / count as f64);
            }
            SpeciesSummary {
                species,
                count,
                proportion: count as f64 / rows.len() as f64,
                means,
            }
        })
        .collect::<Vec<_>>();

    let mut correlation = [[0.0f64; N_FEATURES]; N_FEATURES];
    for i in 0..N_FEATURES {
        for j in 0..N_FEATURES {
            correlation[i][j] = if i == j { 1.0 } else { pearson(&columns[i], &columns[j]) };
        }
    }

    Ok(DatasetSummary {
        rows: rows.len(),
        features,
        species,
        correlation,
    })
}

fn column_stats(name: &'static str, column: &[f64]) -> FeatureStats {
    let n = column.len();
    let mean = mean(column);
    let variance = if n > 1 {
        column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    let mut sorted = column.to_vec();
    sorted.sort_by(f64::total_cmp);
    FeatureStats {
        name,
        count: n,
        mean,
        std: variance.sqrt(),
        variance,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[n - 1],
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear-interpolation quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Pearson correlation; zero when either column is constant.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    if va <= 0.0 || vb <= 0.0 {
        return 0.0;
    }
    cov / (va.sqrt() * vb.sqrt())
}
