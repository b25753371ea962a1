//! Two-component PCA projection via `linfa-reduction`.

use linfa::Dataset;
use linfa::traits::{Fit, Predict};
use linfa_reduction::Pca;
use ndarray::{Array1, Array2};
use serde::Serialize;

use super::AnalysisError;
use crate::dataset::{FlowerRow, N_FEATURES, Species, class_codes};

const COMPONENTS: usize = 2;

/// Rows projected onto the first two principal components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub points: Vec<([f64; COMPONENTS], Species)>,
    /// Share of total variance carried by each component.
    pub explained_variance_ratio: [f64; COMPONENTS],
}

pub fn project_pca(rows: &[FlowerRow]) -> Result<Projection, AnalysisError> {
    if rows.len() <= COMPONENTS {
        return Err(AnalysisError::TooFewRows {
            needed: COMPONENTS + 1,
            found: rows.len(),
        });
    }
    let records = Array2::from_shape_fn((rows.len(), N_FEATURES), |(i, j)| rows[i].features()[j]);
    let targets = Array1::from(class_codes(rows));
    let dataset = Dataset::new(records, targets);

    let pca = Pca::params(COMPONENTS)
        .fit(&dataset)
        .map_err(|err| AnalysisError::Projection(err.to_string()))?;
    let ratios = pca.explained_variance_ratio();
    let mut explained_variance_ratio = [0.0f64; COMPONENTS];
    for (slot, ratio) in explained_variance_ratio.iter_mut().zip(ratios.iter()) {
        *slot = *ratio;
    }

    let projected = pca.predict(dataset);
    let records = projected.records();
    if records.ncols() < COMPONENTS {
        return Err(AnalysisError::Projection(format!(
            "expected {COMPONENTS} components, got {}",
            records.ncols()
        )));
    }
    let points = records
        .rows()
        .into_iter()
        .zip(rows)
        .map(|(point, row)| ([point[0], point[1]], row.species))
        .collect();
    Ok(Projection {
        points,
        explained_variance_ratio,
    })
}
