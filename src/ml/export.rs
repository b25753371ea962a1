//! Shape best-model outputs into records keyed by flower identifier.

use serde::{Deserialize, Serialize};

use super::selector::{ModelSelector, SelectorError};
use crate::dataset::{Features, Species};

/// Fixed prefix of every flower identifier.
pub const ID_PREFIX: &str = "IR";

/// Identifier of the row at `idx`: `IR000`, `IR001`, ...
pub fn flower_id(idx: usize) -> String {
    format!("{ID_PREFIX}{idx:03}")
}

/// Identifiers for `len` rows in order.
pub fn assign_ids(len: usize) -> Vec<String> {
    (0..len).map(flower_id).collect()
}

/// A model's inferred species for one stored flower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub prediction: Species,
    pub confidence: f64,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("Got {features} feature rows but {ids} identifiers")]
    LengthMismatch { features: usize, ids: usize },
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Predict every row with the selector's best model.
pub fn export(
    selector: &ModelSelector,
    features: &[Features],
    ids: &[String],
) -> Result<Vec<PredictionRecord>, ExportError> {
    if features.len() != ids.len() {
        return Err(ExportError::LengthMismatch {
            features: features.len(),
            ids: ids.len(),
        });
    }
    let model = selector.best().ok_or(SelectorError::NoBestModel)?.name();
    let predictions = selector.predict(features)?;
    Ok(ids
        .iter()
        .zip(predictions)
        .map(|(id, prediction)| PredictionRecord {
            id: id.clone(),
            prediction: prediction.species,
            confidence: prediction.confidence,
            model: model.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::SelectorOptions;

    #[test]
    fn ids_are_zero_padded_and_ordered() {
        assert_eq!(flower_id(0), "IR000");
        assert_eq!(flower_id(42), "IR042");
        assert_eq!(flower_id(1234), "IR1234");
        assert_eq!(assign_ids(3), vec!["IR000", "IR001", "IR002"]);
        assert_eq!(assign_ids(150), assign_ids(150));
    }

    #[test]
    fn export_requires_best_model_and_matching_lengths() {
        let selector = ModelSelector::new(SelectorOptions::default());
        let features = [[5.1, 3.5, 1.4, 0.2]];
        assert_eq!(
            export(&selector, &features, &assign_ids(2)).unwrap_err(),
            ExportError::LengthMismatch { features: 1, ids: 2 }
        );
        assert_eq!(
            export(&selector, &features, &assign_ids(1)).unwrap_err(),
            ExportError::Selector(SelectorError::NoBestModel)
        );
    }
}
