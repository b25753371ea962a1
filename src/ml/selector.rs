//! Train every strategy on one split and keep the most accurate model.

use tracing::{debug, info};

use super::metrics::{ClassificationReport, accuracy_score};
use super::model::{FittedModel, ModelKind, ModelParams, TrainedModel};
use super::{Classifier, MlError, TrainSet};
use crate::dataset::split::{DataSplit, SplitError, stratified_split};
use crate::dataset::{Features, FlowerRow, N_CLASSES, Species, class_codes, feature_matrix};

/// Errors raised by the model selector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectorError {
    #[error("No models have been trained; call train_all first")]
    NotTrained,
    #[error("No best model has been selected; call evaluate first")]
    NoBestModel,
    #[error("Test set is empty")]
    EmptyTestSet,
    #[error("Failed to split dataset: {0}")]
    Split(#[from] SplitError),
    #[error("Failed to train {model}: {source}")]
    Training { model: ModelKind, source: MlError },
}

#[derive(Debug, Clone)]
pub struct SelectorOptions {
    /// Seed for the split and the randomized strategies.
    pub seed: u64,
    pub params: ModelParams,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            params: ModelParams::default(),
        }
    }
}

/// Held-out accuracy of one trained model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelScore {
    pub kind: ModelKind,
    pub accuracy: f64,
}

impl ModelScore {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Output of the best model for one measurement vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub species: Species,
    /// Class probabilities in label-code order.
    pub probabilities: [f64; N_CLASSES],
    /// Largest class probability.
    pub confidence: f64,
}

impl Prediction {
    fn from_probabilities(probabilities: [f64; N_CLASSES]) -> Self {
        let code = super::argmax(&probabilities);
        Self {
            species: Species::ALL[code],
            probabilities,
            confidence: probabilities[code],
        }
    }
}

/// Model registry for a single training run.
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    options: SelectorOptions,
    models: Vec<TrainedModel>,
    best: Option<usize>,
}

impl ModelSelector {
    pub fn new(options: SelectorOptions) -> Self {
        Self {
            options,
            models: Vec::new(),
            best: None,
        }
    }

    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    /// Stratified, seed-deterministic train/test partition.
    pub fn prepare(
        &self,
        rows: &[FlowerRow],
        test_fraction: f64,
    ) -> Result<DataSplit, SelectorError> {
        let split = stratified_split(rows, test_fraction, self.options.seed)?;
        info!(
            train = split.train.len(),
            test = split.test.len(),
            test_fraction,
            "Prepared stratified split"
        );
        Ok(split)
    }

    /// Train every strategy in [`ModelKind::ALL`] order, replacing any earlier run.
    pub fn train_all(&mut self, train: &[FlowerRow]) -> Result<(), SelectorError> {
        let x = feature_matrix(train);
        let y = class_codes(train);
        let data = TrainSet::new(&x, &y).map_err(|source| SelectorError::Training {
            model: ModelKind::ALL[0],
            source,
        })?;
        let params = self.options.params.clone().with_seed(self.options.seed);
        self.models.clear();
        self.best = None;
        for kind in ModelKind::ALL {
            let model = kind
                .train(&data, &params)
                .map_err(|source| SelectorError::Training { model: kind, source })?;
            debug!(model = kind.name(), rows = data.len(), "Trained classifier");
            self.models.push(TrainedModel {
                kind,
                model,
                accuracy: None,
            });
        }
        Ok(())
    }

    /// Score every model on `test`; returns scores by descending accuracy.
    ///
    /// The sort is stable, so equal accuracies keep training order and the
    /// first model reaching the maximum becomes the best one.
    pub fn evaluate(&mut self, test: &[FlowerRow]) -> Result<Vec<ModelScore>, SelectorError> {
        if self.models.is_empty() {
            return Err(SelectorError::NotTrained);
        }
        if test.is_empty() {
            return Err(SelectorError::EmptyTestSet);
        }
        let x = feature_matrix(test);
        let truth = class_codes(test);
        let mut scores = Vec::with_capacity(self.models.len());
        for trained in &mut self.models {
            let predicted: Vec<usize> = x.iter().map(|row| trained.model.predict(row)).collect();
            let accuracy = accuracy_score(&truth, &predicted);
            trained.accuracy = Some(accuracy);
            info!(model = trained.name(), accuracy, "Evaluated classifier");
            scores.push(ModelScore {
                kind: trained.kind,
                accuracy,
            });
        }
        scores.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        let best_kind = scores[0].kind;
        self.best = self.models.iter().position(|trained| trained.kind == best_kind);
        info!(model = best_kind.name(), accuracy = scores[0].accuracy, "Selected best model");
        Ok(scores)
    }

    /// Predictions of the best model for each measurement vector.
    pub fn predict(&self, features: &[Features]) -> Result<Vec<Prediction>, SelectorError> {
        let best = self.best().ok_or(SelectorError::NoBestModel)?;
        Ok(predict_with(&best.model, features))
    }

    pub fn best(&self) -> Option<&TrainedModel> {
        self.best.and_then(|idx| self.models.get(idx))
    }

    pub fn models(&self) -> &[TrainedModel] {
        &self.models
    }

    /// Confusion matrix and per-species metrics of the best model on `test`.
    pub fn classification_report(&self, test: &[FlowerRow]) -> Result<ClassificationReport, SelectorError> {
        let best = self.best().ok_or(SelectorError::NoBestModel)?;
        let truth = class_codes(test);
        let predicted: Vec<usize> = feature_matrix(test)
            .iter()
            .map(|row| best.model.predict(row))
            .collect();
        Ok(ClassificationReport::new(
            best.name(),
            &truth,
            &predicted,
            best.model.feature_importances(),
        ))
    }
}

/// Run any fitted model over a batch of measurement vectors.
pub fn predict_with(model: &FittedModel, features: &[Features]) -> Vec<Prediction> {
    features
        .iter()
        .map(|row| Prediction::from_probabilities(model.predict_proba(row)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_rows() -> Vec<FlowerRow> {
        let mut rows = Vec::new();
        for (species, center) in [(Species::Setosa, 1.0), (Species::Versicolor, 4.0), (Species::Virginica, 7.0)] {
            for step in 0..10 {
                let offset = step as f64 * 0.05;
                rows.push(FlowerRow::new(
                    [center + offset, 3.0 + offset, center + offset, center / 3.0 + offset],
                    species,
                ));
            }
        }
        rows
    }

    fn fast_options() -> SelectorOptions {
        let mut options = SelectorOptions::default();
        options.params.forest.n_trees = 10;
        options.params.logreg.epochs = 300;
        options
    }

    #[test]
    fn evaluate_before_training_fails() {
        let mut selector = ModelSelector::new(SelectorOptions::default());
        let rows = separable_rows();
        assert_eq!(selector.evaluate(&rows).unwrap_err(), SelectorError::NotTrained);
        assert_eq!(
            selector.predict(&[[1.0, 3.0, 1.0, 0.3]]).unwrap_err(),
            SelectorError::NoBestModel
        );
    }

    #[test]
    fn equal_accuracies_keep_training_order() {
        let rows = separable_rows();
        let mut selector = ModelSelector::new(fast_options());
        let split = selector.prepare(&rows, 0.2).unwrap();
        selector.train_all(&split.train).unwrap();
        let scores = selector.evaluate(&split.test).unwrap();
        assert_eq!(scores.len(), ModelKind::ALL.len());
        assert!(scores.iter().all(|score| score.accuracy == 1.0), "{scores:?}");
        let order: Vec<ModelKind> = scores.iter().map(|score| score.kind).collect();
        assert_eq!(order, ModelKind::ALL.to_vec());
        assert_eq!(selector.best().map(|best| best.kind), Some(ModelKind::RandomForest));
    }

    #[test]
    fn predictions_carry_confidence() {
        let rows = separable_rows();
        let mut selector = ModelSelector::new(fast_options());
        let split = selector.prepare(&rows, 0.2).unwrap();
        selector.train_all(&split.train).unwrap();
        selector.evaluate(&split.test).unwrap();
        let predictions = selector.predict(&[[7.2, 3.2, 7.2, 2.5]]).unwrap();
        let prediction = predictions[0];
        assert_eq!(prediction.species, Species::Virginica);
        let max = prediction.probabilities.iter().copied().fold(0.0, f64::max);
        assert_eq!(prediction.confidence, max);
        assert!((prediction.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn retraining_clears_the_best_model() {
        let rows = separable_rows();
        let mut selector = ModelSelector::new(fast_options());
        let split = selector.prepare(&rows, 0.2).unwrap();
        selector.train_all(&split.train).unwrap();
        selector.evaluate(&split.test).unwrap();
        selector.train_all(&split.train).unwrap();
        assert!(selector.best().is_none());
        assert!(selector.models().iter().all(|model| model.accuracy.is_none()));
    }
}
