//! Evaluation metrics for the species classifiers.

use serde::{Deserialize, Serialize};

use crate::dataset::{Features, N_CLASSES, Species};

/// Confusion matrix over the three species.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// `counts[truth][predicted]`.
    pub counts: [[u32; N_CLASSES]; N_CLASSES],
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= N_CLASSES || predicted >= N_CLASSES {
            return;
        }
        let cell = &mut self.counts[truth][predicted];
        *cell = cell.saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth][predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().map(|&v| v as u64).sum()
    }
}

/// Precision/recall statistics for a single species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerClassStats {
    pub species: Species,
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`; equals the per-species accuracy.
    pub recall: f64,
    pub f1: f64,
    /// Number of true examples of the species.
    pub support: u32,
}

/// Per-species precision, recall, and F1 from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    Species::ALL
        .iter()
        .map(|&species| {
            let class_idx = species.code();
            let tp = cm.get(class_idx, class_idx) as f64;
            let support: u32 = cm.counts[class_idx].iter().sum();
            let fn_ = support as f64 - tp;
            let fp: f64 = (0..N_CLASSES)
                .filter(|&i| i != class_idx)
                .map(|i| cm.get(i, class_idx) as f64)
                .sum();
            let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
            let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            PerClassStats {
                species,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

/// Overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = (0..N_CLASSES).map(|i| cm.get(i, i) as u64).sum();
    correct as f64 / total as f64
}

/// Fraction of positions where `truth` and `predicted` agree.
pub fn accuracy_score(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// Held-out evaluation summary for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub model: String,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<PerClassStats>,
    /// Present for tree-based models only.
    pub feature_importances: Option<Features>,
}

impl ClassificationReport {
    pub fn new(
        model: impl Into<String>,
        truth: &[usize],
        predicted: &[usize],
        feature_importances: Option<Features>,
    ) -> Self {
        let confusion = ConfusionMatrix::from_labels(truth, predicted);
        Self {
            model: model.into(),
            accuracy: accuracy(&confusion),
            per_class: precision_recall_by_class(&confusion),
            confusion,
            feature_importances,
        }
    }

    /// Recall of one species, i.e. its share of correctly classified rows.
    pub fn species_accuracy(&self, species: Species) -> f64 {
        self.per_class
            .iter()
            .find(|stats| stats.species == species)
            .map(|stats| stats.recall)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_follow_confusion_counts() {
        let truth = [0, 0, 1, 1, 2, 2];
        let predicted = [0, 0, 1, 2, 2, 2];
        let cm = ConfusionMatrix::from_labels(&truth, &predicted);
        assert_eq!(cm.get(1, 2), 1);
        assert!((accuracy(&cm) - 5.0 / 6.0).abs() < 1e-12);
        assert!((accuracy_score(&truth, &predicted) - 5.0 / 6.0).abs() < 1e-12);

        let stats = precision_recall_by_class(&cm);
        assert_eq!(stats[0].species, Species::Setosa);
        assert_eq!(stats[0].f1, 1.0);
        assert_eq!(stats[1].precision, 1.0);
        assert_eq!(stats[1].recall, 0.5);
        assert!((stats[2].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats[2].support, 2);
    }

    #[test]
    fn report_exposes_species_accuracy() {
        let report = ClassificationReport::new("k-NN", &[0, 1, 1, 2], &[0, 1, 2, 2], None);
        assert_eq!(report.accuracy, 0.75);
        assert_eq!(report.species_accuracy(Species::Setosa), 1.0);
        assert_eq!(report.species_accuracy(Species::Versicolor), 0.5);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(accuracy(&ConfusionMatrix::default()), 0.0);
        assert_eq!(accuracy_score(&[], &[]), 0.0);
    }
}
