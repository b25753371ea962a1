//! The closed set of classifier strategies and their fitted forms.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::forest::{ForestOptions, RandomForest};
use super::knn::KNearestNeighbors;
use super::logreg::{LogRegOptions, LogisticRegression};
use super::svm::{SupportVectorClassifier, SvmOptions};
use super::tree::{DecisionTree, TreeOptions};
use super::{Classifier, MlError, TrainSet};
use crate::dataset::{Features, N_CLASSES};

/// Classifier families trained on every run, in training order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    DecisionTree,
    KNearestNeighbors,
    Svm,
    LogisticRegression,
}

impl ModelKind {
    /// Training order; earlier kinds win accuracy ties.
    pub const ALL: [ModelKind; 5] = [
        ModelKind::RandomForest,
        ModelKind::DecisionTree,
        ModelKind::KNearestNeighbors,
        ModelKind::Svm,
        ModelKind::LogisticRegression,
    ];

    /// Human-readable name stored alongside predictions.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::KNearestNeighbors => "k-NN",
            ModelKind::Svm => "SVM",
            ModelKind::LogisticRegression => "Logistic Regression",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn train(self, data: &TrainSet<'_>, params: &ModelParams) -> Result<FittedModel, MlError> {
        Ok(match self {
            ModelKind::RandomForest => FittedModel::RandomForest(RandomForest::fit(data, &params.forest)?),
            ModelKind::DecisionTree => FittedModel::DecisionTree(DecisionTree::fit(data, &params.tree)?),
            ModelKind::KNearestNeighbors => {
                FittedModel::KNearestNeighbors(KNearestNeighbors::fit(data, params.k)?)
            }
            ModelKind::Svm => FittedModel::Svm(SupportVectorClassifier::fit(data, &params.svm)?),
            ModelKind::LogisticRegression => {
                FittedModel::LogisticRegression(LogisticRegression::fit(data, &params.logreg)?)
            }
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hyperparameters for every strategy.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub forest: ForestOptions,
    pub tree: TreeOptions,
    pub k: usize,
    pub svm: SvmOptions,
    pub logreg: LogRegOptions,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            forest: ForestOptions::default(),
            tree: TreeOptions::default(),
            k: 5,
            svm: SvmOptions::default(),
            logreg: LogRegOptions::default(),
        }
    }
}

impl ModelParams {
    /// Apply one seed to every randomized strategy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.forest.seed = seed;
        self.tree.seed = seed;
        self
    }
}

/// A fitted classifier of one of the known kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum FittedModel {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    KNearestNeighbors(KNearestNeighbors),
    Svm(SupportVectorClassifier),
    LogisticRegression(LogisticRegression),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::RandomForest(_) => ModelKind::RandomForest,
            FittedModel::DecisionTree(_) => ModelKind::DecisionTree,
            FittedModel::KNearestNeighbors(_) => ModelKind::KNearestNeighbors,
            FittedModel::Svm(_) => ModelKind::Svm,
            FittedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
        }
    }

    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            FittedModel::RandomForest(model) => model,
            FittedModel::DecisionTree(model) => model,
            FittedModel::KNearestNeighbors(model) => model,
            FittedModel::Svm(model) => model,
            FittedModel::LogisticRegression(model) => model,
        }
    }

    /// Impurity-based importances for tree models.
    pub fn feature_importances(&self) -> Option<Features> {
        match self {
            FittedModel::RandomForest(model) => Some(model.feature_importances()),
            FittedModel::DecisionTree(model) => Some(model.feature_importances()),
            _ => None,
        }
    }
}

impl Classifier for FittedModel {
    fn predict_proba(&self, features: &Features) -> [f64; N_CLASSES] {
        self.as_classifier().predict_proba(features)
    }
}

/// A fitted model plus its held-out accuracy once evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub kind: ModelKind,
    pub model: FittedModel,
    pub accuracy: Option<f64>,
}

impl TrainedModel {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}
