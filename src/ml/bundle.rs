//! JSON bundle holding the best model, its name, and the label map.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::model::{FittedModel, TrainedModel};
use crate::dataset::LabelMap;

pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to write model bundle {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read model bundle {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode model bundle: {0}")]
    Encode(serde_json::Error),
    #[error("Failed to decode model bundle: {0}")]
    Decode(serde_json::Error),
    #[error("Unsupported bundle version {found} (expected {BUNDLE_VERSION})")]
    Version { found: u32 },
    #[error("Bundle label map does not match the species codes")]
    LabelMap,
}

/// Serialized best model of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: u32,
    pub name: String,
    pub accuracy: Option<f64>,
    pub label_map: LabelMap,
    pub model: FittedModel,
}

impl ModelBundle {
    pub fn from_trained(trained: &TrainedModel) -> Self {
        Self {
            version: BUNDLE_VERSION,
            name: trained.name().to_string(),
            accuracy: trained.accuracy,
            label_map: LabelMap::default(),
            model: trained.model.clone(),
        }
    }

    /// Write the bundle as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), BundleError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| BundleError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(BundleError::Encode)?;
        fs::write(path, json).map_err(|source| BundleError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), model = %self.name, "Saved model bundle");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let text = fs::read_to_string(path).map_err(|source| BundleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle: Self = serde_json::from_str(&text).map_err(BundleError::Decode)?;
        if bundle.version != BUNDLE_VERSION {
            return Err(BundleError::Version {
                found: bundle.version,
            });
        }
        if !bundle.label_map.is_canonical() {
            return Err(BundleError::LabelMap);
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::knn::KNearestNeighbors;
    use crate::ml::{Classifier, ModelKind, TrainSet};

    fn trained() -> TrainedModel {
        let x = [[5.0, 3.4, 1.5, 0.2], [6.0, 2.8, 4.5, 1.4], [6.7, 3.0, 5.8, 2.2]];
        let y = [0, 1, 2];
        let data = TrainSet::new(&x, &y).unwrap();
        TrainedModel {
            kind: ModelKind::KNearestNeighbors,
            model: FittedModel::KNearestNeighbors(KNearestNeighbors::fit(&data, 1).unwrap()),
            accuracy: Some(1.0),
        }
    }

    #[test]
    fn saved_bundle_predicts_like_the_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("best_model.json");
        let trained = trained();
        ModelBundle::from_trained(&trained).save(&path).unwrap();
        let loaded = ModelBundle::load(&path).unwrap();
        assert_eq!(loaded.name, "k-NN");
        assert_eq!(loaded.accuracy, Some(1.0));
        let probe = [6.6, 3.0, 5.6, 2.1];
        assert_eq!(loaded.model.predict(&probe), trained.model.predict(&probe));
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        let mut bundle = ModelBundle::from_trained(&trained());
        bundle.version = 99;
        bundle.save(&path).unwrap();
        assert!(matches!(
            ModelBundle::load(&path),
            Err(BundleError::Version { found: 99 })
        ));
    }
}
