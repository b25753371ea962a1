//! Flower measurements, species labels, and the loaders that produce them.

pub mod csv;
pub mod loader;
pub mod reference;
pub mod species;
pub mod split;

use serde::{Deserialize, Serialize};

pub use species::{LabelMap, N_CLASSES, Species, UnknownSpecies};

/// Number of measurements per flower.
pub const N_FEATURES: usize = 4;

/// Measurement names in feature-vector order.
pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["sepal_length", "sepal_width", "petal_length", "petal_width"];

/// Dense feature vector in [`FEATURE_NAMES`] order.
pub type Features = [f64; N_FEATURES];

/// Sepal and petal measurements of one specimen, in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub sepal_length: f64,
    pub sepal_width: f64,
    pub petal_length: f64,
    pub petal_width: f64,
}

impl Measurements {
    pub fn to_features(&self) -> Features {
        [
            self.sepal_length,
            self.sepal_width,
            self.petal_length,
            self.petal_width,
        ]
    }

    pub fn from_features(features: &Features) -> Self {
        Self {
            sepal_length: features[0],
            sepal_width: features[1],
            petal_length: features[2],
            petal_width: features[3],
        }
    }

    /// True when every measurement is a finite, strictly positive length.
    pub fn is_valid(&self) -> bool {
        self.to_features()
            .iter()
            .all(|value| value.is_finite() && *value > 0.0)
    }
}

/// One labeled specimen as produced by a loader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowerRow {
    pub measurements: Measurements,
    pub species: Species,
}

impl FlowerRow {
    pub fn new(features: Features, species: Species) -> Self {
        Self {
            measurements: Measurements::from_features(&features),
            species,
        }
    }

    pub fn features(&self) -> Features {
        self.measurements.to_features()
    }
}

/// Extract the feature matrix of a row set, preserving order.
pub fn feature_matrix(rows: &[FlowerRow]) -> Vec<Features> {
    rows.iter().map(FlowerRow::features).collect()
}

/// Extract the class codes of a row set, preserving order.
pub fn class_codes(rows: &[FlowerRow]) -> Vec<usize> {
    rows.iter().map(|row| row.species.code()).collect()
}

/// Count rows per species in label-code order.
pub fn species_counts(rows: &[FlowerRow]) -> [usize; N_CLASSES] {
    let mut counts = [0usize; N_CLASSES];
    for row in rows {
        counts[row.species.code()] += 1;
    }
    counts
}
