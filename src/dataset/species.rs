//! Species labels and their fixed integer codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of species in the Iris dataset.
pub const N_CLASSES: usize = 3;

/// One of the three Iris species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Setosa,
    Versicolor,
    Virginica,
}

impl Species {
    /// All species in label-code order.
    pub const ALL: [Species; N_CLASSES] = [Species::Setosa, Species::Versicolor, Species::Virginica];

    /// Lowercase name used in documents and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Species::Setosa => "setosa",
            Species::Versicolor => "versicolor",
            Species::Virginica => "virginica",
        }
    }

    /// Integer code used by the classifiers.
    pub fn code(self) -> usize {
        match self {
            Species::Setosa => 0,
            Species::Versicolor => 1,
            Species::Virginica => 2,
        }
    }

    /// Inverse of [`Species::code`].
    pub fn from_code(code: usize) -> Option<Self> {
        Self::ALL.get(code).copied()
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a label does not name a known species.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown species label: {0}")]
pub struct UnknownSpecies(pub String);

impl FromStr for Species {
    type Err = UnknownSpecies;

    /// Accepts `setosa`, `Iris-setosa`, `IRIS SETOSA` and similar spellings.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_matches('"').to_ascii_lowercase();
        let name = trimmed
            .strip_prefix("iris-")
            .or_else(|| trimmed.strip_prefix("iris "))
            .or_else(|| trimmed.strip_prefix("iris_"))
            .unwrap_or(&trimmed);
        match name {
            "setosa" => Ok(Species::Setosa),
            "versicolor" | "versicolour" => Ok(Species::Versicolor),
            "virginica" => Ok(Species::Virginica),
            _ => Err(UnknownSpecies(value.to_string())),
        }
    }
}

/// Bidirectional mapping between species names and class codes.
///
/// The mapping is total and identical for every run; it is persisted with
/// model bundles so a loaded model decodes its outputs the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    names: Vec<String>,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            names: Species::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        }
    }
}

impl LabelMap {
    /// Class code for a species name.
    pub fn encode(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    /// Species name for a class code.
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Ordered class names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Check that the map matches the canonical species codes.
    pub fn is_canonical(&self) -> bool {
        *self == Self::default()
    }
}
