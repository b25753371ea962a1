//! Exploratory statistics, regression, and projection of the measurements.

pub mod describe;
pub mod projection;
pub mod regression;

/// Errors raised by the analysis helpers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("No rows to analyse")]
    EmptyDataset,
    #[error("Need at least {needed} rows, got {found}")]
    TooFewRows { needed: usize, found: usize },
    #[error("Design matrix is singular; predictors are collinear")]
    Singular,
    #[error("Projection failed: {0}")]
    Projection(String),
}

pub use describe::{DatasetSummary, FeatureStats, describe};
pub use projection::{Projection, project_pca};
pub use regression::{RegressionFit, ResidualDiagnostics, fit_multiple, fit_ols, fit_simple};
