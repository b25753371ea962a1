//! Library exports for reuse in binaries, benchmarks and tests.
/// Statistical summaries, PCA projection and least-squares fits.
pub mod analysis;
/// Application directory resolution.
pub mod app_dirs;
/// Settings file and environment overrides.
pub mod config;
/// Flower measurements, species labels and dataset loading.
pub mod dataset;
/// Shared HTTP helpers.
pub mod http_client;
/// Logging setup and log file retention.
pub mod logging;
/// Classifiers, model selection and prediction export.
pub mod ml;
/// End-to-end training run.
pub mod pipeline;
/// Text rendering of run results.
pub mod report;
/// SQLite-backed document store for flower records.
pub mod store;
