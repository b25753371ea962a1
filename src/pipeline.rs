//! The end-to-end run: load, analyse, train, select, export, persist.

use std::path::PathBuf;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::analysis::{
    AnalysisError, DatasetSummary, Projection, RegressionFit, describe, fit_multiple, fit_simple,
    project_pca,
};
use crate::config::AppConfig;
use crate::dataset::loader::{LoadedDataset, load_flowers};
use crate::dataset::{FlowerRow, feature_matrix};
use crate::ml::bundle::{BundleError, ModelBundle};
use crate::ml::export::{ExportError, PredictionRecord, assign_ids, export};
use crate::ml::metrics::ClassificationReport;
use crate::ml::{ModelScore, ModelSelector, SelectorError};
use crate::store::{FlowerRecord, FlowerStore, IndexInfo, MergeReport, SpeciesCounts, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Selector(#[from] SelectorError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Skip the document store entirely.
    pub skip_store: bool,
    /// Write the best-model bundle here.
    pub model_path: Option<PathBuf>,
}

/// What happened to the records on the store side.
#[derive(Debug)]
pub enum Persistence {
    Skipped,
    /// The store could not be used; the run continued without it.
    Unavailable(StoreError),
    Stored(StoreSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSummary {
    pub inserted: usize,
    pub counts: SpeciesCounts,
    pub merge: MergeReport,
    pub indexes: Vec<IndexInfo>,
    pub sample: Option<FlowerRecord>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub dataset: LoadedDataset,
    pub summary: DatasetSummary,
    pub projection: Projection,
    pub simple_regression: RegressionFit,
    pub multiple_regression: RegressionFit,
    pub train_rows: usize,
    pub test_rows: usize,
    pub scores: Vec<ModelScore>,
    /// Best model on the held-out rows.
    pub test_report: ClassificationReport,
    /// Best model on every row.
    pub full_report: ClassificationReport,
    pub predictions: Vec<PredictionRecord>,
    pub model_path: Option<PathBuf>,
    pub persistence: Persistence,
}

pub fn run(config: &AppConfig, options: &PipelineOptions) -> Result<PipelineOutcome, PipelineError> {
    let dataset = load_flowers(&config.data.source);
    let rows = &dataset.rows;

    let summary = describe(rows)?;
    let projection = project_pca(rows)?;
    let simple_regression = fit_simple(rows)?;
    let multiple_regression = fit_multiple(rows)?;

    let mut selector = ModelSelector::new(config.selector_options());
    let split = selector.prepare(rows, config.training.test_fraction)?;
    selector.train_all(&split.train)?;
    let scores = selector.evaluate(&split.test)?;
    let test_report = selector.classification_report(&split.test)?;
    let full_report = selector.classification_report(rows)?;

    let ids = assign_ids(rows.len());
    let predictions = export(&selector, &feature_matrix(rows), &ids)?;

    let model_path = match (&options.model_path, selector.best()) {
        (Some(path), Some(best)) => {
            ModelBundle::from_trained(best).save(path)?;
            Some(path.clone())
        }
        _ => None,
    };

    let persistence = if options.skip_store {
        Persistence::Skipped
    } else {
        let stored = config
            .store_config()
            .map_err(StoreError::from)
            .and_then(|store_config| FlowerStore::open(&store_config))
            .and_then(|store| persist(store, rows, &predictions));
        match stored {
            Ok(summary) => Persistence::Stored(summary),
            Err(err) => {
                warn!(error = %err, "Document store unavailable; continuing without persistence");
                Persistence::Unavailable(err)
            }
        }
    };

    info!(
        rows = rows.len(),
        best = test_report.model.as_str(),
        accuracy = test_report.accuracy,
        "Pipeline finished"
    );
    Ok(PipelineOutcome {
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        dataset,
        summary,
        projection,
        simple_regression,
        multiple_regression,
        scores,
        test_report,
        full_report,
        predictions,
        model_path,
        persistence,
    })
}

/// Replace the collection, index it, attach predictions, and read back totals.
pub fn persist(
    mut store: FlowerStore,
    rows: &[FlowerRow],
    predictions: &[PredictionRecord],
) -> Result<StoreSummary, StoreError> {
    let records = FlowerRecord::from_rows(rows, OffsetDateTime::now_utc());
    let inserted = store.replace_all(&records)?;
    store.ensure_indexes()?;
    let merge = store.merge_predictions(predictions)?;
    let summary = StoreSummary {
        inserted,
        counts: store.aggregate_counts()?,
        merge,
        indexes: store.list_indexes()?,
        sample: store.find_one_with_prediction()?,
    };
    store.close()?;
    Ok(summary)
}
