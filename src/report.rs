//! Plain-text rendering of pipeline results for the terminal.

use std::fmt::Write as _;

use crate::analysis::{DatasetSummary, Projection, RegressionFit};
use crate::dataset::{FEATURE_NAMES, N_CLASSES, Species};
use crate::ml::ModelScore;
use crate::ml::metrics::ClassificationReport;
use crate::pipeline::{Persistence, PipelineOutcome, StoreSummary};

const RULE: &str = "================================================================";

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{RULE}\n{title}\n{RULE}");
}

pub fn render_outcome(outcome: &PipelineOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Data: {} rows from {}",
        outcome.dataset.rows.len(),
        outcome.dataset.origin
    );
    if let Some(reason) = &outcome.dataset.fallback_reason {
        let _ = writeln!(out, "  (fell back to reference data: {reason})");
    }
    out.push_str(&render_summary(&outcome.summary));
    out.push_str(&render_projection(&outcome.projection));
    out.push_str(&render_regression(&outcome.simple_regression));
    out.push_str(&render_regression(&outcome.multiple_regression));
    section(&mut out, "CLASSIFICATION");
    let _ = writeln!(
        out,
        "Split: {} train / {} test",
        outcome.train_rows, outcome.test_rows
    );
    out.push_str(&render_scores(&outcome.scores));
    out.push_str(&render_classification(&outcome.test_report, "test set"));
    out.push_str(&render_classification(&outcome.full_report, "full dataset"));
    if let Some(path) = &outcome.model_path {
        let _ = writeln!(out, "\nModel bundle saved to {}", path.display());
    }
    out.push_str(&render_persistence(&outcome.persistence));
    out
}

pub fn render_summary(summary: &DatasetSummary) -> String {
    let mut out = String::new();
    section(&mut out, "DESCRIPTIVE STATISTICS");
    let _ = writeln!(
        out,
        "{:<14}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
        "feature", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for stats in &summary.features {
        let _ = writeln!(
            out,
            "{:<14}{:>8.3}{:>8.3}{:>8.2}{:>8.2}{:>8.2}{:>8.2}{:>8.2}",
            stats.name, stats.mean, stats.std, stats.min, stats.q25, stats.median, stats.q75, stats.max
        );
    }
    let _ = writeln!(out, "\nSpecies:");
    for species in &summary.species {
        let _ = writeln!(
            out,
            "  {:<11} {:>4} ({:>5.1}%)  means: {}",
            species.species.as_str(),
            species.count,
            species.proportion * 100.0,
            species
                .means
                .iter()
                .map(|m| format!("{m:.2}"))
                .collect::<Vec<_>>()
                .join(" / ")
        );
    }
    let _ = writeln!(out, "\nStrongest correlations:");
    for pair in summary.strongest_pairs(3) {
        let _ = writeln!(out, "  {} ~ {}: r = {:.3}", pair.a, pair.b, pair.r);
    }
    out
}

pub fn render_projection(projection: &Projection) -> String {
    let [first, second] = projection.explained_variance_ratio;
    format!(
        "\nPCA: PC1 explains {:.1}%, PC2 {:.1}% (total {:.1}%)\n",
        first * 100.0,
        second * 100.0,
        (first + second) * 100.0
    )
}

pub fn render_regression(fit: &RegressionFit) -> String {
    let mut out = String::new();
    section(&mut out, &format!("REGRESSION: {} ~ {}", fit.target, fit.predictors.join(" + ")));
    let _ = writeln!(out, "intercept      {:>9.4}", fit.intercept);
    for (name, coefficient) in fit.predictors.iter().zip(&fit.coefficients) {
        let _ = writeln!(out, "{name:<14} {coefficient:>9.4}");
    }
    let _ = writeln!(out, "R^2 = {:.4}   RMSE = {:.4}", fit.r_squared, fit.rmse);
    let r = &fit.residuals;
    let _ = writeln!(
        out,
        "residuals: mean={:.2e} var={:.4} skew={:.3} kurtosis={:.3} JB={:.3}",
        r.mean, r.variance, r.skewness, r.kurtosis, r.jarque_bera
    );
    out
}

pub fn render_scores(scores: &[ModelScore]) -> String {
    let mut out = String::from("\nModel accuracies (best first):\n");
    for (rank, score) in scores.iter().enumerate() {
        let marker = if rank == 0 { "*" } else { " " };
        let _ = writeln!(out, " {marker} {:<20} {:.4}", score.name(), score.accuracy);
    }
    out
}

pub fn render_classification(report: &ClassificationReport, scope: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{} on {scope}: accuracy {:.4}",
        report.model, report.accuracy
    );
    let _ = writeln!(
        out,
        "  {:<11}{:>10}{:>8}{:>8}{:>9}",
        "species", "precision", "recall", "f1", "support"
    );
    for stats in &report.per_class {
        let _ = writeln!(
            out,
            "  {:<11}{:>10.3}{:>8.3}{:>8.3}{:>9}",
            stats.species.as_str(),
            stats.precision,
            stats.recall,
            stats.f1,
            stats.support
        );
    }
    let _ = writeln!(out, "  confusion matrix (rows=true, cols=pred):");
    for truth in 0..N_CLASSES {
        let cells: String = (0..N_CLASSES)
            .map(|pred| format!("{:5}", report.confusion.get(truth, pred)))
            .collect();
        let _ = writeln!(out, "  {:<11}{cells}", Species::ALL[truth].as_str());
    }
    if let Some(importances) = report.feature_importances {
        let _ = writeln!(out, "  feature importances:");
        let mut ranked: Vec<(&str, f64)> = FEATURE_NAMES.into_iter().zip(importances).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (name, value) in ranked {
            let _ = writeln!(out, "    {name:<14} {value:.3}");
        }
    }
    out
}

pub fn render_persistence(persistence: &Persistence) -> String {
    let mut out = String::new();
    section(&mut out, "PERSISTENCE");
    match persistence {
        Persistence::Skipped => out.push_str("Document store skipped.\n"),
        Persistence::Unavailable(err) => {
            let _ = writeln!(out, "Document store unavailable: {err}");
            out.push_str(&store_guidance());
        }
        Persistence::Stored(summary) => out.push_str(&render_store_summary(summary)),
    }
    out
}

pub fn render_store_summary(summary: &StoreSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Inserted {} documents", summary.inserted);
    let _ = writeln!(out, "Total documents: {}", summary.counts.total);
    for (species, count) in &summary.counts.by_species {
        let _ = writeln!(out, "  {species:<11} {count}");
    }
    let _ = writeln!(
        out,
        "Indexes: {}",
        summary
            .indexes
            .iter()
            .map(|index| index.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let _ = writeln!(out, "Predictions merged: {}", summary.merge.matched);
    if !summary.merge.skipped.is_empty() {
        let _ = writeln!(
            out,
            "Predictions skipped (no matching flower): {}",
            summary.merge.skipped.join(", ")
        );
    }
    if let Some(sample) = &summary.sample {
        let _ = writeln!(
            out,
            "Sample: {} {} -> {} ({:.3}, {})",
            sample.id,
            sample.species.as_str(),
            sample.prediction.map(Species::as_str).unwrap_or("-"),
            sample.confidence.unwrap_or(0.0),
            sample.model.as_deref().unwrap_or("-")
        );
    }
    out
}

/// Hints printed when the store cannot be opened.
pub fn store_guidance() -> String {
    [
        "The run continued without persistence. To enable it:",
        "  - set IRISLAB_DB_PATH to a writable SQLite file, or",
        "  - set [store] path in config.toml under the irislab app directory,",
        "  - or pass --skip-store to silence this section.",
    ]
    .join("\n")
        + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ModelKind;

    #[test]
    fn scores_mark_the_best_model() {
        let scores = [
            ModelScore {
                kind: ModelKind::Svm,
                accuracy: 1.0,
            },
            ModelScore {
                kind: ModelKind::KNearestNeighbors,
                accuracy: 0.9667,
            },
        ];
        let text = render_scores(&scores);
        assert!(text.contains(" * SVM"));
        assert!(text.contains("   k-NN"));
    }

    #[test]
    fn classification_lists_every_species() {
        let report = ClassificationReport::new(
            "Decision Tree",
            &[0, 1, 2],
            &[0, 1, 1],
            Some([0.0, 0.1, 0.5, 0.4]),
        );
        let text = render_classification(&report, "test set");
        for species in Species::ALL {
            assert!(text.contains(species.as_str()));
        }
        let petal = text.find("petal_length").unwrap();
        let sepal = text.find("sepal_width").unwrap();
        assert!(petal < sepal);
    }

    #[test]
    fn unavailable_store_prints_guidance() {
        let err = crate::store::StoreError::InvalidCollection("x-y".to_string());
        let text = render_persistence(&Persistence::Unavailable(err));
        assert!(text.contains("IRISLAB_DB_PATH"));
    }
}
