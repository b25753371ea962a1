use rusqlite::params;
use tracing::{info, warn};

use super::util::map_sql_error;
use super::{FlowerRecord, FlowerStore, StoreError, schema};
use crate::ml::export::PredictionRecord;

/// Outcome of attaching predictions by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Predictions written to a stored flower.
    pub matched: usize,
    /// Identifiers with no stored flower, in input order.
    pub skipped: Vec<String>,
}

impl MergeReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl FlowerStore {
    /// Drop the collection (documents and indexes) and insert `records` in one transaction.
    pub fn replace_all(&mut self, records: &[FlowerRecord]) -> Result<usize, StoreError> {
        let tx = self.connection.transaction().map_err(map_sql_error)?;
        schema::drop_collection(&tx, &self.collection)?;
        schema::create_collection(&tx, &self.collection)?;
        {
            let mut stmt = tx
                .prepare(&format!("INSERT INTO \"{}\" (doc) VALUES (?1)", self.collection))
                .map_err(map_sql_error)?;
            for record in records {
                let doc = serde_json::to_string(record).map_err(|source| StoreError::Document {
                    id: record.id.clone(),
                    source,
                })?;
                stmt.execute(params![doc]).map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)?;
        info!(collection = %self.collection, inserted = records.len(), "Replaced collection");
        Ok(records.len())
    }

    /// Set prediction fields on the first flower with each identifier.
    ///
    /// Identifiers with no stored flower are skipped and listed in the report.
    pub fn merge_predictions(&mut self, predictions: &[PredictionRecord]) -> Result<MergeReport, StoreError> {
        let mut report = MergeReport::default();
        let tx = self.connection.transaction().map_err(map_sql_error)?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "UPDATE \"{c}\"
                     SET doc = json_set(doc, '$.prediction', ?2, '$.confidence', ?3, '$.model', ?4)
                     WHERE seq = (
                        SELECT seq FROM \"{c}\"
                        WHERE json_extract(doc, '$.id') = ?1
                        ORDER BY seq LIMIT 1
                     )",
                    c = self.collection
                ))
                .map_err(map_sql_error)?;
            for prediction in predictions {
                let changed = stmt
                    .execute(params![
                        prediction.id,
                        prediction.prediction.as_str(),
                        prediction.confidence,
                        prediction.model
                    ])
                    .map_err(map_sql_error)?;
                if changed == 0 {
                    report.skipped.push(prediction.id.clone());
                } else {
                    report.matched += 1;
                }
            }
        }
        tx.commit().map_err(map_sql_error)?;
        if !report.is_complete() {
            warn!(
                collection = %self.collection,
                skipped = report.skipped.len(),
                first = %report.skipped[0],
                "Predictions without a stored flower were skipped"
            );
        }
        info!(matched = report.matched, "Merged predictions");
        Ok(report)
    }
}
