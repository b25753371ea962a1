use std::collections::BTreeMap;

use rusqlite::{OptionalExtension, Params};

use super::util::map_sql_error;
use super::{FlowerRecord, FlowerStore, StoreError};
use crate::dataset::Species;

/// Document totals overall and per stored species label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesCounts {
    pub total: usize,
    pub by_species: BTreeMap<String, usize>,
}

impl SpeciesCounts {
    pub fn get(&self, species: Species) -> usize {
        self.by_species.get(species.as_str()).copied().unwrap_or(0)
    }
}

impl FlowerStore {
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .connection
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", self.collection), [], |row| {
                row.get(0)
            })
            .map_err(map_sql_error)?;
        Ok(count.max(0) as usize)
    }

    /// Total document count and counts grouped by species.
    pub fn aggregate_counts(&self) -> Result<SpeciesCounts, StoreError> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT json_extract(doc, '$.species') AS species, COUNT(*)
                 FROM \"{}\" GROUP BY species ORDER BY species",
                self.collection
            ))
            .map_err(map_sql_error)?;
        let groups = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    row.get::<_, i64>(1)?,
                ))
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        let mut counts = SpeciesCounts::default();
        for (species, count) in groups {
            let count = count.max(0) as usize;
            counts.total += count;
            counts.by_species.insert(species, count);
        }
        Ok(counts)
    }

    /// Every document in insertion order.
    pub fn all(&self) -> Result<Vec<FlowerRecord>, StoreError> {
        self.select("1 = 1", [])
    }

    pub fn find_by_species(&self, species: Species) -> Result<Vec<FlowerRecord>, StoreError> {
        self.select("json_extract(doc, '$.species') = ?1", [species.as_str()])
    }

    /// Flowers with `petal_length > min_length`.
    pub fn find_petal_length_above(&self, min_length: f64) -> Result<Vec<FlowerRecord>, StoreError> {
        self.select("json_extract(doc, '$.features.petal_length') > ?1", [min_length])
    }

    /// Flowers with `petal_length > min_length` and `petal_width > min_width`.
    pub fn find_petals_above(&self, min_length: f64, min_width: f64) -> Result<Vec<FlowerRecord>, StoreError> {
        self.select(
            "json_extract(doc, '$.features.petal_length') > ?1
             AND json_extract(doc, '$.features.petal_width') > ?2",
            [min_length, min_width],
        )
    }

    /// Flowers with `sepal_length < max_length`.
    pub fn find_sepal_length_below(&self, max_length: f64) -> Result<Vec<FlowerRecord>, StoreError> {
        self.select("json_extract(doc, '$.features.sepal_length') < ?1", [max_length])
    }

    pub fn find_one(&self) -> Result<Option<FlowerRecord>, StoreError> {
        self.select_one("1 = 1")
    }

    /// First flower carrying a merged prediction.
    pub fn find_one_with_prediction(&self) -> Result<Option<FlowerRecord>, StoreError> {
        self.select_one("json_type(doc, '$.prediction') IS NOT NULL")
    }

    fn select(&self, filter: &str, params: impl Params) -> Result<Vec<FlowerRecord>, StoreError> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT doc FROM \"{}\" WHERE {filter} ORDER BY seq",
                self.collection
            ))
            .map_err(map_sql_error)?;
        let docs = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        docs.iter().map(|doc| decode(doc)).collect()
    }

    fn select_one(&self, filter: &str) -> Result<Option<FlowerRecord>, StoreError> {
        let doc: Option<String> = self
            .connection
            .query_row(
                &format!(
                    "SELECT doc FROM \"{}\" WHERE {filter} ORDER BY seq LIMIT 1",
                    self.collection
                ),
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)?;
        doc.as_deref().map(decode).transpose()
    }
}

fn decode(doc: &str) -> Result<FlowerRecord, StoreError> {
    serde_json::from_str(doc).map_err(|source| StoreError::Document {
        id: serde_json::from_str::<serde_json::Value>(doc)
            .ok()
            .and_then(|value| value.get("id").and_then(|id| id.as_str()).map(str::to_string))
            .unwrap_or_else(|| "<unknown>".to_string()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::reference::reference_flowers;
    use time::OffsetDateTime;

    fn populated() -> FlowerStore {
        let mut store = FlowerStore::open_in_memory("flowers").unwrap();
        let records = FlowerRecord::from_rows(&reference_flowers(), OffsetDateTime::UNIX_EPOCH);
        store.replace_all(&records).unwrap();
        store.ensure_indexes().unwrap();
        store
    }

    #[test]
    fn empty_collection_reads_are_empty() {
        let store = FlowerStore::open_in_memory("flowers").unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.aggregate_counts().unwrap(), SpeciesCounts::default());
        assert!(store.all().unwrap().is_empty());
        assert!(store.find_one().unwrap().is_none());
        assert!(store.find_by_species(Species::Setosa).unwrap().is_empty());
    }

    #[test]
    fn aggregates_reference_species() {
        let store = populated();
        let counts = store.aggregate_counts().unwrap();
        assert_eq!(counts.total, 150);
        assert_eq!(counts.by_species.len(), 3);
        for species in Species::ALL {
            assert_eq!(counts.get(species), 50);
        }
    }

    #[test]
    fn filters_match_manual_scans() {
        let store = populated();
        let rows = reference_flowers();
        let long_petals = rows.iter().filter(|r| r.measurements.petal_length > 5.0).count();
        assert_eq!(store.find_petal_length_above(5.0).unwrap().len(), long_petals);

        let broad = rows
            .iter()
            .filter(|r| r.measurements.petal_length > 3.0 && r.measurements.petal_width > 1.0)
            .count();
        assert_eq!(store.find_petals_above(3.0, 1.0).unwrap().len(), broad);

        let short = rows.iter().filter(|r| r.measurements.sepal_length < 5.0).count();
        assert_eq!(store.find_sepal_length_below(5.0).unwrap().len(), short);

        let setosa = store.find_by_species(Species::Setosa).unwrap();
        assert_eq!(setosa.len(), 50);
        assert!(setosa.iter().all(|record| record.species == Species::Setosa));
    }

    #[test]
    fn documents_round_trip_in_insertion_order() {
        let store = populated();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 150);
        assert_eq!(all[0].id, "IR000");
        assert_eq!(all[149].id, "IR149");
        assert_eq!(all[0].row(), reference_flowers()[0]);
        assert_eq!(store.find_one().unwrap().map(|r| r.id), Some("IR000".to_string()));
        assert!(store.find_one_with_prediction().unwrap().is_none());
    }
}
