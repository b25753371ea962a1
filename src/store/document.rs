use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::dataset::{FlowerRow, Measurements, Species};
use crate::ml::export::{PredictionRecord, flower_id};

/// Persisted shape of one flower.
///
/// Prediction fields are absent until a merge attaches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowerRecord {
    pub id: String,
    pub features: Measurements,
    pub species: Species,
    #[serde(with = "rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Species>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl FlowerRecord {
    pub fn new(id: impl Into<String>, row: &FlowerRow, created_at: OffsetDateTime) -> Self {
        Self {
            id: id.into(),
            features: row.measurements,
            species: row.species,
            created_at,
            prediction: None,
            confidence: None,
            model: None,
        }
    }

    /// Records for `rows` with identifiers assigned by row position.
    pub fn from_rows(rows: &[FlowerRow], created_at: OffsetDateTime) -> Vec<Self> {
        rows.iter()
            .enumerate()
            .map(|(idx, row)| Self::new(flower_id(idx), row, created_at))
            .collect()
    }

    pub fn row(&self) -> FlowerRow {
        FlowerRow {
            measurements: self.features,
            species: self.species,
        }
    }

    /// The attached prediction, when all three fields are present.
    pub fn prediction_record(&self) -> Option<PredictionRecord> {
        Some(PredictionRecord {
            id: self.id.clone(),
            prediction: self.prediction?,
            confidence: self.confidence?,
            model: self.model.clone()?,
        })
    }
}

mod rfc3339 {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = value.format(&Rfc3339).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&text, &Rfc3339).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn serializes_to_the_documented_shape() {
        let row = FlowerRow::new([5.1, 3.5, 1.4, 0.2], Species::Setosa);
        let record = FlowerRecord::new("IR000", &row, datetime!(2024-03-01 12:00 UTC));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "IR000");
        assert_eq!(value["species"], "setosa");
        assert_eq!(value["features"]["petal_length"], 1.4);
        assert_eq!(value["created_at"], "2024-03-01T12:00:00Z");
        assert!(value.get("prediction").is_none());
        assert!(value.get("model").is_none());
    }

    #[test]
    fn prediction_record_needs_every_field() {
        let row = FlowerRow::new([6.3, 3.3, 6.0, 2.5], Species::Virginica);
        let mut record = FlowerRecord::new("IR100", &row, datetime!(2024-03-01 12:00 UTC));
        assert!(record.prediction_record().is_none());
        record.prediction = Some(Species::Virginica);
        record.confidence = Some(0.97);
        assert!(record.prediction_record().is_none());
        record.model = Some("SVM".to_string());
        let prediction = record.prediction_record().unwrap();
        assert_eq!(prediction.id, "IR100");
        assert_eq!(prediction.model, "SVM");
    }

    #[test]
    fn ids_follow_row_order() {
        let rows = [
            FlowerRow::new([5.1, 3.5, 1.4, 0.2], Species::Setosa),
            FlowerRow::new([7.0, 3.2, 4.7, 1.4], Species::Versicolor),
        ];
        let records = FlowerRecord::from_rows(&rows, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(records[1].id, "IR001");
        assert_eq!(records[1].row(), rows[1]);
    }
}
