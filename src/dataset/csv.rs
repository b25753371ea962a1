//! Minimal parser for the Iris CSV layouts in circulation.
//!
//! Accepted shapes:
//! - UCI: no header, `5.1,3.5,1.4,0.2,Iris-setosa`.
//! - Kaggle: header row and a leading `Id` column.
//! - Headered five-column files such as the bundled reference data.

use super::{FlowerRow, Measurements, N_FEATURES, Species};

/// Errors raised while parsing Iris CSV text.
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("Line {line}: expected 5 or 6 columns, found {found}")]
    ColumnCount { line: usize, found: usize },
    #[error("Line {line}: invalid measurement {value:?}")]
    Measurement { line: usize, value: String },
    #[error("Line {line}: measurement must be positive, got {value}")]
    NonPositive { line: usize, value: f64 },
    #[error("Line {line}: {source}")]
    Species {
        line: usize,
        source: super::UnknownSpecies,
    },
    #[error("No data rows found")]
    Empty,
}

/// Parse CSV text into flower rows.
pub fn parse_flowers(text: &str) -> Result<Vec<FlowerRow>, CsvError> {
    let mut rows = Vec::new();
    let mut first = true;
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if std::mem::take(&mut first) && is_header(&fields) {
            continue;
        }
        let fields = match fields.len() {
            5 => &fields[..],
            6 => &fields[1..],
            found => return Err(CsvError::ColumnCount { line, found }),
        };
        let mut values = [0.0f64; N_FEATURES];
        for (slot, field) in values.iter_mut().zip(fields.iter()) {
            let value = field
                .trim_matches('"')
                .parse::<f64>()
                .map_err(|_| CsvError::Measurement {
                    line,
                    value: field.to_string(),
                })?;
            if !value.is_finite() || value <= 0.0 {
                return Err(CsvError::NonPositive { line, value });
            }
            *slot = value;
        }
        let species = fields[N_FEATURES]
            .parse::<Species>()
            .map_err(|source| CsvError::Species { line, source })?;
        rows.push(FlowerRow {
            measurements: Measurements::from_features(&values),
            species,
        });
    }
    if rows.is_empty() {
        return Err(CsvError::Empty);
    }
    Ok(rows)
}

/// Only the first record may be a header; it never has a numeric second column.
fn is_header(fields: &[&str]) -> bool {
    fields
        .get(1)
        .map(|field| field.trim_matches('"').parse::<f64>().is_err())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uci_layout() {
        let rows = parse_flowers("5.1,3.5,1.4,0.2,Iris-setosa\n7.0,3.2,4.7,1.4,Iris-versicolor\n\n")
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].species, Species::Setosa);
        assert_eq!(rows[1].measurements.petal_length, 4.7);
    }

    #[test]
    fn parses_kaggle_layout_with_id_column() {
        let text = "Id,SepalLengthCm,SepalWidthCm,PetalLengthCm,PetalWidthCm,Species\n\
                    1,5.1,3.5,1.4,0.2,Iris-setosa\n\
                    150,5.9,3.0,5.1,1.8,Iris-virginica\n";
        let rows = parse_flowers(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].species, Species::Virginica);
        assert_eq!(rows[1].measurements.sepal_length, 5.9);
    }

    #[test]
    fn rejects_bad_rows() {
        assert!(matches!(
            parse_flowers("5.1,3.5,1.4,Iris-setosa"),
            Err(CsvError::ColumnCount { line: 1, found: 4 })
        ));
        assert!(matches!(
            parse_flowers("5.1,3.5,-1.4,0.2,setosa"),
            Err(CsvError::NonPositive { line: 1, .. })
        ));
        assert!(matches!(
            parse_flowers("5.1,3.5,1.4,0.2,rose"),
            Err(CsvError::Species { line: 1, .. })
        ));
        assert!(matches!(parse_flowers("a,b,c,d,e\n"), Err(CsvError::Empty)));
    }

    #[test]
    fn typo_after_first_line_is_not_a_header() {
        let text = "5.1,3.5,1.4,0.2,Iris-setosa\n\
                    4.9,3.O,1.4,0.2,Iris-setosa\n\
                    4.7,3.2,1.3,0.2,Iris-setosa\n";
        match parse_flowers(text) {
            Err(CsvError::Measurement { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "3.O");
            }
            other => panic!("expected a measurement error, got {other:?}"),
        }
    }

    #[test]
    fn header_after_comments_is_skipped() {
        let text = "# iris sample\nsepal_length,sepal_width,petal_length,petal_width,species\n\
                    5.1,3.5,1.4,0.2,setosa\n";
        assert_eq!(parse_flowers(text).unwrap().len(), 1);
    }
}
