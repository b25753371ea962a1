//! Load flower rows from a named source, falling back to the reference data.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::FlowerRow;
use super::csv::{CsvError, parse_flowers};
use super::reference::reference_flowers;
use crate::http_client;

/// Upper bound on a downloaded CSV body.
const MAX_REMOTE_BYTES: usize = 4 * 1024 * 1024;

/// Where flower rows should come from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataSource {
    /// Use the built-in reference dataset.
    #[default]
    Auto,
    /// Same as `Auto`, named explicitly.
    Reference,
    /// A local CSV file in UCI or Kaggle layout.
    Csv(PathBuf),
    /// A CSV document fetched over HTTP(S).
    Remote(Url),
}

/// Error returned when a data source string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid data source {value:?}: {reason}")]
pub struct InvalidDataSource {
    pub value: String,
    pub reason: String,
}

impl FromStr for DataSource {
    type Err = InvalidDataSource;

    /// Accepts `auto`, `reference`, `csv:<path>`, `url:<url>`, a bare
    /// `http(s)://` URL, or a bare path ending in `.csv`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = |reason: &str| InvalidDataSource {
            value: value.to_string(),
            reason: reason.to_string(),
        };
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "auto" => return Ok(DataSource::Auto),
            "reference" | "sklearn" => return Ok(DataSource::Reference),
            _ => {}
        }
        if let Some(path) = trimmed.strip_prefix("csv:") {
            if path.is_empty() {
                return Err(invalid("missing CSV path"));
            }
            return Ok(DataSource::Csv(PathBuf::from(path)));
        }
        let url_text = trimmed.strip_prefix("url:").unwrap_or(trimmed);
        if url_text.starts_with("http://") || url_text.starts_with("https://") {
            let url = Url::parse(url_text).map_err(|err| invalid(&err.to_string()))?;
            return Ok(DataSource::Remote(url));
        }
        if trimmed.starts_with("url:") {
            return Err(invalid("only http and https URLs are supported"));
        }
        if Path::new(trimmed)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            return Ok(DataSource::Csv(PathBuf::from(trimmed)));
        }
        Err(invalid("expected auto, reference, csv:<path> or url:<url>"))
    }
}

impl TryFrom<String> for DataSource {
    type Error = InvalidDataSource;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataSource> for String {
    fn from(source: DataSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Auto => f.write_str("auto"),
            DataSource::Reference => f.write_str("reference"),
            DataSource::Csv(path) => write!(f, "csv:{}", path.display()),
            DataSource::Remote(url) => write!(f, "url:{url}"),
        }
    }
}

/// Errors raised by a preferred source before falling back.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to download {url}: {source}")]
    Fetch {
        url: String,
        source: http_client::FetchError,
    },
    #[error("Invalid CSV from {origin}: {source}")]
    Parse { origin: String, source: CsvError },
}

/// Which source actually produced the rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    Reference,
    Csv(PathBuf),
    Remote(String),
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::Reference => f.write_str("built-in reference dataset"),
            DataOrigin::Csv(path) => write!(f, "CSV file {}", path.display()),
            DataOrigin::Remote(url) => write!(f, "remote CSV {url}"),
        }
    }
}

/// Rows produced by [`load_flowers`] together with their provenance.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub rows: Vec<FlowerRow>,
    pub origin: DataOrigin,
    /// Set when the requested source failed and the reference data was used.
    pub fallback_reason: Option<String>,
}

/// Load flowers from `source`, falling back to the reference dataset.
///
/// Never fails: every error from a preferred source is logged and replaced
/// by the built-in data.
pub fn load_flowers(source: &DataSource) -> LoadedDataset {
    info!(%source, "Loading Iris data");
    let attempt = match source {
        DataSource::Auto | DataSource::Reference => None,
        DataSource::Csv(path) => Some(load_csv(path).map(|rows| (rows, DataOrigin::Csv(path.clone())))),
        DataSource::Remote(url) => {
            Some(load_remote(url).map(|rows| (rows, DataOrigin::Remote(url.to_string()))))
        }
    };
    match attempt {
        None => LoadedDataset {
            rows: reference_flowers(),
            origin: DataOrigin::Reference,
            fallback_reason: None,
        },
        Some(Ok((rows, origin))) => {
            info!(rows = rows.len(), %origin, "Loaded Iris data");
            LoadedDataset {
                rows,
                origin,
                fallback_reason: None,
            }
        }
        Some(Err(err)) => {
            warn!(%source, error = %err, "Source unavailable, using reference data");
            LoadedDataset {
                rows: reference_flowers(),
                origin: DataOrigin::Reference,
                fallback_reason: Some(err.to_string()),
            }
        }
    }
}

/// Parse rows from a local CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<FlowerRow>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_flowers(&text).map_err(|source| LoadError::Parse {
        origin: path.display().to_string(),
        source,
    })
}

/// Fetch and parse rows from an HTTP(S) URL.
pub fn load_remote(url: &Url) -> Result<Vec<FlowerRow>, LoadError> {
    let text = http_client::fetch_text(url, MAX_REMOTE_BYTES).map_err(|source| LoadError::Fetch {
        url: url.to_string(),
        source,
    })?;
    parse_flowers(&text).map_err(|source| LoadError::Parse {
        origin: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Species;
    use crate::http_client::test_server::serve_once;
    use tempfile::tempdir;

    #[test]
    fn parses_source_strings() {
        assert_eq!("auto".parse::<DataSource>().unwrap(), DataSource::Auto);
        assert_eq!("Reference".parse::<DataSource>().unwrap(), DataSource::Reference);
        assert_eq!(
            "csv:data/iris.csv".parse::<DataSource>().unwrap(),
            DataSource::Csv(PathBuf::from("data/iris.csv"))
        );
        assert_eq!(
            "iris.CSV".parse::<DataSource>().unwrap(),
            DataSource::Csv(PathBuf::from("iris.CSV"))
        );
        assert!(matches!(
            "https://example.org/iris.data".parse::<DataSource>().unwrap(),
            DataSource::Remote(_)
        ));
        assert!("url:ftp://example.org/iris".parse::<DataSource>().is_err());
        assert!("kaggle".parse::<DataSource>().is_err());
    }

    #[test]
    fn source_display_parses_back() {
        let source = DataSource::Csv(PathBuf::from("a/b.csv"));
        assert_eq!(source.to_string().parse::<DataSource>().unwrap(), source);
    }

    #[test]
    fn auto_uses_reference_data() {
        let loaded = load_flowers(&DataSource::Auto);
        assert_eq!(loaded.rows.len(), 150);
        assert_eq!(loaded.origin, DataOrigin::Reference);
        assert!(loaded.fallback_reason.is_none());
    }

    #[test]
    fn missing_csv_falls_back_to_reference() {
        let dir = tempdir().unwrap();
        let loaded = load_flowers(&DataSource::Csv(dir.path().join("missing.csv")));
        assert_eq!(loaded.rows.len(), 150);
        assert_eq!(loaded.origin, DataOrigin::Reference);
        assert!(loaded.fallback_reason.is_some());
    }

    #[test]
    fn local_csv_is_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("iris.csv");
        std::fs::write(&path, "5.1,3.5,1.4,0.2,Iris-setosa\n6.3,3.3,6.0,2.5,Iris-virginica\n")
            .unwrap();
        let loaded = load_flowers(&DataSource::Csv(path.clone()));
        assert_eq!(loaded.origin, DataOrigin::Csv(path));
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[1].species, Species::Virginica);
    }

    #[test]
    fn remote_csv_is_loaded() {
        let body = "5.1,3.5,1.4,0.2,Iris-setosa\n7.0,3.2,4.7,1.4,Iris-versicolor\n";
        let url = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ));
        let url = Url::parse(&format!("{url}/iris.data")).unwrap();
        let loaded = load_flowers(&DataSource::Remote(url));
        assert!(matches!(loaded.origin, DataOrigin::Remote(_)));
        assert_eq!(loaded.rows.len(), 2);
    }

    #[test]
    fn unreachable_remote_falls_back_to_reference() {
        let url = serve_once("HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n".into());
        let url = Url::parse(&url).unwrap();
        let loaded = load_flowers(&DataSource::Remote(url));
        assert_eq!(loaded.origin, DataOrigin::Reference);
        assert_eq!(loaded.rows.len(), 150);
        assert!(loaded.fallback_reason.is_some());
    }
}
