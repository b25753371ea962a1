//! SQLite-backed document store for flower records and predictions.
//!
//! Each collection is a table of JSON documents. Lookup indexes are
//! expression indexes over `json_extract` paths, so the queries in
//! [`read`] can use them directly.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, info};

/// JSON document shape of stored flowers.
pub mod document;
/// Read-only queries and aggregates.
pub mod read;
/// Collection and index management.
pub mod schema;
/// Destructive replace and prediction merges.
pub mod write;

mod util;

pub use document::FlowerRecord;
pub use read::SpeciesCounts;
pub use schema::{IndexInfo, PETAL_INDEX, SPECIES_INDEX};
pub use write::MergeReport;

/// Default database file name inside the app directory.
pub const DB_FILE_NAME: &str = "iris_database.sqlite";
/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "iris_flowers";

/// Errors returned by the flower store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened.
    #[error("Document store unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("No location for the document store: {0}")]
    Location(#[from] crate::app_dirs::AppDirError),
    #[error("Could not create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid collection name {0:?}")]
    InvalidCollection(String),
    #[error("Database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Database is busy, please retry")]
    Busy,
    #[error("Malformed document {id}: {source}")]
    Document {
        id: String,
        source: serde_json::Error,
    },
}

/// Where the store lives and which collection it uses.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub collection: String,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

/// Open handle on one collection; closed explicitly or on drop.
pub struct FlowerStore {
    connection: Connection,
    collection: String,
}

impl FlowerStore {
    /// Open (or create) the database file and the configured collection.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        util::validate_collection(&config.collection)?;
        util::create_parent_if_needed(&config.path)?;
        let connection = Connection::open(&config.path).map_err(|source| StoreError::Unavailable {
            path: config.path.clone(),
            source,
        })?;
        let store = Self::from_connection(connection, &config.collection)?;
        info!(
            path = %config.path.display(),
            collection = %config.collection,
            "Opened document store"
        );
        Ok(store)
    }

    /// Open a private in-memory database; used by tests and benchmarks.
    pub fn open_in_memory(collection: &str) -> Result<Self, StoreError> {
        util::validate_collection(collection)?;
        let connection = Connection::open_in_memory().map_err(|source| StoreError::Unavailable {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(connection, collection)
    }

    fn from_connection(connection: Connection, collection: &str) -> Result<Self, StoreError> {
        let store = Self {
            connection,
            collection: collection.to_string(),
        };
        store.apply_pragmas()?;
        schema::create_collection(&store.connection, &store.collection)?;
        Ok(store)
    }

    fn apply_pragmas(&self) -> Result<(), StoreError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
            )
            .map_err(util::map_sql_error)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Path of the backing file, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.connection
            .path()
            .filter(|path| !path.is_empty())
            .map(Path::new)
    }

    /// Release the connection.
    pub fn close(self) -> Result<(), StoreError> {
        debug!(collection = %self.collection, "Closing document store");
        self.connection
            .close()
            .map_err(|(_connection, err)| util::map_sql_error(err))
    }
}
