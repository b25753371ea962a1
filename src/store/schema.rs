use rusqlite::{Connection, params};

use super::StoreError;
use super::util::map_sql_error;

/// Single-field index on the species label.
pub const SPECIES_INDEX: &str = "idx_species";
/// Composite index on petal length then petal width.
pub const PETAL_INDEX: &str = "idx_petal_features";

/// JSON paths indexed by each named index, in key order.
const INDEXES: [(&str, &[&str]); 2] = [
    (SPECIES_INDEX, &["$.species"]),
    (PETAL_INDEX, &["$.features.petal_length", "$.features.petal_width"]),
];

/// A declared lookup index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    /// Indexed JSON paths, ascending.
    pub keys: Vec<String>,
}

/// SQLite index names are database-wide, so they carry the collection name.
fn qualified_index(collection: &str, name: &str) -> String {
    format!("{collection}__{name}")
}

pub(super) fn create_collection(connection: &Connection, collection: &str) -> Result<(), StoreError> {
    connection
        .execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{collection}\" (
                seq INTEGER PRIMARY KEY,
                doc TEXT NOT NULL CHECK (json_valid(doc))
            );"
        ))
        .map_err(map_sql_error)
}

pub(super) fn drop_collection(connection: &Connection, collection: &str) -> Result<(), StoreError> {
    connection
        .execute_batch(&format!("DROP TABLE IF EXISTS \"{collection}\";"))
        .map_err(map_sql_error)
}

impl super::FlowerStore {
    /// Declare the species and petal indexes; existing names are kept as is.
    pub fn ensure_indexes(&self) -> Result<(), StoreError> {
        for (name, paths) in INDEXES {
            let columns = paths
                .iter()
                .map(|path| format!("json_extract(doc, '{path}')"))
                .collect::<Vec<_>>()
                .join(", ");
            self.connection
                .execute_batch(&format!(
                    "CREATE INDEX IF NOT EXISTS \"{}\" ON \"{}\" ({columns});",
                    qualified_index(&self.collection, name),
                    self.collection
                ))
                .map_err(map_sql_error)?;
        }
        tracing::info!(collection = %self.collection, "Ensured lookup indexes");
        Ok(())
    }

    /// Remove the lookup indexes, keeping the documents.
    pub fn drop_indexes(&self) -> Result<(), StoreError> {
        for (name, _) in INDEXES {
            self.connection
                .execute_batch(&format!(
                    "DROP INDEX IF EXISTS \"{}\";",
                    qualified_index(&self.collection, name)
                ))
                .map_err(map_sql_error)?;
        }
        Ok(())
    }

    /// Indexes currently declared on the collection, by name.
    pub fn list_indexes(&self) -> Result<Vec<IndexInfo>, StoreError> {
        let prefix = qualified_index(&self.collection, "");
        let mut stmt = self
            .connection
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL
                 ORDER BY name",
            )
            .map_err(map_sql_error)?;
        let names = stmt
            .query_map(params![self.collection], |row| row.get::<_, String>(0))
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(names
            .into_iter()
            .map(|full| {
                let name = full.strip_prefix(&prefix).unwrap_or(full.as_str()).to_string();
                let keys = INDEXES
                    .iter()
                    .find(|(known, _)| *known == name)
                    .map(|(_, paths)| paths.iter().map(|path| path.to_string()).collect())
                    .unwrap_or_default();
                IndexInfo { name, keys }
            })
            .collect())
    }
}
