use std::path::Path;

use super::StoreError;

const MAX_COLLECTION_LEN: usize = 64;

/// Translate rusqlite errors into friendlier StoreError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.extended_code == rusqlite::ffi::SQLITE_BUSY =>
        {
            StoreError::Busy
        }
        other => StoreError::Sql(other),
    }
}

/// Collection names become table names, so only plain identifiers are allowed.
pub(super) fn validate_collection(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_start && valid_rest && name.len() <= MAX_COLLECTION_LEN && !name.starts_with("sqlite_") {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_are_identifiers() {
        assert!(validate_collection("iris_flowers").is_ok());
        assert!(validate_collection("_scratch2").is_ok());
        assert!(validate_collection("").is_err());
        assert!(validate_collection("2fast").is_err());
        assert!(validate_collection("iris-flowers").is_err());
        assert!(validate_collection("sqlite_master").is_err());
        assert!(validate_collection(&"a".repeat(65)).is_err());
    }
}
