//! Configuration for a docsql deployment.
//!
//! ```ignore
//! use docsql_core::config::DocSqlConfig;
//!
//! let config = DocSqlConfig::from_json_str(r#"{
//!     "connection_string": "mongodb://localhost:27017",
//!     "database": "library",
//!     "tables": [
//!         { "table": "book", "collection": "books", "id_column": "id",
//!           "columns": { "title": "title", "publication_year": "year" } }
//!     ]
//! }"#)?;
//! let metadata = config.metadata();
//! ```

use std::collections::HashSet;
use serde::Deserialize;

use crate::{
    error::{DocSqlError, DocSqlResult},
    metadata::{MappingMetadata, TableMapping},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocSqlConfig {
    /// Driver connection string, e.g. `mongodb://localhost:27017`.
    pub connection_string: String,
    /// Database holding the mapped collections.
    pub database: String,
    /// Table to collection mappings.
    #[serde(default)]
    pub tables: Vec<TableMapping>,
}

impl DocSqlConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> DocSqlResult<Self> {
        let config: DocSqlConfig = serde_json::from_str(json)
            .map_err(|e| DocSqlError::Configuration(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Checks that names are present and tables are mapped only once.
    pub fn validate(&self) -> DocSqlResult<()> {
        if self.connection_string.trim().is_empty() {
            return Err(DocSqlError::Configuration("connection string is empty".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(DocSqlError::Configuration("database name is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for mapping in &self.tables {
            if !seen.insert(mapping.table.as_str()) {
                return Err(DocSqlError::Configuration(format!("table {} is mapped twice", mapping.table)));
            }
            if mapping.collection.trim().is_empty() {
                return Err(DocSqlError::Configuration(format!("table {} has an empty collection name", mapping.table)));
            }
            if let Some((column, _)) = mapping.columns.iter().find(|(_, field)| field.trim().is_empty()) {
                return Err(DocSqlError::Configuration(format!(
                    "column {column} of table {} maps to an empty field name",
                    mapping.table,
                )));
            }
        }

        Ok(())
    }

    /// Builds entity metadata from the table mappings.
    pub fn metadata(&self) -> MappingMetadata {
        self.tables.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntityMetadata;

    const CONFIG: &str = r#"{
        "connection_string": "mongodb://localhost:27017",
        "database": "library",
        "tables": [
            { "table": "book", "collection": "books", "id_column": "id",
              "columns": { "title": "title", "publication_year": "year" } }
        ]
    }"#;

    #[test]
    fn loads_tables_into_metadata() {
        let config = DocSqlConfig::from_json_str(CONFIG).unwrap();
        let metadata = config.metadata();

        assert_eq!(config.database, "library");
        assert_eq!(metadata.collection_name("book").unwrap(), "books");
        assert_eq!(metadata.field_name("book", "publication_year").unwrap(), "year");
    }

    #[test]
    fn rejects_empty_database() {
        let err = DocSqlConfig::from_json_str(r#"{ "connection_string": "mongodb://h", "database": " " }"#).unwrap_err();

        assert!(matches!(err, DocSqlError::Configuration(_)));
    }

    #[test]
    fn rejects_duplicate_tables() {
        let err = DocSqlConfig::from_json_str(r#"{
            "connection_string": "mongodb://h",
            "database": "library",
            "tables": [
                { "table": "book", "collection": "books" },
                { "table": "book", "collection": "novels" }
            ]
        }"#)
        .unwrap_err();

        assert!(matches!(err, DocSqlError::Configuration(_)));
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        assert!(matches!(DocSqlConfig::from_json_str("{"), Err(DocSqlError::Configuration(_))));
    }
}
