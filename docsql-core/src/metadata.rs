//! Read-only entity metadata lookups.
//!
//! The translator never inspects entity classes itself; it asks an [`EntityMetadata`]
//! which collection a table is stored in and which document field a column maps to.
//! Identifier columns always map onto [`ID_FIELD_NAME`].

use std::collections::HashMap;
use serde::Deserialize;

use crate::error::{DocSqlError, DocSqlResult};

/// Name of the document field holding the primary key.
pub const ID_FIELD_NAME: &str = "_id";

/// Table-to-collection and column-to-field lookups supplied by the host ORM.
pub trait EntityMetadata {
    /// Returns the collection a table is persisted in.
    fn collection_name(&self, table: &str) -> DocSqlResult<&str>;

    /// Returns the document field name of a column.
    fn field_name(&self, table: &str, column: &str) -> DocSqlResult<&str>;

    /// Returns `true` if the column is the table's identifier.
    fn is_identifier(&self, table: &str, column: &str) -> DocSqlResult<bool>;
}

impl<M: EntityMetadata + ?Sized> EntityMetadata for &M {
    fn collection_name(&self, table: &str) -> DocSqlResult<&str> {
        (*self).collection_name(table)
    }

    fn field_name(&self, table: &str, column: &str) -> DocSqlResult<&str> {
        (*self).field_name(table, column)
    }

    fn is_identifier(&self, table: &str, column: &str) -> DocSqlResult<bool> {
        (*self).is_identifier(table, column)
    }
}

/// Mapping of one table onto one collection.
///
/// # Example
///
/// ```ignore
/// use docsql_core::metadata::TableMapping;
///
/// let books = TableMapping::new("book", "books")
///     .id_column("id")
///     .column("title", "title")
///     .column("publication_year", "year");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableMapping {
    /// Table name as it appears in the relational statement.
    pub table: String,
    /// Collection the table's rows are stored in.
    pub collection: String,
    /// Identifier column, mapped onto `_id`.
    #[serde(default)]
    pub id_column: Option<String>,
    /// Column name to field name pairs.
    #[serde(default)]
    pub columns: HashMap<String, String>,
}

impl TableMapping {
    /// Creates a mapping with no columns.
    pub fn new(table: impl Into<String>, collection: impl Into<String>) -> Self {
        TableMapping {
            table: table.into(),
            collection: collection.into(),
            id_column: None,
            columns: HashMap::new(),
        }
    }

    /// Declares the identifier column.
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Maps a column onto a document field.
    pub fn column(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.columns.insert(column.into(), field.into());
        self
    }
}

/// [`EntityMetadata`] backed by a set of [`TableMapping`]s.
#[derive(Debug, Clone, Default)]
pub struct MappingMetadata {
    tables: HashMap<String, TableMapping>,
}

impl MappingMetadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table mapping, replacing an earlier mapping of the same table.
    pub fn with_table(mut self, mapping: TableMapping) -> Self {
        self.tables.insert(mapping.table.clone(), mapping);
        self
    }

    fn table(&self, table: &str) -> DocSqlResult<&TableMapping> {
        self.tables
            .get(table)
            .ok_or_else(|| DocSqlError::Metadata(format!("table {table} is not mapped")))
    }
}

impl FromIterator<TableMapping> for MappingMetadata {
    fn from_iter<I: IntoIterator<Item = TableMapping>>(iter: I) -> Self {
        iter.into_iter()
            .fold(MappingMetadata::new(), MappingMetadata::with_table)
    }
}

impl EntityMetadata for MappingMetadata {
    fn collection_name(&self, table: &str) -> DocSqlResult<&str> {
        Ok(self.table(table)?.collection.as_str())
    }

    fn field_name(&self, table: &str, column: &str) -> DocSqlResult<&str> {
        let mapping = self.table(table)?;

        if mapping.id_column.as_deref() == Some(column) {
            return Ok(ID_FIELD_NAME);
        }

        mapping
            .columns
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| DocSqlError::Metadata(format!("column {column} of table {table} is not mapped")))
    }

    fn is_identifier(&self, table: &str, column: &str) -> DocSqlResult<bool> {
        Ok(self.table(table)?.id_column.as_deref() == Some(column))
    }
}
