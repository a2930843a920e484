//! Main docsql crate.
//!
//! docsql lets an ORM built around relational statement trees run against MongoDB. A
//! statement (insert, update, delete or select) is walked by a translator that builds a
//! MongoDB command tree, the tree is rendered into a command document with the
//! statement's parameters bound, and an executor runs the document.
//!
//! This crate re-exports the pieces from the sub-crates and adds [`Session`], which
//! drives the whole round trip.
//!
//! # Quick Start
//!
//! ```ignore
//! use docsql::{prelude::*, memory::InMemoryExecutor};
//!
//! #[tokio::main]
//! async fn main() -> DocSqlResult<()> {
//!     let metadata = MappingMetadata::new().with_table(
//!         TableMapping::new("book", "books")
//!             .id_column("id")
//!             .column("title", "title")
//!             .column("publication_year", "year"),
//!     );
//!     let session = Session::new(InMemoryExecutor::new(), metadata, DefaultValueCodec);
//!
//!     let insert = InsertStatement::new(
//!         TableReference::new("book"),
//!         [ColumnReference::new("id"), ColumnReference::new("title"), ColumnReference::new("publication_year")],
//!     )
//!     .row(ValuesList::new([Expression::parameter(0), Expression::parameter(1), Expression::parameter(2)]));
//!
//!     session
//!         .execute(&insert.into(), &[DomainValue::Int64(1), "War and Peace".into(), 1867.into()])
//!         .await?;
//!
//!     let select = SelectStatement::new(TableReference::new("book"), [Expression::column("title")])
//!         .restriction(Predicate::comparison(
//!             Expression::column("publication_year"),
//!             ComparisonOperator::LessThan,
//!             Expression::parameter(0),
//!         ));
//!     let rows = session.query(&select.into(), &[1900.into()]).await?;
//!
//!     println!("{rows:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Executors
//!
//! - [`memory`] - in-memory executor for development and testing
//! - [`mongodb`] - MongoDB driver executor (requires the `mongodb` feature)

pub mod prelude;
pub mod session;

pub use docsql_core::{config, error, exchange, executor, metadata, sql, value, writer};
pub use docsql_mongodb::{ast, bind, translate};
pub use session::Session;

// Re-export BSON types for convenience
pub use bson;

/// In-memory executor implementations.
pub mod memory {
    pub use docsql_memory::{InMemoryExecutor, InMemoryExecutorBuilder};
}

/// MongoDB driver executor implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docsql_mongodb::{MongoDbExecutor, MongoDbExecutorBuilder};
}
