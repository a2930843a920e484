//! Convenient re-exports of commonly used types from docsql.
//!
//! ```ignore
//! use docsql::prelude::*;
//! ```

pub use docsql_core::{
    config::DocSqlConfig,
    error::{DocSqlError, DocSqlResult},
    executor::{CommandExecutor, CommandResult, ExecutorBuilder},
    metadata::{EntityMetadata, MappingMetadata, TableMapping},
    sql::{
        Assignment, ColumnReference, ComparisonOperator, DeleteStatement, Expression, InsertStatement, Predicate,
        SelectStatement, SortOrder, SqlAstWalker, Statement, TableReference, UpdateStatement, ValuesList,
    },
    value::{DefaultValueCodec, DomainValue, ValueCodec},
    writer::DocumentWriter,
};
pub use docsql_mongodb::{Command, MongoTranslator};

pub use crate::session::Session;
