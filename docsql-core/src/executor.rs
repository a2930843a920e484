//! Command execution abstraction.
//!
//! Translation ends with a rendered command document. Sending that document to a
//! database and reading the answer back is the job of a [`CommandExecutor`].
//! Implementations are required to be thread-safe (`Send + Sync`) and are created
//! through an [`ExecutorBuilder`].
//!
//! # Examples
//!
//! ```ignore
//! use docsql_core::executor::{CommandExecutor, CommandResult};
//! use bson::doc;
//!
//! let result = executor
//!     .execute(doc! { "delete": "books", "deletes": [{ "q": {}, "limit": 0 }] })
//!     .await?;
//! assert!(matches!(result, CommandResult::Affected(_)));
//! ```

use async_trait::async_trait;
use bson::Document;
use std::fmt::Debug;

use crate::error::{DocSqlError, DocSqlResult};

/// Outcome of executing one command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Number of documents inserted, matched for update, or deleted.
    Affected(u64),
    /// Documents produced by an aggregation, in pipeline order.
    Rows(Vec<Document>),
}

impl CommandResult {
    /// Returns the affected count, or an error if the command produced rows.
    pub fn affected(&self) -> DocSqlResult<u64> {
        match self {
            CommandResult::Affected(count) => Ok(*count),
            CommandResult::Rows(_) => Err(DocSqlError::Backend("command produced rows, not a count".to_string())),
        }
    }

    /// Returns the produced rows, or an error if the command was a mutation.
    pub fn into_rows(self) -> DocSqlResult<Vec<Document>> {
        match self {
            CommandResult::Rows(rows) => Ok(rows),
            CommandResult::Affected(_) => Err(DocSqlError::Backend("command produced a count, not rows".to_string())),
        }
    }
}

/// Abstract interface for the layer that runs rendered commands.
///
/// Commands arrive fully bound: parameter markers have already been replaced by values.
/// Retries, timeouts and connection management belong to the implementation.
#[async_trait]
pub trait CommandExecutor: Send + Sync + Debug {
    /// Executes one `insert`, `update`, `delete` or `aggregate` command document.
    ///
    /// # Returns
    ///
    /// [`CommandResult::Affected`] for mutations, [`CommandResult::Rows`] for aggregations,
    /// or a [`DocSqlError`] on failure.
    async fn execute(&self, command: Document) -> DocSqlResult<CommandResult>;

    /// Cleanly shuts down the executor, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocSqlResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<E> CommandExecutor for &E
where
    E: CommandExecutor,
{
    async fn execute(&self, command: Document) -> DocSqlResult<CommandResult> {
        (*self).execute(command).await
    }
}

/// Factory trait for creating executor instances.
#[async_trait]
pub trait ExecutorBuilder: Send {
    /// The executor type this builder produces.
    type Executor: CommandExecutor;

    /// Builds the executor, connecting to the backend if necessary.
    async fn build(self) -> DocSqlResult<Self::Executor>;
}

/// Reads a required string field of a command document.
pub fn command_str<'a>(command: &'a Document, key: &str) -> DocSqlResult<&'a str> {
    command
        .get_str(key)
        .map_err(|_| DocSqlError::Backend(format!("command is missing string field {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn result_accessors_check_the_shape() {
        assert_eq!(CommandResult::Affected(3).affected().unwrap(), 3);
        assert!(CommandResult::Affected(3).into_rows().is_err());

        let rows = CommandResult::Rows(vec![doc! { "_id": 1 }]);
        assert!(rows.affected().is_err());
        assert_eq!(rows.into_rows().unwrap(), vec![doc! { "_id": 1 }]);
    }

    #[test]
    fn command_str_reports_missing_fields() {
        let command = doc! { "insert": "books" };

        assert_eq!(command_str(&command, "insert").unwrap(), "books");
        assert!(matches!(command_str(&command, "delete"), Err(DocSqlError::Backend(_))));
    }
}
