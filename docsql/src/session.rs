//! Statement execution through a translator and an executor.
//!
//! A [`Session`] ties together the three pieces a host ORM provides or chooses: entity
//! metadata, a value codec and a [`CommandExecutor`]. Every call translates the
//! statement with a fresh [`MongoTranslator`], binds the parameter values and hands the
//! finished command document to the executor.

use bson::Document;
use tracing::{debug, trace};

use docsql_core::{
    config::DocSqlConfig,
    error::DocSqlResult,
    executor::{CommandExecutor, CommandResult},
    metadata::{EntityMetadata, MappingMetadata},
    sql::Statement,
    value::{DefaultValueCodec, DomainValue, ValueCodec},
};
use docsql_mongodb::{Command, MongoTranslator};

/// Translates and runs relational statements against one executor.
///
/// # Example
///
/// ```ignore
/// use docsql::{prelude::*, memory::InMemoryExecutor};
///
/// let session = Session::new(InMemoryExecutor::new(), metadata, DefaultValueCodec);
/// let deleted = session
///     .execute(&statement, &[DomainValue::Int64(12345)])
///     .await?
///     .affected()?;
/// ```
#[derive(Debug)]
pub struct Session<E, M, C = DefaultValueCodec> {
    executor: E,
    metadata: M,
    codec: C,
}

impl<E: CommandExecutor> Session<E, MappingMetadata, DefaultValueCodec> {
    /// Builds a session whose metadata comes from the configured table mappings.
    pub fn from_config(executor: E, config: &DocSqlConfig) -> DocSqlResult<Self> {
        config.validate()?;

        Ok(Session::new(executor, config.metadata(), DefaultValueCodec))
    }
}

impl<E, M, C> Session<E, M, C>
where
    E: CommandExecutor,
    M: EntityMetadata,
    C: ValueCodec,
{
    pub fn new(executor: E, metadata: M, codec: C) -> Self {
        Session { executor, metadata, codec }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Translates a statement without binding or running it.
    pub fn translate(&self, statement: &Statement) -> DocSqlResult<Command> {
        MongoTranslator::new(&self.metadata, &self.codec).translate(statement)
    }

    /// Translates a statement and binds `parameters` by position.
    pub fn render(&self, statement: &Statement, parameters: &[DomainValue]) -> DocSqlResult<Document> {
        let command = self.translate(statement)?;
        let values = parameters
            .iter()
            .map(|value| self.codec.to_wire(value))
            .collect::<DocSqlResult<Vec<_>>>()?;

        command.to_bound_document(&values)
    }

    /// Translates, binds and executes a statement.
    pub async fn execute(&self, statement: &Statement, parameters: &[DomainValue]) -> DocSqlResult<CommandResult> {
        let document = self.render(statement, parameters)?;

        debug!(table = %statement.target().table, parameters = parameters.len(), "executing statement");
        trace!(command = %document, "executing bound command");

        let result = self.executor.execute(document).await?;

        match &result {
            CommandResult::Affected(count) => trace!(affected = count, "statement finished"),
            CommandResult::Rows(rows) => trace!(rows = rows.len(), "statement finished"),
        }

        Ok(result)
    }

    /// Executes a query and returns the raw result documents.
    pub async fn query(&self, statement: &Statement, parameters: &[DomainValue]) -> DocSqlResult<Vec<Document>> {
        self.execute(statement, parameters).await?.into_rows()
    }

    /// Converts a result document into domain values, keeping field order.
    pub fn decode(&self, row: &Document) -> DocSqlResult<Vec<(String, DomainValue)>> {
        row.iter()
            .map(|(field, value)| -> DocSqlResult<(String, DomainValue)> {
                Ok((field.clone(), self.codec.from_wire(value)?))
            })
            .collect()
    }

    /// Shuts down the underlying executor.
    pub async fn shutdown(self) -> DocSqlResult<()> {
        self.executor.shutdown().await
    }
}
