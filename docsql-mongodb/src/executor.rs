use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{Client, Database, options::ClientOptions};
use tracing::{debug, warn};

use docsql_core::{
    config::DocSqlConfig,
    error::{DocSqlError, DocSqlResult},
    executor::{CommandExecutor, CommandResult, ExecutorBuilder, command_str},
};

/// Runs rendered commands against a MongoDB deployment through the official driver.
#[derive(Debug)]
pub struct MongoDbExecutor {
    client: Client,
    database: String,
}

impl MongoDbExecutor {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbExecutorBuilder {
        MongoDbExecutorBuilder::new(dsn, database)
    }

    fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    async fn run_write(&self, name: &str, command: Document) -> DocSqlResult<CommandResult> {
        let reply = self
            .database()
            .run_command(command)
            .await
            .map_err(|e| DocSqlError::Backend(e.to_string()))?;

        if let Ok(errors) = reply.get_array("writeErrors") {
            if let Some(first) = errors.first().and_then(Bson::as_document) {
                let message = first.get_str("errmsg").unwrap_or("unknown write error");
                warn!(command = name, errors = errors.len(), "write command reported errors: {message}");

                return Err(DocSqlError::Backend(format!("{name} failed: {message}")));
            }
        }

        Ok(CommandResult::Affected(reply_count(&reply)?))
    }

    async fn run_aggregate(&self, mut command: Document) -> DocSqlResult<CommandResult> {
        if !command.contains_key("cursor") {
            command.insert("cursor", doc! {});
        }

        let rows = self
            .database()
            .run_cursor_command(command)
            .await
            .map_err(|e| DocSqlError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocSqlError::Backend(e.to_string()))?;

        Ok(CommandResult::Rows(rows))
    }
}

/// Reads the `n` field of a write command reply.
fn reply_count(reply: &Document) -> DocSqlResult<u64> {
    match reply.get("n") {
        Some(Bson::Int32(n)) => Ok(u64::try_from(*n).unwrap_or_default()),
        Some(Bson::Int64(n)) => Ok(u64::try_from(*n).unwrap_or_default()),
        Some(Bson::Double(n)) if *n >= 0.0 => Ok(*n as u64),
        _ => Err(DocSqlError::Backend("write command reply carries no document count".to_string())),
    }
}

#[async_trait]
impl CommandExecutor for MongoDbExecutor {
    async fn execute(&self, command: Document) -> DocSqlResult<CommandResult> {
        let name = command
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| DocSqlError::Backend("empty command document".to_string()))?;
        let collection = command_str(&command, &name)?.to_owned();

        debug!(command = %name, collection = %collection, database = %self.database, "running command");

        match name.as_str() {
            "insert" | "update" | "delete" => self.run_write(&name, command).await,
            "aggregate" => self.run_aggregate(command).await,
            other => Err(DocSqlError::Backend(format!("unsupported command {other}"))),
        }
    }

    async fn shutdown(self) -> DocSqlResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbExecutorBuilder {
    dsn: String,
    database: String,
}

impl MongoDbExecutorBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }

    /// Takes the connection string and database from a validated configuration.
    pub fn from_config(config: &DocSqlConfig) -> DocSqlResult<Self> {
        config.validate()?;

        Ok(Self::new(&config.connection_string, &config.database))
    }
}

#[async_trait]
impl ExecutorBuilder for MongoDbExecutorBuilder {
    type Executor = MongoDbExecutor;

    async fn build(self) -> DocSqlResult<Self::Executor> {
        Ok(MongoDbExecutor::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocSqlError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocSqlError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(doc! { "n": 3, "ok": 1.0 }, 3 ; "int32 count")]
    #[test_case(doc! { "n": 4_i64, "ok": 1.0 }, 4 ; "int64 count")]
    #[test_case(doc! { "n": 0, "nModified": 0, "ok": 1.0 }, 0 ; "nothing matched")]
    fn reply_count_reads_n(reply: Document, expected: u64) {
        assert_eq!(reply_count(&reply).unwrap(), expected);
    }

    #[test]
    fn reply_without_count_is_a_backend_error() {
        assert!(matches!(reply_count(&doc! { "ok": 1.0 }), Err(DocSqlError::Backend(_))));
    }

    #[test]
    fn builder_from_config_validates() {
        let config = DocSqlConfig {
            connection_string: String::new(),
            database: "library".to_string(),
            tables: Vec::new(),
        };

        assert!(matches!(MongoDbExecutorBuilder::from_config(&config), Err(DocSqlError::Configuration(_))));
    }
}
