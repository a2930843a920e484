//! In-memory command execution.
//!
//! [`InMemoryExecutor`] interprets the command documents docsql renders against
//! collections held in memory, so translated statements can be exercised end to end
//! without a database server.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, oid::ObjectId};
use tracing::{debug, trace};

use docsql_core::{
    error::{DocSqlError, DocSqlResult},
    executor::{CommandExecutor, CommandResult, ExecutorBuilder, command_str},
    metadata::ID_FIELD_NAME,
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

/// collection name -> documents in insertion order
type CollectionMap = HashMap<String, Vec<Document>>;

/// Thread-safe executor keeping every collection in memory.
///
/// `InMemoryExecutor` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be shared across async tasks. Clones of the same instance share the same
/// underlying data.
///
/// Each command runs under one write (or read, for `aggregate`) lock. Filters are
/// evaluated before a document is modified, and queries scan the whole collection.
///
/// # Example
///
/// ```ignore
/// use docsql_memory::InMemoryExecutor;
/// use docsql_core::executor::CommandExecutor;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let executor = InMemoryExecutor::new();
///
///     executor
///         .execute(doc! { "insert": "books", "documents": [{ "_id": 1, "title": "War and Peace" }] })
///         .await?;
///     let rows = executor
///         .execute(doc! { "aggregate": "books", "pipeline": [] })
///         .await?
///         .into_rows()?;
///     assert_eq!(rows.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryExecutor {
    collections: Arc<RwLock<CollectionMap>>,
}

impl InMemoryExecutor {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(CollectionMap::new())),
        }
    }

    pub fn builder() -> InMemoryExecutorBuilder {
        InMemoryExecutorBuilder::default()
    }

    /// Returns a copy of a collection's documents in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    async fn insert(&self, collection: &str, command: &Document) -> DocSqlResult<u64> {
        let mut incoming = Vec::new();
        for document in command_array(command, "documents")? {
            let mut document = document.clone();
            if !document.contains_key(ID_FIELD_NAME) {
                // The server generates missing identifiers and stores them first.
                let mut with_id = Document::new();
                with_id.insert(ID_FIELD_NAME, ObjectId::new());
                for (field, value) in document {
                    with_id.insert(field, value);
                }
                document = with_id;
            }
            incoming.push(document);
        }

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        for (index, document) in incoming.iter().enumerate() {
            let id = document.get(ID_FIELD_NAME);
            let duplicate = documents.iter().chain(&incoming[..index]).any(|existing| existing.get(ID_FIELD_NAME) == id);
            if duplicate {
                return Err(DocSqlError::Backend(format!(
                    "duplicate key in collection {collection}: _id {}",
                    id.map(ToString::to_string).unwrap_or_default(),
                )));
            }
        }

        let count = incoming.len() as u64;
        documents.extend(incoming);

        Ok(count)
    }

    async fn update(&self, collection: &str, command: &Document) -> DocSqlResult<u64> {
        let specs = command_array(command, "updates")?;
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut matched = 0;
        for spec in specs {
            let filter = sub_document(spec, "q")?;
            let set = sub_document(sub_document(spec, "u")?, "$set")?;
            let multi = spec.get_bool("multi").unwrap_or(false);

            if set.contains_key(ID_FIELD_NAME) {
                return Err(DocSqlError::Backend(format!("the {ID_FIELD_NAME} field is immutable")));
            }

            let targets = matching_positions(documents, filter, if multi { usize::MAX } else { 1 })?;
            for position in &targets {
                for (field, value) in set {
                    documents[*position].insert(field.clone(), value.clone());
                }
            }
            matched += targets.len() as u64;
        }

        Ok(matched)
    }

    async fn delete(&self, collection: &str, command: &Document) -> DocSqlResult<u64> {
        let specs = command_array(command, "deletes")?;
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut deleted = 0;
        for spec in specs {
            let filter = sub_document(spec, "q")?;
            let limit = match spec.get("limit") {
                Some(Bson::Int32(0)) | Some(Bson::Int64(0)) => usize::MAX,
                Some(Bson::Int32(1)) | Some(Bson::Int64(1)) => 1,
                other => {
                    return Err(DocSqlError::Backend(format!("delete limit must be 0 or 1, got {other:?}")));
                }
            };

            let targets = matching_positions(documents, filter, limit)?;
            let mut position = 0;
            documents.retain(|_| {
                let keep = !targets.contains(&position);
                position += 1;
                keep
            });
            deleted += targets.len() as u64;
        }

        Ok(deleted)
    }

    async fn aggregate(&self, collection: &str, command: &Document) -> DocSqlResult<Vec<Document>> {
        let pipeline = command_array(command, "pipeline")?;
        let collections = self.collections.read().await;
        let mut rows = collections.get(collection).cloned().unwrap_or_default();

        for stage in pipeline {
            let Some((name, argument)) = stage.iter().next() else {
                return Err(DocSqlError::Backend("empty pipeline stage".to_string()));
            };
            trace!(stage = %name, rows = rows.len(), "applying pipeline stage");

            rows = match name.as_str() {
                "$match" => {
                    let filter = stage_document(name, argument)?;
                    DocumentEvaluator::filter_documents(&rows, filter)?.into_iter().cloned().collect()
                }
                "$project" => project(rows, stage_document(name, argument)?)?,
                "$sort" => sort(rows, stage_document(name, argument)?)?,
                "$skip" => rows.into_iter().skip(stage_count(name, argument)?).collect(),
                "$limit" => match stage_count(name, argument)? {
                    0 => return Err(DocSqlError::Backend("$limit must be positive".to_string())),
                    limit => rows.into_iter().take(limit).collect(),
                },
                other => return Err(DocSqlError::Backend(format!("unsupported pipeline stage {other}"))),
            };
        }

        Ok(rows)
    }
}

/// Positions of the first `limit` documents matching `filter`.
///
/// Matching runs before any document is touched, so a failing filter leaves the
/// collection unchanged.
fn matching_positions(documents: &[Document], filter: &Document, limit: usize) -> DocSqlResult<Vec<usize>> {
    let mut positions = Vec::new();

    for (position, document) in documents.iter().enumerate() {
        if positions.len() == limit {
            break;
        }
        if DocumentEvaluator::new(document).matches(filter)? {
            positions.push(position);
        }
    }

    Ok(positions)
}

fn command_array<'a>(command: &'a Document, key: &str) -> DocSqlResult<Vec<&'a Document>> {
    command
        .get_array(key)
        .map_err(|_| DocSqlError::Backend(format!("command is missing array field {key}")))?
        .iter()
        .map(|item| {
            item.as_document()
                .ok_or_else(|| DocSqlError::Backend(format!("{key} must contain documents")))
        })
        .collect()
}

fn sub_document<'a>(document: &'a Document, key: &str) -> DocSqlResult<&'a Document> {
    document
        .get_document(key)
        .map_err(|_| DocSqlError::Backend(format!("missing document field {key}")))
}

fn stage_document<'a>(name: &str, argument: &'a Bson) -> DocSqlResult<&'a Document> {
    argument
        .as_document()
        .ok_or_else(|| DocSqlError::Backend(format!("{name} expects a document")))
}

fn stage_count(name: &str, argument: &Bson) -> DocSqlResult<usize> {
    let count = match argument {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        other => return Err(DocSqlError::Backend(format!("{name} expects an integer, got {other}"))),
    };

    usize::try_from(count).map_err(|_| DocSqlError::Backend(format!("{name} must not be negative")))
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

fn project(rows: Vec<Document>, specification: &Document) -> DocSqlResult<Vec<Document>> {
    let keep_id = specification.get(ID_FIELD_NAME).is_none_or(is_truthy);
    let included = specification
        .iter()
        .filter(|(field, value)| field.as_str() != ID_FIELD_NAME && is_truthy(value))
        .map(|(field, _)| field.as_str())
        .collect::<Vec<_>>();
    let excluded = specification
        .iter()
        .filter(|(field, value)| field.as_str() != ID_FIELD_NAME && !is_truthy(value))
        .map(|(field, _)| field.as_str())
        .collect::<Vec<_>>();

    if !included.is_empty() && !excluded.is_empty() {
        return Err(DocSqlError::Backend("$project cannot mix inclusion and exclusion".to_string()));
    }
    // `{"_id": true}` alone still selects only the identifier.
    let inclusion = !included.is_empty() || (excluded.is_empty() && keep_id && specification.contains_key(ID_FIELD_NAME));

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut projected = Document::new();
            if keep_id {
                if let Some(id) = row.get(ID_FIELD_NAME) {
                    projected.insert(ID_FIELD_NAME, id.clone());
                }
            }

            if !inclusion {
                for (field, value) in &row {
                    if field != ID_FIELD_NAME && !excluded.contains(&field.as_str()) {
                        projected.insert(field.clone(), value.clone());
                    }
                }
            } else {
                // Included fields keep the stored document's order.
                for (field, value) in &row {
                    if included.contains(&field.as_str()) {
                        projected.insert(field.clone(), value.clone());
                    }
                }
            }

            projected
        })
        .collect())
}

fn sort(mut rows: Vec<Document>, specification: &Document) -> DocSqlResult<Vec<Document>> {
    let mut keys = Vec::with_capacity(specification.len());
    for (field, direction) in specification {
        let descending = match direction {
            Bson::Int32(1) | Bson::Int64(1) => false,
            Bson::Int32(-1) | Bson::Int64(-1) => true,
            other => return Err(DocSqlError::Backend(format!("$sort direction must be 1 or -1, got {other}"))),
        };
        keys.push((field.as_str(), descending));
    }

    let null = Bson::Null;
    rows.sort_by(|a, b| {
        keys.iter().fold(Ordering::Equal, |ordering, (field, descending)| {
            ordering.then_with(|| {
                let left = Comparable::from(lookup(a, field).unwrap_or(&null));
                let right = Comparable::from(lookup(b, field).unwrap_or(&null));
                let ordering = left.sort_cmp(&right);

                if *descending { ordering.reverse() } else { ordering }
            })
        })
    });

    Ok(rows)
}

#[async_trait]
impl CommandExecutor for InMemoryExecutor {
    async fn execute(&self, command: Document) -> DocSqlResult<CommandResult> {
        let name = command
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| DocSqlError::Backend("empty command document".to_string()))?;
        let collection = command_str(&command, &name)?;

        debug!(command = %name, collection = %collection, "executing in memory");

        let result = match name.as_str() {
            "insert" => CommandResult::Affected(self.insert(collection, &command).await?),
            "update" => CommandResult::Affected(self.update(collection, &command).await?),
            "delete" => CommandResult::Affected(self.delete(collection, &command).await?),
            "aggregate" => CommandResult::Rows(self.aggregate(collection, &command).await?),
            other => return Err(DocSqlError::Backend(format!("unsupported command {other}"))),
        };

        trace!(command = %name, result = ?result, "command finished");

        Ok(result)
    }
}

/// Builder for [`InMemoryExecutor`] instances, optionally seeded with documents.
#[derive(Default)]
pub struct InMemoryExecutorBuilder {
    seed: CollectionMap,
}

impl InMemoryExecutorBuilder {
    /// Pre-populates `collection` with `documents`.
    pub fn with_documents(mut self, collection: &str, documents: impl IntoIterator<Item = Document>) -> Self {
        self.seed.entry(collection.to_string()).or_default().extend(documents);
        self
    }
}

#[async_trait]
impl ExecutorBuilder for InMemoryExecutorBuilder {
    type Executor = InMemoryExecutor;

    async fn build(self) -> DocSqlResult<Self::Executor> {
        Ok(InMemoryExecutor {
            collections: Arc::new(RwLock::new(self.seed)),
        })
    }
}
