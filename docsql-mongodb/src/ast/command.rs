//! Root commands.
//!
//! The four command shapes and their wire form:
//!
//! - insert: `{"insert": <collection>, "documents": [<document>...]}`
//! - update: `{"update": <collection>, "updates": [{"q": <filter>, "u": {"$set": {...}}, "multi": <bool>}]}`
//! - delete: `{"delete": <collection>, "deletes": [{"q": <filter>, "limit": 0}]}`
//! - aggregate: `{"aggregate": <collection>, "pipeline": [<stage>...]}`

use bson::Document;

use docsql_core::{
    error::{DocSqlResult, assert_true},
    writer::{BsonDocumentWriter, DocumentWriter, JsonWriter},
};

use crate::ast::{AstDocument, AstValue, FieldPath, Filter, Render, Stage, render_array, stage::ensure_distinct};

#[derive(Debug, Clone, PartialEq)]
pub struct InsertCommand {
    collection: String,
    documents: Vec<AstDocument>,
}

impl InsertCommand {
    /// # Errors
    ///
    /// Returns an assertion error if `documents` is empty.
    pub fn new(collection: impl Into<String>, documents: impl IntoIterator<Item = AstDocument>) -> DocSqlResult<Self> {
        let documents = documents.into_iter().collect::<Vec<_>>();

        assert_true(!documents.is_empty(), || "insert needs at least one document".to_string())?;

        Ok(InsertCommand { collection: collection.into(), documents })
    }

    pub fn documents(&self) -> &[AstDocument] {
        &self.documents
    }
}

/// One `field: value` pair of a `$set` update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    field: FieldPath,
    value: AstValue,
}

impl FieldUpdate {
    pub fn new(field: FieldPath, value: impl Into<AstValue>) -> Self {
        FieldUpdate { field, value: value.into() }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }
}

impl Render for FieldUpdate {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.write_name(self.field.as_str())?;
        self.value.render(writer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    collection: String,
    filter: Filter,
    updates: Vec<FieldUpdate>,
}

impl UpdateCommand {
    /// # Errors
    ///
    /// Returns an assertion error if `updates` is empty or sets a field twice.
    pub fn new(
        collection: impl Into<String>,
        filter: Filter,
        updates: impl IntoIterator<Item = FieldUpdate>,
    ) -> DocSqlResult<Self> {
        let updates = updates.into_iter().collect::<Vec<_>>();

        ensure_distinct("$set", updates.iter().map(FieldUpdate::field))?;

        Ok(UpdateCommand { collection: collection.into(), filter, updates })
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }

    /// `false` when the filter pins a single document by identifier.
    pub fn is_multi(&self) -> bool {
        !self.filter.is_id_equality()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteCommand {
    collection: String,
    filter: Filter,
}

impl DeleteCommand {
    pub fn new(collection: impl Into<String>, filter: Filter) -> Self {
        DeleteCommand { collection: collection.into(), filter }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// `true` when the filter pins a single document by identifier.
    pub fn is_single_document(&self) -> bool {
        self.filter.is_id_equality()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCommand {
    collection: String,
    pipeline: Vec<Stage>,
}

impl AggregateCommand {
    pub fn new(collection: impl Into<String>, pipeline: impl IntoIterator<Item = Stage>) -> Self {
        AggregateCommand {
            collection: collection.into(),
            pipeline: pipeline.into_iter().collect(),
        }
    }

    pub fn pipeline(&self) -> &[Stage] {
        &self.pipeline
    }
}

/// A complete database command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Insert(InsertCommand),
    Update(UpdateCommand),
    Delete(DeleteCommand),
    Aggregate(AggregateCommand),
}

impl Command {
    /// The command name, which is also the first key of the rendered document.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Insert(_) => "insert",
            Command::Update(_) => "update",
            Command::Delete(_) => "delete",
            Command::Aggregate(_) => "aggregate",
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Command::Insert(command) => &command.collection,
            Command::Update(command) => &command.collection,
            Command::Delete(command) => &command.collection,
            Command::Aggregate(command) => &command.collection,
        }
    }

    /// Renders the command into a BSON document, placeholders as `undefined`.
    pub fn to_document(&self) -> DocSqlResult<Document> {
        let mut writer = BsonDocumentWriter::new();
        self.render(&mut writer)?;
        writer.into_document()
    }

    /// Renders the command as compact relaxed extended JSON.
    pub fn to_json(&self) -> DocSqlResult<String> {
        let mut writer = JsonWriter::new();
        self.render(&mut writer)?;
        writer.finish()
    }

    /// Renders the command into raw BSON bytes.
    pub fn to_bytes(&self) -> DocSqlResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.to_document()?.to_writer(&mut bytes)?;

        Ok(bytes)
    }
}

impl From<InsertCommand> for Command {
    fn from(command: InsertCommand) -> Self {
        Command::Insert(command)
    }
}

impl From<UpdateCommand> for Command {
    fn from(command: UpdateCommand) -> Self {
        Command::Update(command)
    }
}

impl From<DeleteCommand> for Command {
    fn from(command: DeleteCommand) -> Self {
        Command::Delete(command)
    }
}

impl From<AggregateCommand> for Command {
    fn from(command: AggregateCommand) -> Self {
        Command::Aggregate(command)
    }
}

impl Render for Command {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.start_document()?;
        writer.write_name(self.name())?;
        writer.write_string(self.collection())?;

        match self {
            Command::Insert(insert) => {
                writer.write_name("documents")?;
                render_array(&insert.documents, writer)?;
            }
            Command::Update(update) => {
                writer.write_name("updates")?;
                writer.start_array()?;
                writer.start_document()?;
                writer.write_name("q")?;
                update.filter.render(writer)?;
                writer.write_name("u")?;
                writer.start_document()?;
                writer.write_name("$set")?;
                writer.start_document()?;
                for field_update in &update.updates {
                    field_update.render(writer)?;
                }
                writer.end_document()?;
                writer.end_document()?;
                writer.write_name("multi")?;
                writer.write_boolean(update.is_multi())?;
                writer.end_document()?;
                writer.end_array()?;
            }
            Command::Delete(delete) => {
                writer.write_name("deletes")?;
                writer.start_array()?;
                writer.start_document()?;
                writer.write_name("q")?;
                delete.filter.render(writer)?;
                writer.write_name("limit")?;
                writer.write_int32(0)?;
                writer.end_document()?;
                writer.end_array()?;
            }
            Command::Aggregate(aggregate) => {
                writer.write_name("pipeline")?;
                render_array(&aggregate.pipeline, writer)?;
            }
        }

        writer.end_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, doc};

    use crate::ast::{ComparisonOperator, Element, Literal, Placeholder, ProjectionSpec};

    fn id_equals(value: i32) -> Filter {
        Filter::comparison(FieldPath::new("_id"), ComparisonOperator::Eq, AstValue::literal(value).unwrap())
    }

    fn book() -> AstDocument {
        AstDocument::new([
            Element::new("title", Literal::new("War and Peace").unwrap()),
            Element::new("year", Literal::new(1867).unwrap()),
            Element::new("_id", Placeholder::new(0)),
        ])
        .unwrap()
    }

    #[test]
    fn insert_shape() {
        let command = Command::from(InsertCommand::new("books", [book()]).unwrap());

        assert_eq!(
            command.to_document().unwrap(),
            doc! {
                "insert": "books",
                "documents": [{ "title": "War and Peace", "year": 1867_i32, "_id": Bson::Undefined }],
            },
        );
    }

    #[test]
    fn insert_without_documents_is_rejected() {
        assert!(InsertCommand::new("books", []).unwrap_err().is_assertion());
    }

    #[test]
    fn update_shape_and_multi_flag() {
        let set_title = || FieldUpdate::new(FieldPath::new("title"), Literal::new("Anna Karenina").unwrap());
        let single = Command::from(UpdateCommand::new("books", id_equals(1), [set_title()]).unwrap());
        let broad = Command::from(UpdateCommand::new("books", Filter::All, [set_title()]).unwrap());

        assert_eq!(
            single.to_document().unwrap(),
            doc! {
                "update": "books",
                "updates": [{
                    "q": { "_id": { "$eq": 1 } },
                    "u": { "$set": { "title": "Anna Karenina" } },
                    "multi": false,
                }],
            },
        );
        assert_eq!(
            broad.to_document().unwrap(),
            doc! {
                "update": "books",
                "updates": [{ "q": {}, "u": { "$set": { "title": "Anna Karenina" } }, "multi": true }],
            },
        );
    }

    #[test]
    fn update_without_assignments_is_rejected() {
        assert!(UpdateCommand::new("books", Filter::All, []).unwrap_err().is_assertion());
    }

    #[test]
    fn update_setting_a_field_twice_is_rejected() {
        let title = |value: &str| FieldUpdate::new(FieldPath::new("title"), Literal::new(value).unwrap());

        assert!(UpdateCommand::new("books", Filter::All, [title("a"), title("b")]).unwrap_err().is_assertion());
    }

    #[test]
    fn delete_shape() {
        let command = DeleteCommand::new("books", id_equals(12345));

        assert!(command.is_single_document());
        assert_eq!(
            Command::from(command).to_document().unwrap(),
            doc! { "delete": "books", "deletes": [{ "q": { "_id": { "$eq": 12345 } }, "limit": 0 }] },
        );
    }

    #[test]
    fn aggregate_shape() {
        let command = Command::from(AggregateCommand::new(
            "books",
            [
                Stage::filter(id_equals(1)),
                Stage::project([ProjectionSpec::include(FieldPath::new("title"))]).unwrap(),
            ],
        ));

        assert_eq!(
            command.to_document().unwrap(),
            doc! {
                "aggregate": "books",
                "pipeline": [
                    { "$match": { "_id": { "$eq": 1 } } },
                    { "$project": { "title": true } },
                ],
            },
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let command = Command::from(InsertCommand::new("books", [book(), book()]).unwrap());

        assert_eq!(command.to_bytes().unwrap(), command.to_bytes().unwrap());
        assert_eq!(command.to_json().unwrap(), command.to_json().unwrap());
    }

    #[test]
    fn json_form() {
        let command = Command::from(DeleteCommand::new("books", Filter::All));

        assert_eq!(
            command.to_json().unwrap(),
            r#"{"delete":"books","deletes":[{"q":{},"limit":0}]}"#,
        );
    }

    #[test]
    fn bytes_decode_back_to_the_document() {
        let command = Command::from(InsertCommand::new("books", [book()]).unwrap());
        let bytes = command.to_bytes().unwrap();

        assert_eq!(Document::from_reader(bytes.as_slice()).unwrap(), command.to_document().unwrap());
    }
}
