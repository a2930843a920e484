//! Late binding of parameter values into rendered commands.
//!
//! Commands carry [`Placeholder`](crate::ast::Placeholder)s that only know their
//! zero-based parameter position. [`BindingWriter`] wraps another writer and substitutes
//! the value at that position whenever a placeholder is written, so the command tree
//! itself is never rewritten and can be rendered again with other values.

use bson::{Bson, Document};

use docsql_core::{
    error::{DocSqlError, DocSqlResult},
    writer::{BsonDocumentWriter, DocumentWriter},
};

use crate::ast::{Command, Render};

/// A writer that resolves placeholders against a list of parameter values.
#[derive(Debug)]
pub struct BindingWriter<'a, W> {
    inner: W,
    values: &'a [Bson],
    bound: Vec<bool>,
}

impl<'a, W: DocumentWriter> BindingWriter<'a, W> {
    pub fn new(inner: W, values: &'a [Bson]) -> Self {
        BindingWriter { inner, values, bound: vec![false; values.len()] }
    }

    /// Returns the wrapped writer once every value has been bound.
    ///
    /// # Errors
    ///
    /// Returns [`DocSqlError::Parameter`] if a value was never referenced by a placeholder.
    pub fn finish(self) -> DocSqlResult<W> {
        if let Some(position) = self.bound.iter().position(|bound| !bound) {
            return Err(DocSqlError::Parameter(format!(
                "parameter {position} of {} is not referenced by the command",
                self.values.len(),
            )));
        }

        Ok(self.inner)
    }
}

impl<W: DocumentWriter> DocumentWriter for BindingWriter<'_, W> {
    fn start_document(&mut self) -> DocSqlResult<()> {
        self.inner.start_document()
    }

    fn end_document(&mut self) -> DocSqlResult<()> {
        self.inner.end_document()
    }

    fn start_array(&mut self) -> DocSqlResult<()> {
        self.inner.start_array()
    }

    fn end_array(&mut self) -> DocSqlResult<()> {
        self.inner.end_array()
    }

    fn write_name(&mut self, name: &str) -> DocSqlResult<()> {
        self.inner.write_name(name)
    }

    fn write_string(&mut self, value: &str) -> DocSqlResult<()> {
        self.inner.write_string(value)
    }

    fn write_int32(&mut self, value: i32) -> DocSqlResult<()> {
        self.inner.write_int32(value)
    }

    fn write_int64(&mut self, value: i64) -> DocSqlResult<()> {
        self.inner.write_int64(value)
    }

    fn write_double(&mut self, value: f64) -> DocSqlResult<()> {
        self.inner.write_double(value)
    }

    fn write_boolean(&mut self, value: bool) -> DocSqlResult<()> {
        self.inner.write_boolean(value)
    }

    fn write_undefined(&mut self) -> DocSqlResult<()> {
        self.inner.write_undefined()
    }

    fn write_placeholder(&mut self, position: usize) -> DocSqlResult<()> {
        let Some(value) = self.values.get(position) else {
            return Err(DocSqlError::Parameter(format!(
                "no value for parameter {position}, {} supplied",
                self.values.len(),
            )));
        };

        self.bound[position] = true;
        self.inner.write_scalar(value)
    }

    fn write_bson(&mut self, value: &Bson) -> DocSqlResult<()> {
        self.inner.write_bson(value)
    }
}

impl Command {
    /// Renders the command with every placeholder replaced by its parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`DocSqlError::Parameter`] when a placeholder has no value or a value is
    /// left unused.
    pub fn to_bound_document(&self, values: &[Bson]) -> DocSqlResult<Document> {
        let mut writer = BindingWriter::new(BsonDocumentWriter::new(), values);
        self.render(&mut writer)?;
        writer.finish()?.into_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    use crate::ast::{
        AstDocument, AstValue, ComparisonOperator, DeleteCommand, Element, FieldPath, FieldUpdate, Filter,
        InsertCommand, Literal, Placeholder, UpdateCommand,
    };

    fn update() -> Command {
        // `q` renders before `u`, so document order differs from parameter order.
        Command::from(
            UpdateCommand::new(
                "books",
                Filter::comparison(FieldPath::new("_id"), ComparisonOperator::Eq, AstValue::placeholder(1)),
                [FieldUpdate::new(FieldPath::new("title"), Placeholder::new(0))],
            )
            .unwrap(),
        )
    }

    #[test]
    fn binds_by_position_not_by_document_order() {
        let document = update().to_bound_document(&[Bson::from("Anna Karenina"), Bson::Int64(7)]).unwrap();

        assert_eq!(
            document,
            doc! {
                "update": "books",
                "updates": [{
                    "q": { "_id": { "$eq": 7_i64 } },
                    "u": { "$set": { "title": "Anna Karenina" } },
                    "multi": false,
                }],
            },
        );
    }

    #[test]
    fn unbound_render_is_left_untouched() {
        let command = update();
        command.to_bound_document(&[Bson::from("x"), Bson::Int32(1)]).unwrap();

        assert_eq!(
            command.to_document().unwrap(),
            doc! {
                "update": "books",
                "updates": [{
                    "q": { "_id": { "$eq": Bson::Undefined } },
                    "u": { "$set": { "title": Bson::Undefined } },
                    "multi": false,
                }],
            },
        );
    }

    #[test]
    fn missing_value_is_a_parameter_error() {
        let error = update().to_bound_document(&[Bson::from("Anna Karenina")]).unwrap_err();

        assert!(matches!(error, DocSqlError::Parameter(_)));
    }

    #[test]
    fn unused_value_is_a_parameter_error() {
        let command = Command::from(DeleteCommand::new("books", Filter::All));
        let error = command.to_bound_document(&[Bson::Int32(1)]).unwrap_err();

        assert!(matches!(error, DocSqlError::Parameter(_)));
    }

    #[test]
    fn literals_pass_through() {
        let command = Command::from(
            InsertCommand::new(
                "books",
                [AstDocument::new([
                    Element::new("title", Literal::new("War and Peace").unwrap()),
                    Element::new("_id", Placeholder::new(0)),
                ])
                .unwrap()],
            )
            .unwrap(),
        );

        assert_eq!(
            command.to_bound_document(&[Bson::ObjectId(bson::oid::ObjectId::from_bytes([1; 12]))]).unwrap(),
            doc! {
                "insert": "books",
                "documents": [{ "title": "War and Peace", "_id": bson::oid::ObjectId::from_bytes([1; 12]) }],
            },
        );
    }
}
