//! Values, elements and documents.

use std::collections::HashSet;
use bson::Bson;

use docsql_core::{
    error::{DocSqlError, DocSqlResult},
    writer::DocumentWriter,
};

use crate::ast::Render;

/// An already typed, non-null scalar wire value.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal(Bson);

impl Literal {
    /// Wraps a scalar wire value.
    ///
    /// # Errors
    ///
    /// Returns an assertion error for `null`, `undefined`, arrays and documents; nested
    /// structure is expressed with [`AstDocument`] instead.
    pub fn new(value: impl Into<Bson>) -> DocSqlResult<Self> {
        match value.into() {
            Bson::Null | Bson::Undefined => Err(DocSqlError::assertion("literal values must not be null")),
            Bson::Array(_) | Bson::Document(_) => Err(DocSqlError::assertion("literal values must be scalars")),
            value => Ok(Literal(value)),
        }
    }

    pub fn value(&self) -> &Bson {
        &self.0
    }
}

impl Render for Literal {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.write_scalar(&self.0)
    }
}

/// Marks where a late-bound parameter value goes.
///
/// Placeholders carry only the zero-based position of the parameter in the statement's
/// parameter list and render as the `undefined` marker unless the writer binds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder {
    position: usize,
}

impl Placeholder {
    pub fn new(position: usize) -> Self {
        Placeholder { position }
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl Render for Placeholder {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.write_placeholder(self.position)
    }
}

/// Anything that can stand in a value position.
#[derive(Debug, Clone, PartialEq)]
pub enum AstValue {
    Literal(Literal),
    Placeholder(Placeholder),
    Document(AstDocument),
}

impl AstValue {
    /// Shorthand for a literal value.
    pub fn literal(value: impl Into<Bson>) -> DocSqlResult<Self> {
        Ok(AstValue::Literal(Literal::new(value)?))
    }

    pub fn placeholder(position: usize) -> Self {
        AstValue::Placeholder(Placeholder::new(position))
    }
}

impl From<Literal> for AstValue {
    fn from(literal: Literal) -> Self {
        AstValue::Literal(literal)
    }
}

impl From<Placeholder> for AstValue {
    fn from(placeholder: Placeholder) -> Self {
        AstValue::Placeholder(placeholder)
    }
}

impl From<AstDocument> for AstValue {
    fn from(document: AstDocument) -> Self {
        AstValue::Document(document)
    }
}

impl Render for AstValue {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        match self {
            AstValue::Literal(literal) => literal.render(writer),
            AstValue::Placeholder(placeholder) => placeholder.render(writer),
            AstValue::Document(document) => document.render(writer),
        }
    }
}

/// A named value inside a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    value: AstValue,
}

impl Element {
    pub fn new(name: impl Into<String>, value: impl Into<AstValue>) -> Self {
        Element { name: name.into(), value: value.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &AstValue {
        &self.value
    }
}

impl Render for Element {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.write_name(&self.name)?;
        self.value.render(writer)
    }
}

/// An ordered sequence of elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AstDocument {
    elements: Vec<Element>,
}

impl AstDocument {
    /// Creates a document keeping the elements in the given order.
    ///
    /// # Errors
    ///
    /// Returns an assertion error if two elements share a name.
    pub fn new(elements: impl IntoIterator<Item = Element>) -> DocSqlResult<Self> {
        let elements = elements.into_iter().collect::<Vec<_>>();
        let mut names = HashSet::with_capacity(elements.len());

        if let Some(duplicate) = elements.iter().find(|element| !names.insert(element.name())) {
            return Err(DocSqlError::assertion(format!("field {} appears twice in a document", duplicate.name())));
        }

        Ok(AstDocument { elements })
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

impl Render for AstDocument {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.start_document()?;
        for element in &self.elements {
            element.render(writer)?;
        }
        writer.end_document()
    }
}
