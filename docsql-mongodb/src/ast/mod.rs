//! Command tree for MongoDB database commands.
//!
//! Every node is immutable after construction and knows how to [`Render`] itself onto a
//! [`DocumentWriter`]. Composite nodes own their children and render them depth-first in
//! the order they were supplied; element, field and stage order is meaningful and is
//! never changed. Invariants (non-empty logical filters, non-null literals, at least one
//! document per insert, ...) are checked by the constructors, so rendering a node that
//! exists cannot fail for structural reasons.
//!
//! The node families are:
//!
//! - [`value`] - literals, parameter placeholders, elements and documents
//! - [`filter`] - comparison and logical filters, field paths
//! - [`stage`] - aggregation pipeline stages
//! - [`command`] - the four root commands

use docsql_core::{error::DocSqlResult, writer::DocumentWriter};

pub mod command;
pub mod filter;
pub mod stage;
pub mod value;

pub use command::{AggregateCommand, Command, DeleteCommand, FieldUpdate, InsertCommand, UpdateCommand};
pub use filter::{ComparisonFilter, ComparisonOperator, FieldPath, Filter, LogicalFilter, LogicalOperator};
pub use stage::{ProjectionSpec, SortDirection, SortField, Stage};
pub use value::{AstDocument, AstValue, Element, Literal, Placeholder};

/// A command tree node that can write itself to a streaming writer.
///
/// Rendering writes exactly one complete unit (a document, a value, or a name/value
/// pair, depending on the node) and leaves no container open.
pub trait Render {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()>;
}

impl<R: Render> Render for Box<R> {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        (**self).render(writer)
    }
}

/// Renders `items` as an array value.
pub(crate) fn render_array<R, W>(items: &[R], writer: &mut W) -> DocSqlResult<()>
where
    R: Render,
    W: DocumentWriter + ?Sized,
{
    writer.start_array()?;
    for item in items {
        item.render(writer)?;
    }
    writer.end_array()
}
