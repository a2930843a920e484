//! Translation of relational statements into MongoDB commands.
//!
//! [`MongoTranslator`] implements the host's [`SqlAstWalker`] protocol. Because the
//! protocol's visit methods carry no value back, every sub-tree is visited inside a
//! [`ValueExchange::execute`] scope and the visit method yields its command tree
//! fragment into that scope:
//!
//! | visited node | yielded fragment |
//! |---|---|
//! | statement | [`Command`] |
//! | table reference | collection name (`String`) |
//! | expression, column reference | [`Operand`] |
//! | predicate | [`Filter`] |
//! | values list | [`AstDocument`] |
//! | assignment | [`FieldUpdate`] |
//! | selection | [`ProjectionSpec`] |
//! | sort specification | [`SortField`] |
//!
//! Constructs without a translation rule fail with
//! [`DocSqlError::FeatureNotSupported`](docsql_core::error::DocSqlError::FeatureNotSupported).
//!
//! # Example
//!
//! ```ignore
//! use docsql_core::value::DefaultValueCodec;
//! use docsql_mongodb::translate::MongoTranslator;
//!
//! let command = MongoTranslator::new(&metadata, DefaultValueCodec).translate(&statement)?;
//! let document = command.to_document()?;
//! ```

use tracing::{Level, debug, enabled};

use docsql_core::{
    error::{DocSqlError, DocSqlResult},
    exchange::ValueExchange,
    metadata::EntityMetadata,
    sql::{self, ColumnReference, Expression, Predicate, SqlAstWalker, Statement, TableReference, WalkResult},
    value::ValueCodec,
};

use crate::ast::{AstValue, Command, ComparisonOperator, FieldPath, Filter};

mod walker;

#[cfg(test)]
mod tests;

/// An expression translated into either a field reference or a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(FieldPath),
    Value(AstValue),
}

/// Maps relational comparison operators onto query operators.
pub fn comparison_operator(operator: sql::ComparisonOperator) -> DocSqlResult<ComparisonOperator> {
    match operator {
        sql::ComparisonOperator::Equal => Ok(ComparisonOperator::Eq),
        sql::ComparisonOperator::NotEqual => Ok(ComparisonOperator::Ne),
        sql::ComparisonOperator::GreaterThan => Ok(ComparisonOperator::Gt),
        sql::ComparisonOperator::GreaterThanOrEqual => Ok(ComparisonOperator::Gte),
        sql::ComparisonOperator::LessThan => Ok(ComparisonOperator::Lt),
        sql::ComparisonOperator::LessThanOrEqual => Ok(ComparisonOperator::Lte),
        other => Err(DocSqlError::unsupported(format!("comparison operator '{}'", other.sql_symbol()))),
    }
}

/// Walks one relational statement and builds the equivalent [`Command`].
///
/// A translator holds per-pass state (the value exchange and the table in scope) and
/// takes `&mut self`, so a single instance cannot serve two passes at once. Create one
/// per statement, or reuse it strictly sequentially.
pub struct MongoTranslator<M, C> {
    metadata: M,
    codec: C,
    exchange: ValueExchange,
    scope: Option<TableReference>,
    insert_fields: Vec<FieldPath>,
}

impl<M, C> MongoTranslator<M, C>
where
    M: EntityMetadata,
    C: ValueCodec,
{
    pub fn new(metadata: M, codec: C) -> Self {
        MongoTranslator {
            metadata,
            codec,
            exchange: ValueExchange::new(),
            scope: None,
            insert_fields: Vec::new(),
        }
    }

    /// Translates a statement into a command.
    ///
    /// # Errors
    ///
    /// [`DocSqlError::FeatureNotSupported`] for constructs without a translation rule,
    /// [`DocSqlError::Metadata`] for unmapped tables or columns, and
    /// [`DocSqlError::Assertion`] if the translator breaks one of its own invariants.
    pub fn translate(&mut self, statement: &Statement) -> DocSqlResult<Command> {
        let command: Command = self.produce(|translator| statement.accept(translator))?;

        if enabled!(Level::DEBUG) {
            if let Ok(json) = command.to_json() {
                debug!(command = %json, "translated {} statement", command.name());
            }
        }

        Ok(command)
    }

    /// Runs `visit` in its own exchange scope and returns what it yielded.
    fn produce<T: Send + 'static>(&mut self, visit: impl FnOnce(&mut Self) -> WalkResult) -> DocSqlResult<T> {
        ValueExchange::execute(self, visit)
    }

    fn yield_value<T: Send + 'static>(&mut self, value: T) -> WalkResult {
        self.exchange.yield_value(value)
    }

    /// Runs `visit` with `table` as the table columns resolve against.
    fn with_scope<T>(
        &mut self,
        table: &TableReference,
        visit: impl FnOnce(&mut Self) -> DocSqlResult<T>,
    ) -> DocSqlResult<T> {
        if let Some(outer) = &self.scope {
            return Err(DocSqlError::unsupported(format!(
                "statement on table {} nested in a statement on table {}",
                table.table, outer.table,
            )));
        }

        self.scope = Some(table.clone());
        let outcome = visit(self);
        self.scope = None;

        outcome
    }

    fn collection_of(&mut self, table: &TableReference) -> DocSqlResult<String> {
        self.produce(|translator| translator.visit_table_reference(table))
    }

    fn operand_of(&mut self, expression: &Expression) -> DocSqlResult<Operand> {
        self.produce(|translator| expression.accept(translator))
    }

    fn field_of(&mut self, column: &ColumnReference) -> DocSqlResult<FieldPath> {
        match self.produce(|translator| translator.visit_column_reference(column))? {
            Operand::Field(field) => Ok(field),
            Operand::Value(_) => Err(DocSqlError::assertion("column reference translated into a value")),
        }
    }

    /// Translates an expression that must stand for a value (literal or parameter).
    fn value_of(&mut self, expression: &Expression, context: &str) -> DocSqlResult<AstValue> {
        match self.operand_of(expression)? {
            Operand::Value(value) => Ok(value),
            Operand::Field(field) => Err(DocSqlError::unsupported(format!("column {field} used as a value in {context}"))),
        }
    }

    /// Translates an expression that must reference a column.
    fn column_field_of(&mut self, expression: &Expression, context: &str) -> DocSqlResult<FieldPath> {
        match self.operand_of(expression)? {
            Operand::Field(field) => Ok(field),
            Operand::Value(_) => Err(DocSqlError::unsupported(format!("{context} on a value instead of a column"))),
        }
    }

    fn filter_of(&mut self, predicate: &Predicate) -> DocSqlResult<Filter> {
        self.produce(|translator| predicate.accept(translator))
    }

    fn restriction_of(&mut self, restriction: Option<&Predicate>) -> DocSqlResult<Filter> {
        match restriction {
            Some(predicate) => self.filter_of(predicate),
            None => Ok(Filter::All),
        }
    }
}

impl<M, C> AsMut<ValueExchange> for MongoTranslator<M, C> {
    fn as_mut(&mut self) -> &mut ValueExchange {
        &mut self.exchange
    }
}
