//! Filter predicates.
//!
//! A [`Filter`] restricts the documents a command affects. Comparisons render as
//! `{"<field>": {"<$op>": <value>}}`, logical combinators as `{"$and": [...]}` and the
//! neutral filter as `{}`.

use std::fmt;

use docsql_core::{
    error::{DocSqlError, DocSqlResult},
    metadata::ID_FIELD_NAME,
    writer::DocumentWriter,
};

use crate::ast::{AstValue, Render, render_array};

/// A (possibly dotted) document field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        FieldPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the primary key field.
    pub fn is_id(&self) -> bool {
        self.0 == ID_FIELD_NAME
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comparison query operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOperator {
    pub fn token(self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "$eq",
            ComparisonOperator::Ne => "$ne",
            ComparisonOperator::Gt => "$gt",
            ComparisonOperator::Gte => "$gte",
            ComparisonOperator::Lt => "$lt",
            ComparisonOperator::Lte => "$lte",
        }
    }
}

/// Logical query operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Nor,
}

impl LogicalOperator {
    pub fn token(self) -> &'static str {
        match self {
            LogicalOperator::And => "$and",
            LogicalOperator::Or => "$or",
            LogicalOperator::Nor => "$nor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonFilter {
    field: FieldPath,
    operator: ComparisonOperator,
    value: AstValue,
}

impl ComparisonFilter {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn value(&self) -> &AstValue {
        &self.value
    }
}

/// A logical combination of at least one filter.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalFilter {
    operator: LogicalOperator,
    filters: Vec<Filter>,
}

impl LogicalFilter {
    /// # Errors
    ///
    /// Returns an assertion error if `filters` is empty.
    pub fn new(operator: LogicalOperator, filters: impl IntoIterator<Item = Filter>) -> DocSqlResult<Self> {
        let filters = filters.into_iter().collect::<Vec<_>>();

        if filters.is_empty() {
            return Err(DocSqlError::assertion(format!("{} filter needs at least one sub-filter", operator.token())));
        }

        Ok(LogicalFilter { operator, filters })
    }

    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Comparison(ComparisonFilter),
    Logical(LogicalFilter),
    /// Matches every document.
    All,
}

impl Filter {
    pub fn comparison(field: FieldPath, operator: ComparisonOperator, value: impl Into<AstValue>) -> Self {
        Filter::Comparison(ComparisonFilter { field, operator, value: value.into() })
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> DocSqlResult<Self> {
        Ok(Filter::Logical(LogicalFilter::new(LogicalOperator::And, filters)?))
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> DocSqlResult<Self> {
        Ok(Filter::Logical(LogicalFilter::new(LogicalOperator::Or, filters)?))
    }

    pub fn nor(filters: impl IntoIterator<Item = Filter>) -> DocSqlResult<Self> {
        Ok(Filter::Logical(LogicalFilter::new(LogicalOperator::Nor, filters)?))
    }

    /// Returns `true` if the filter pins the primary key to a single value.
    ///
    /// Holds for an equality comparison on `_id`, and for a conjunction containing one.
    /// Commands use it to choose single-document execution.
    pub fn is_id_equality(&self) -> bool {
        match self {
            Filter::Comparison(comparison) => {
                comparison.operator == ComparisonOperator::Eq && comparison.field.is_id()
            }
            Filter::Logical(logical) => {
                logical.operator == LogicalOperator::And && logical.filters.iter().any(Filter::is_id_equality)
            }
            Filter::All => false,
        }
    }
}

impl Render for Filter {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.start_document()?;
        match self {
            Filter::Comparison(comparison) => {
                writer.write_name(comparison.field.as_str())?;
                writer.start_document()?;
                writer.write_name(comparison.operator.token())?;
                comparison.value.render(writer)?;
                writer.end_document()?;
            }
            Filter::Logical(logical) => {
                writer.write_name(logical.operator.token())?;
                render_array(&logical.filters, writer)?;
            }
            Filter::All => {}
        }
        writer.end_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, doc};
    use docsql_core::writer::BsonDocumentWriter;
    use test_case::test_case;

    fn render(filter: &Filter) -> bson::Document {
        let mut writer = BsonDocumentWriter::new();
        filter.render(&mut writer).unwrap();
        writer.into_document().unwrap()
    }

    fn eq(field: &str, value: i32) -> Filter {
        Filter::comparison(FieldPath::new(field), ComparisonOperator::Eq, AstValue::literal(value).unwrap())
    }

    #[test_case(ComparisonOperator::Eq, "$eq")]
    #[test_case(ComparisonOperator::Ne, "$ne")]
    #[test_case(ComparisonOperator::Gt, "$gt")]
    #[test_case(ComparisonOperator::Gte, "$gte")]
    #[test_case(ComparisonOperator::Lt, "$lt")]
    #[test_case(ComparisonOperator::Lte, "$lte")]
    fn comparison_renders_operator_token(operator: ComparisonOperator, token: &str) {
        let filter = Filter::comparison(FieldPath::new("year"), operator, AstValue::literal(1867).unwrap());

        assert_eq!(render(&filter), doc! { "year": { token: 1867_i32 } });
    }

    #[test_case(LogicalOperator::And, "$and")]
    #[test_case(LogicalOperator::Or, "$or")]
    #[test_case(LogicalOperator::Nor, "$nor")]
    fn logical_renders_children_in_order(operator: LogicalOperator, token: &str) {
        let filter = Filter::Logical(LogicalFilter::new(operator, [eq("a", 1), eq("b", 2)]).unwrap());

        assert_eq!(
            render(&filter),
            doc! { token: [{ "a": { "$eq": 1 } }, { "b": { "$eq": 2 } }] },
        );
    }

    #[test_case(LogicalOperator::And)]
    #[test_case(LogicalOperator::Or)]
    #[test_case(LogicalOperator::Nor)]
    fn logical_without_children_fails_at_construction(operator: LogicalOperator) {
        assert!(LogicalFilter::new(operator, []).unwrap_err().is_assertion());
    }

    #[test]
    fn match_all_renders_empty_document() {
        assert_eq!(render(&Filter::All), doc! {});
    }

    #[test]
    fn placeholder_value_renders_undefined() {
        let filter = Filter::comparison(FieldPath::new("_id"), ComparisonOperator::Eq, AstValue::placeholder(0));

        assert_eq!(render(&filter), doc! { "_id": { "$eq": Bson::Undefined } });
    }

    #[test]
    fn id_equality_detection() {
        assert!(eq("_id", 1).is_id_equality());
        assert!(!eq("title", 1).is_id_equality());
        assert!(!Filter::All.is_id_equality());

        let not_equal = Filter::comparison(FieldPath::new("_id"), ComparisonOperator::Ne, AstValue::literal(1).unwrap());
        assert!(!not_equal.is_id_equality());

        assert!(Filter::and([eq("title", 1), eq("_id", 2)]).unwrap().is_id_equality());
        assert!(!Filter::or([eq("title", 1), eq("_id", 2)]).unwrap().is_id_equality());
        assert!(!Filter::nor([eq("_id", 2)]).unwrap().is_id_equality());

        let nested = Filter::and([Filter::and([eq("_id", 2)]).unwrap(), eq("year", 3)]).unwrap();
        assert!(nested.is_id_equality());
    }
}
