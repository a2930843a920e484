//! Relational statement trees produced by the host ORM's statement compiler.
//!
//! The tree follows SQL concepts (tables, columns, predicates, projections) and is
//! walked through the [`SqlAstWalker`] protocol. The protocol is fixed by the host:
//! every `visit_*` method only reports success or failure and never returns a value,
//! so a walker that needs results has to pass them on by other means.
//!
//! # Example
//!
//! ```ignore
//! use docsql_core::sql::{ComparisonOperator, DeleteStatement, Expression, Predicate, TableReference};
//!
//! let delete = DeleteStatement::new(TableReference::new("book"))
//!     .restriction(Predicate::comparison(
//!         Expression::column("id"),
//!         ComparisonOperator::Equal,
//!         Expression::literal(12345),
//!     ));
//! ```

use crate::{error::DocSqlResult, value::DomainValue};

/// Outcome of a single `visit_*` call.
pub type WalkResult = DocSqlResult<()>;

/// A table occurrence in a statement, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    /// Table name as known to the entity metadata.
    pub table: String,
    /// Alias used to qualify column references.
    pub alias: Option<String>,
}

impl TableReference {
    pub fn new(table: impl Into<String>) -> Self {
        TableReference { table: table.into(), alias: None }
    }

    pub fn aliased(table: impl Into<String>, alias: impl Into<String>) -> Self {
        TableReference { table: table.into(), alias: Some(alias.into()) }
    }

    /// Returns `true` if a column qualifier designates this table.
    pub fn is_qualified_by(&self, qualifier: &str) -> bool {
        self.alias.as_deref() == Some(qualifier) || self.table == qualifier
    }
}

/// A reference to a column, optionally qualified by a table name or alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    pub qualifier: Option<String>,
    pub column: String,
}

impl ColumnReference {
    pub fn new(column: impl Into<String>) -> Self {
        ColumnReference { qualifier: None, column: column.into() }
    }

    pub fn qualified(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnReference { qualifier: Some(qualifier.into()), column: column.into() }
    }
}

/// A late-bound statement parameter, identified by its position in the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterMarker {
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticExpression {
    pub left: Box<Expression>,
    pub operator: ArithmeticOperator,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expression>,
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnReference),
    Literal(DomainValue),
    Parameter(ParameterMarker),
    Null,
    Function(FunctionCall),
    Arithmetic(ArithmeticExpression),
}

impl Expression {
    /// Creates an unqualified column reference.
    pub fn column(column: impl Into<String>) -> Self {
        Expression::Column(ColumnReference::new(column))
    }

    /// Creates a column reference qualified by a table name or alias.
    pub fn qualified_column(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Expression::Column(ColumnReference::qualified(qualifier, column))
    }

    pub fn literal(value: impl Into<DomainValue>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn parameter(position: usize) -> Self {
        Expression::Parameter(ParameterMarker { position })
    }

    pub fn accept<W: SqlAstWalker + ?Sized>(&self, walker: &mut W) -> WalkResult {
        match self {
            Expression::Column(column) => walker.visit_column_reference(column),
            Expression::Literal(value) => walker.visit_literal(value),
            Expression::Parameter(marker) => walker.visit_parameter(marker),
            Expression::Null => walker.visit_null(),
            Expression::Function(function) => walker.visit_function(function),
            Expression::Arithmetic(arithmetic) => walker.visit_arithmetic(arithmetic),
        }
    }
}

/// Relational comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    DistinctFrom,
    NotDistinctFrom,
}

impl ComparisonOperator {
    /// The operator that gives the same result with both operands swapped.
    pub fn flip(self) -> Self {
        match self {
            ComparisonOperator::LessThan => ComparisonOperator::GreaterThan,
            ComparisonOperator::LessThanOrEqual => ComparisonOperator::GreaterThanOrEqual,
            ComparisonOperator::GreaterThan => ComparisonOperator::LessThan,
            ComparisonOperator::GreaterThanOrEqual => ComparisonOperator::LessThanOrEqual,
            symmetric => symmetric,
        }
    }

    pub fn sql_symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
            ComparisonOperator::DistinctFrom => "is distinct from",
            ComparisonOperator::NotDistinctFrom => "is not distinct from",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPredicate {
    pub left: Expression,
    pub operator: ComparisonOperator,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionKind {
    Conjunction,
    Disjunction,
}

/// An AND or OR over an ordered list of predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub kind: JunctionKind,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullnessPredicate {
    pub expression: Expression,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InListPredicate {
    pub expression: Expression,
    pub list: Vec<Expression>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikePredicate {
    pub expression: Expression,
    pub pattern: Expression,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BetweenPredicate {
    pub expression: Expression,
    pub lower: Expression,
    pub upper: Expression,
    pub negated: bool,
}

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(ComparisonPredicate),
    Junction(Junction),
    Negated(Box<Predicate>),
    Grouped(Box<Predicate>),
    Nullness(NullnessPredicate),
    InList(InListPredicate),
    Like(LikePredicate),
    Between(BetweenPredicate),
}

impl Predicate {
    pub fn comparison(left: Expression, operator: ComparisonOperator, right: Expression) -> Self {
        Predicate::Comparison(ComparisonPredicate { left, operator, right })
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Junction(Junction {
            kind: JunctionKind::Conjunction,
            predicates: predicates.into_iter().collect(),
        })
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Junction(Junction {
            kind: JunctionKind::Disjunction,
            predicates: predicates.into_iter().collect(),
        })
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Negated(Box::new(predicate))
    }

    pub fn grouped(predicate: Predicate) -> Self {
        Predicate::Grouped(Box::new(predicate))
    }

    pub fn accept<W: SqlAstWalker + ?Sized>(&self, walker: &mut W) -> WalkResult {
        match self {
            Predicate::Comparison(comparison) => walker.visit_comparison(comparison),
            Predicate::Junction(junction) => walker.visit_junction(junction),
            Predicate::Negated(predicate) => walker.visit_negated_predicate(predicate),
            Predicate::Grouped(predicate) => walker.visit_grouped_predicate(predicate),
            Predicate::Nullness(predicate) => walker.visit_nullness_predicate(predicate),
            Predicate::InList(predicate) => walker.visit_in_list_predicate(predicate),
            Predicate::Like(predicate) => walker.visit_like_predicate(predicate),
            Predicate::Between(predicate) => walker.visit_between_predicate(predicate),
        }
    }
}

/// One `column = value` pair of an UPDATE's SET clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnReference,
    pub value: Expression,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Expression) -> Self {
        Assignment { column: ColumnReference::new(column), value }
    }
}

/// One row of an INSERT's VALUES clause, aligned with the statement's column list.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesList {
    pub values: Vec<Expression>,
}

impl ValuesList {
    pub fn new(values: impl IntoIterator<Item = Expression>) -> Self {
        ValuesList { values: values.into_iter().collect() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<ValuesList>),
    Select(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub target: TableReference,
    /// Columns in declaration order.
    pub columns: Vec<ColumnReference>,
    pub source: InsertSource,
}

impl InsertStatement {
    pub fn new(target: TableReference, columns: impl IntoIterator<Item = ColumnReference>) -> Self {
        InsertStatement {
            target,
            columns: columns.into_iter().collect(),
            source: InsertSource::Values(Vec::new()),
        }
    }

    /// Appends a row of values. Replaces an `INSERT ... SELECT` source.
    pub fn row(mut self, row: ValuesList) -> Self {
        match &mut self.source {
            InsertSource::Values(rows) => rows.push(row),
            InsertSource::Select(_) => self.source = InsertSource::Values(vec![row]),
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub target: TableReference,
    pub assignments: Vec<Assignment>,
    pub restriction: Option<Predicate>,
}

impl UpdateStatement {
    pub fn new(target: TableReference, assignments: impl IntoIterator<Item = Assignment>) -> Self {
        UpdateStatement {
            target,
            assignments: assignments.into_iter().collect(),
            restriction: None,
        }
    }

    pub fn restriction(mut self, predicate: Predicate) -> Self {
        self.restriction = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub target: TableReference,
    pub restriction: Option<Predicate>,
}

impl DeleteStatement {
    pub fn new(target: TableReference) -> Self {
        DeleteStatement { target, restriction: None }
    }

    pub fn restriction(mut self, predicate: Predicate) -> Self {
        self.restriction = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableJoin {
    pub join_type: JoinType,
    pub table: TableReference,
    pub predicate: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub root: TableReference,
    pub joins: Vec<TableJoin>,
}

/// One item of a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub expression: Expression,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpecification {
    pub expression: Expression,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub from: FromClause,
    pub selections: Vec<Selection>,
    pub restriction: Option<Predicate>,
    pub group_by: Vec<Expression>,
    pub sort_specifications: Vec<SortSpecification>,
    pub offset: Option<Expression>,
    pub fetch: Option<Expression>,
    pub distinct: bool,
}

impl SelectStatement {
    /// Creates a `SELECT <columns> FROM <root>` statement with nothing else set.
    pub fn new(root: TableReference, columns: impl IntoIterator<Item = Expression>) -> Self {
        SelectStatement {
            from: FromClause { root, joins: Vec::new() },
            selections: columns
                .into_iter()
                .map(|expression| Selection { expression, alias: None })
                .collect(),
            restriction: None,
            group_by: Vec::new(),
            sort_specifications: Vec::new(),
            offset: None,
            fetch: None,
            distinct: false,
        }
    }

    pub fn restriction(mut self, predicate: Predicate) -> Self {
        self.restriction = Some(predicate);
        self
    }

    pub fn order_by(mut self, expression: Expression, order: SortOrder) -> Self {
        self.sort_specifications.push(SortSpecification { expression, order });
        self
    }

    pub fn offset(mut self, offset: Expression) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn fetch(mut self, fetch: Expression) -> Self {
        self.fetch = Some(fetch);
        self
    }
}

/// A root statement handed over by the host ORM.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
}

impl Statement {
    pub fn accept<W: SqlAstWalker + ?Sized>(&self, walker: &mut W) -> WalkResult {
        match self {
            Statement::Insert(statement) => walker.visit_insert_statement(statement),
            Statement::Update(statement) => walker.visit_update_statement(statement),
            Statement::Delete(statement) => walker.visit_delete_statement(statement),
            Statement::Select(statement) => walker.visit_select_statement(statement),
        }
    }

    /// The table the statement reads from or writes to.
    pub fn target(&self) -> &TableReference {
        match self {
            Statement::Insert(statement) => &statement.target,
            Statement::Update(statement) => &statement.target,
            Statement::Delete(statement) => &statement.target,
            Statement::Select(statement) => &statement.from.root,
        }
    }
}

impl From<InsertStatement> for Statement {
    fn from(statement: InsertStatement) -> Self {
        Statement::Insert(statement)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(statement: UpdateStatement) -> Self {
        Statement::Update(statement)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(statement: DeleteStatement) -> Self {
        Statement::Delete(statement)
    }
}

impl From<SelectStatement> for Statement {
    fn from(statement: SelectStatement) -> Self {
        Statement::Select(statement)
    }
}

/// Visitor protocol over relational statement trees.
///
/// One method per node kind. Methods report failure through their result but carry no
/// value back to the caller.
pub trait SqlAstWalker {
    fn visit_insert_statement(&mut self, statement: &InsertStatement) -> WalkResult;
    fn visit_update_statement(&mut self, statement: &UpdateStatement) -> WalkResult;
    fn visit_delete_statement(&mut self, statement: &DeleteStatement) -> WalkResult;
    fn visit_select_statement(&mut self, statement: &SelectStatement) -> WalkResult;

    fn visit_table_reference(&mut self, table: &TableReference) -> WalkResult;
    fn visit_table_join(&mut self, join: &TableJoin) -> WalkResult;

    fn visit_column_reference(&mut self, column: &ColumnReference) -> WalkResult;
    fn visit_literal(&mut self, value: &DomainValue) -> WalkResult;
    fn visit_parameter(&mut self, marker: &ParameterMarker) -> WalkResult;
    fn visit_null(&mut self) -> WalkResult;
    fn visit_function(&mut self, function: &FunctionCall) -> WalkResult;
    fn visit_arithmetic(&mut self, arithmetic: &ArithmeticExpression) -> WalkResult;

    fn visit_comparison(&mut self, comparison: &ComparisonPredicate) -> WalkResult;
    fn visit_junction(&mut self, junction: &Junction) -> WalkResult;
    fn visit_negated_predicate(&mut self, predicate: &Predicate) -> WalkResult;
    fn visit_grouped_predicate(&mut self, predicate: &Predicate) -> WalkResult;
    fn visit_nullness_predicate(&mut self, predicate: &NullnessPredicate) -> WalkResult;
    fn visit_in_list_predicate(&mut self, predicate: &InListPredicate) -> WalkResult;
    fn visit_like_predicate(&mut self, predicate: &LikePredicate) -> WalkResult;
    fn visit_between_predicate(&mut self, predicate: &BetweenPredicate) -> WalkResult;

    fn visit_assignment(&mut self, assignment: &Assignment) -> WalkResult;
    fn visit_values_list(&mut self, values: &ValuesList) -> WalkResult;
    fn visit_selection(&mut self, selection: &Selection) -> WalkResult;
    fn visit_sort_specification(&mut self, sort: &SortSpecification) -> WalkResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ComparisonOperator::LessThan, ComparisonOperator::GreaterThan)]
    #[test_case(ComparisonOperator::LessThanOrEqual, ComparisonOperator::GreaterThanOrEqual)]
    #[test_case(ComparisonOperator::GreaterThan, ComparisonOperator::LessThan)]
    #[test_case(ComparisonOperator::GreaterThanOrEqual, ComparisonOperator::LessThanOrEqual)]
    #[test_case(ComparisonOperator::Equal, ComparisonOperator::Equal)]
    #[test_case(ComparisonOperator::NotEqual, ComparisonOperator::NotEqual)]
    fn flip_swaps_operand_sides(operator: ComparisonOperator, flipped: ComparisonOperator) {
        assert_eq!(operator.flip(), flipped);
        assert_eq!(operator.flip().flip(), operator);
    }

    #[test]
    fn qualifier_matches_alias_or_table_name() {
        let table = TableReference::aliased("book", "b");

        assert!(table.is_qualified_by("b"));
        assert!(table.is_qualified_by("book"));
        assert!(!table.is_qualified_by("author"));
    }

    #[test]
    fn insert_rows_accumulate_in_order() {
        let insert = InsertStatement::new(TableReference::new("book"), [ColumnReference::new("title")])
            .row(ValuesList::new([Expression::literal("a")]))
            .row(ValuesList::new([Expression::literal("b")]));

        match insert.source {
            InsertSource::Values(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1].values[0], Expression::literal("b"));
            }
            InsertSource::Select(_) => panic!("expected VALUES source"),
        }
    }
}
