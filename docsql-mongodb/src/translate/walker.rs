use std::collections::HashSet;
use tracing::trace;

use docsql_core::{
    error::{DocSqlError, DocSqlResult, assert_true},
    metadata::{EntityMetadata, ID_FIELD_NAME},
    sql::{
        ArithmeticExpression, Assignment, BetweenPredicate, ColumnReference, ComparisonPredicate, DeleteStatement,
        FunctionCall, InListPredicate, InsertSource, InsertStatement, Junction, JunctionKind, LikePredicate,
        NullnessPredicate, ParameterMarker, Predicate, SelectStatement, Selection, SortOrder, SortSpecification,
        SqlAstWalker, TableJoin, TableReference, UpdateStatement, ValuesList, WalkResult,
    },
    value::{DomainValue, ValueCodec},
};

use crate::{
    ast::{
        AggregateCommand, AstDocument, AstValue, Command, DeleteCommand, Element, FieldPath, FieldUpdate, Filter,
        InsertCommand, Literal, ProjectionSpec, SortDirection, SortField, Stage, UpdateCommand,
    },
    translate::{MongoTranslator, Operand, comparison_operator},
};

impl<M, C> SqlAstWalker for MongoTranslator<M, C>
where
    M: EntityMetadata,
    C: ValueCodec,
{
    fn visit_insert_statement(&mut self, statement: &InsertStatement) -> WalkResult {
        trace!(table = %statement.target.table, "visiting insert statement");

        let rows = match &statement.source {
            InsertSource::Values(rows) => rows,
            InsertSource::Select(_) => return Err(DocSqlError::unsupported("INSERT ... SELECT")),
        };

        let command = self.with_scope(&statement.target, |translator| {
            let collection = translator.collection_of(&statement.target)?;
            let fields = statement
                .columns
                .iter()
                .map(|column| translator.field_of(column))
                .collect::<DocSqlResult<Vec<_>>>()?;

            let outer = std::mem::replace(&mut translator.insert_fields, fields);
            let documents = rows
                .iter()
                .map(|row| translator.produce::<AstDocument>(|translator| translator.visit_values_list(row)))
                .collect::<DocSqlResult<Vec<_>>>();
            translator.insert_fields = outer;

            InsertCommand::new(collection, documents?)
        })?;

        self.yield_value(Command::from(command))
    }

    fn visit_update_statement(&mut self, statement: &UpdateStatement) -> WalkResult {
        trace!(table = %statement.target.table, "visiting update statement");

        let command = self.with_scope(&statement.target, |translator| {
            let collection = translator.collection_of(&statement.target)?;
            let filter = translator.restriction_of(statement.restriction.as_ref())?;
            let updates = statement
                .assignments
                .iter()
                .map(|assignment| translator.produce::<FieldUpdate>(|translator| translator.visit_assignment(assignment)))
                .collect::<DocSqlResult<Vec<_>>>()?;

            {
                let mut assigned = HashSet::new();
                if let Some(update) = updates.iter().find(|update| !assigned.insert(update.field())) {
                    return Err(DocSqlError::unsupported(format!("field {} assigned twice in one update", update.field())));
                }
            }

            UpdateCommand::new(collection, filter, updates)
        })?;

        self.yield_value(Command::from(command))
    }

    fn visit_delete_statement(&mut self, statement: &DeleteStatement) -> WalkResult {
        trace!(table = %statement.target.table, "visiting delete statement");

        let command = self.with_scope(&statement.target, |translator| {
            let collection = translator.collection_of(&statement.target)?;
            let filter = translator.restriction_of(statement.restriction.as_ref())?;

            Ok(DeleteCommand::new(collection, filter))
        })?;

        self.yield_value(Command::from(command))
    }

    fn visit_select_statement(&mut self, statement: &SelectStatement) -> WalkResult {
        trace!(table = %statement.from.root.table, "visiting select statement");

        for join in &statement.from.joins {
            self.visit_table_join(join)?;
        }
        if !statement.group_by.is_empty() {
            return Err(DocSqlError::unsupported("GROUP BY"));
        }
        if statement.distinct {
            return Err(DocSqlError::unsupported("SELECT DISTINCT"));
        }

        let command = self.with_scope(&statement.from.root, |translator| {
            let collection = translator.collection_of(&statement.from.root)?;
            let mut pipeline = Vec::new();

            if let Some(restriction) = &statement.restriction {
                pipeline.push(Stage::filter(translator.filter_of(restriction)?));
            }

            let mut projected: Vec<ProjectionSpec> = Vec::new();
            for selection in &statement.selections {
                let spec = translator.produce::<ProjectionSpec>(|translator| translator.visit_selection(selection))?;
                if !projected.iter().any(|existing| existing.field() == spec.field()) {
                    projected.push(spec);
                }
            }
            if !projected.is_empty() && !projected.iter().any(|spec| spec.field().is_id()) {
                projected.push(ProjectionSpec::exclude(FieldPath::new(ID_FIELD_NAME)));
            }

            let mut sort_fields: Vec<SortField> = Vec::new();
            for sort in &statement.sort_specifications {
                let field = translator.produce::<SortField>(|translator| translator.visit_sort_specification(sort))?;
                let hidden = !projected.is_empty()
                    && !projected.iter().any(|spec| spec.is_included() && spec.field() == field.field());
                if hidden {
                    return Err(DocSqlError::unsupported(format!(
                        "ORDER BY {} which is not part of the selection",
                        field.field(),
                    )));
                }
                if !sort_fields.iter().any(|existing| existing.field() == field.field()) {
                    sort_fields.push(field);
                }
            }

            if !projected.is_empty() {
                pipeline.push(Stage::project(projected)?);
            }
            if !sort_fields.is_empty() {
                pipeline.push(Stage::sort(sort_fields)?);
            }
            if let Some(offset) = &statement.offset {
                pipeline.push(Stage::skip(translator.value_of(offset, "OFFSET")?)?);
            }
            if let Some(fetch) = &statement.fetch {
                pipeline.push(Stage::limit(translator.value_of(fetch, "FETCH")?)?);
            }

            Ok(AggregateCommand::new(collection, pipeline))
        })?;

        self.yield_value(Command::from(command))
    }

    fn visit_table_reference(&mut self, table: &TableReference) -> WalkResult {
        let collection = self.metadata.collection_name(&table.table)?.to_owned();
        self.yield_value(collection)
    }

    fn visit_table_join(&mut self, join: &TableJoin) -> WalkResult {
        Err(DocSqlError::unsupported(format!("{:?} join with table {}", join.join_type, join.table.table)))
    }

    fn visit_column_reference(&mut self, column: &ColumnReference) -> WalkResult {
        let Some(scope) = &self.scope else {
            return Err(DocSqlError::assertion(format!(
                "column {} referenced outside of a statement",
                column.column,
            )));
        };

        if let Some(qualifier) = &column.qualifier {
            if !scope.is_qualified_by(qualifier) {
                return Err(DocSqlError::unsupported(format!(
                    "column {qualifier}.{} from a table other than {}",
                    column.column, scope.table,
                )));
            }
        }

        let field = FieldPath::new(self.metadata.field_name(&scope.table, &column.column)?);
        self.yield_value(Operand::Field(field))
    }

    fn visit_literal(&mut self, value: &DomainValue) -> WalkResult {
        let literal = Literal::new(self.codec.to_wire(value)?)?;
        self.yield_value(Operand::Value(AstValue::Literal(literal)))
    }

    fn visit_parameter(&mut self, marker: &ParameterMarker) -> WalkResult {
        self.yield_value(Operand::Value(AstValue::placeholder(marker.position)))
    }

    fn visit_null(&mut self) -> WalkResult {
        Err(DocSqlError::unsupported("NULL literal"))
    }

    fn visit_function(&mut self, function: &FunctionCall) -> WalkResult {
        Err(DocSqlError::unsupported(format!("function {}", function.name)))
    }

    fn visit_arithmetic(&mut self, arithmetic: &ArithmeticExpression) -> WalkResult {
        Err(DocSqlError::unsupported(format!("arithmetic expression ({:?})", arithmetic.operator)))
    }

    fn visit_comparison(&mut self, comparison: &ComparisonPredicate) -> WalkResult {
        let operator = comparison_operator(comparison.operator)?;
        let left = self.operand_of(&comparison.left)?;
        let right = self.operand_of(&comparison.right)?;

        let filter = match (left, right) {
            (Operand::Field(field), Operand::Value(value)) => Filter::comparison(field, operator, value),
            // `? < year` is `year > ?`
            (Operand::Value(value), Operand::Field(field)) => {
                Filter::comparison(field, comparison_operator(comparison.operator.flip())?, value)
            }
            (Operand::Field(left), Operand::Field(right)) => {
                return Err(DocSqlError::unsupported(format!("comparison between columns {left} and {right}")));
            }
            (Operand::Value(_), Operand::Value(_)) => {
                return Err(DocSqlError::unsupported("comparison without a column"));
            }
        };

        self.yield_value(filter)
    }

    fn visit_junction(&mut self, junction: &Junction) -> WalkResult {
        let filters = junction
            .predicates
            .iter()
            .map(|predicate| self.filter_of(predicate))
            .collect::<DocSqlResult<Vec<_>>>()?;

        let filter = match junction.kind {
            JunctionKind::Conjunction => Filter::and(filters)?,
            JunctionKind::Disjunction => Filter::or(filters)?,
        };

        self.yield_value(filter)
    }

    fn visit_negated_predicate(&mut self, predicate: &Predicate) -> WalkResult {
        let inner = self.filter_of(predicate)?;
        self.yield_value(Filter::nor([inner])?)
    }

    fn visit_grouped_predicate(&mut self, predicate: &Predicate) -> WalkResult {
        // The inner predicate yields straight into the caller's scope.
        predicate.accept(self)
    }

    fn visit_nullness_predicate(&mut self, predicate: &NullnessPredicate) -> WalkResult {
        let check = if predicate.negated { "IS NOT NULL" } else { "IS NULL" };
        Err(DocSqlError::unsupported(format!("{check} predicate")))
    }

    fn visit_in_list_predicate(&mut self, predicate: &InListPredicate) -> WalkResult {
        let check = if predicate.negated { "NOT IN" } else { "IN" };
        Err(DocSqlError::unsupported(format!("{check} predicate")))
    }

    fn visit_like_predicate(&mut self, predicate: &LikePredicate) -> WalkResult {
        let check = if predicate.negated { "NOT LIKE" } else { "LIKE" };
        Err(DocSqlError::unsupported(format!("{check} predicate")))
    }

    fn visit_between_predicate(&mut self, predicate: &BetweenPredicate) -> WalkResult {
        let check = if predicate.negated { "NOT BETWEEN" } else { "BETWEEN" };
        Err(DocSqlError::unsupported(format!("{check} predicate")))
    }

    fn visit_assignment(&mut self, assignment: &Assignment) -> WalkResult {
        let field = self.field_of(&assignment.column)?;
        let identifier = match &self.scope {
            Some(scope) => self.metadata.is_identifier(&scope.table, &assignment.column.column)?,
            None => false,
        };

        if identifier || field.is_id() {
            return Err(DocSqlError::unsupported("assigning a new identifier in an update"));
        }

        let value = self.value_of(&assignment.value, "an assignment")?;
        self.yield_value(FieldUpdate::new(field, value))
    }

    fn visit_values_list(&mut self, values: &ValuesList) -> WalkResult {
        assert_true(values.values.len() == self.insert_fields.len(), || {
            format!("values list has {} values for {} columns", values.values.len(), self.insert_fields.len())
        })?;

        let fields = self.insert_fields.clone();
        let elements = fields
            .iter()
            .zip(&values.values)
            .map(|(field, expression)| -> DocSqlResult<Element> {
                Ok(Element::new(field.as_str(), self.value_of(expression, "an insert")?))
            })
            .collect::<DocSqlResult<Vec<_>>>()?;

        self.yield_value(AstDocument::new(elements)?)
    }

    fn visit_selection(&mut self, selection: &Selection) -> WalkResult {
        let field = self.column_field_of(&selection.expression, "selection")?;
        self.yield_value(ProjectionSpec::include(field))
    }

    fn visit_sort_specification(&mut self, sort: &SortSpecification) -> WalkResult {
        let field = self.column_field_of(&sort.expression, "ORDER BY")?;
        let direction = match sort.order {
            SortOrder::Ascending => SortDirection::Ascending,
            SortOrder::Descending => SortDirection::Descending,
        };

        self.yield_value(SortField::new(field, direction))
    }
}
