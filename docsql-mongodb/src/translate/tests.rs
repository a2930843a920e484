use bson::{Bson, doc};
use test_case::test_case;

use docsql_core::{
    error::DocSqlError,
    metadata::{EntityMetadata, MappingMetadata, TableMapping},
    sql::{
        self, Assignment, ColumnReference, DeleteStatement, Expression, FromClause, InsertSource, InsertStatement,
        JoinType, Predicate, SelectStatement, SortOrder, Statement, TableJoin, TableReference, UpdateStatement,
        ValuesList,
    },
    value::DefaultValueCodec,
};

use super::*;

fn metadata() -> MappingMetadata {
    MappingMetadata::new()
        .with_table(
            TableMapping::new("book", "books")
                .id_column("id")
                .column("title", "title")
                .column("publication_year", "year")
                .column("author", "author")
                .column("isbn", "isbn"),
        )
        .with_table(TableMapping::new("author", "authors").id_column("id").column("name", "name"))
}

fn translate(statement: impl Into<Statement>) -> DocSqlResult<bson::Document> {
    MongoTranslator::new(metadata(), DefaultValueCodec).translate(&statement.into())?.to_document()
}

fn book() -> TableReference {
    TableReference::new("book")
}

fn year_equals(year: i32) -> Predicate {
    Predicate::comparison(Expression::column("publication_year"), sql::ComparisonOperator::Equal, Expression::literal(year))
}

fn id_equals(id: i32) -> Predicate {
    Predicate::comparison(Expression::column("id"), sql::ComparisonOperator::Equal, Expression::literal(id))
}

#[test]
fn insert_keeps_declared_column_order() {
    let insert = InsertStatement::new(
        book(),
        [ColumnReference::new("title"), ColumnReference::new("publication_year"), ColumnReference::new("id")],
    )
    .row(ValuesList::new([Expression::literal("War and Peace"), Expression::literal(1867), Expression::parameter(0)]));

    let document = translate(insert).unwrap();

    assert_eq!(
        document,
        doc! {
            "insert": "books",
            "documents": [{ "title": "War and Peace", "year": 1867, "_id": Bson::Undefined }],
        },
    );

    let inserted = document.get_array("documents").unwrap()[0].as_document().unwrap();
    assert_eq!(inserted.keys().collect::<Vec<_>>(), ["title", "year", "_id"]);
}

#[test]
fn insert_translates_every_row() {
    let insert = InsertStatement::new(book(), [ColumnReference::new("isbn"), ColumnReference::new("title")])
        .row(ValuesList::new([Expression::literal("978-0"), Expression::literal("Anna Karenina")]))
        .row(ValuesList::new([Expression::parameter(0), Expression::parameter(1)]));

    assert_eq!(
        translate(insert).unwrap(),
        doc! {
            "insert": "books",
            "documents": [
                { "isbn": "978-0", "title": "Anna Karenina" },
                { "isbn": Bson::Undefined, "title": Bson::Undefined },
            ],
        },
    );
}

#[test]
fn insert_row_with_wrong_arity_is_an_assertion() {
    let insert = InsertStatement::new(book(), [ColumnReference::new("title"), ColumnReference::new("isbn")])
        .row(ValuesList::new([Expression::literal("War and Peace")]));

    assert!(translate(insert).unwrap_err().is_assertion());
}

#[test]
fn insert_from_select_is_not_supported() {
    let insert = InsertStatement {
        target: book(),
        columns: vec![ColumnReference::new("title")],
        source: InsertSource::Select(Box::new(SelectStatement::new(book(), [Expression::column("title")]))),
    };

    assert!(translate(insert).unwrap_err().is_feature_not_supported());
}

#[test]
fn delete_by_identifier() {
    let translated = MongoTranslator::new(metadata(), DefaultValueCodec)
        .translate(&DeleteStatement::new(book()).restriction(id_equals(12345)).into())
        .unwrap();

    match &translated {
        Command::Delete(delete) => assert!(delete.is_single_document()),
        other => panic!("expected a delete command, got {other:?}"),
    }
    assert_eq!(
        translated.to_document().unwrap(),
        doc! { "delete": "books", "deletes": [{ "q": { "_id": { "$eq": 12345 } }, "limit": 0 }] },
    );
}

#[test]
fn delete_without_restriction_matches_everything() {
    assert_eq!(
        translate(DeleteStatement::new(book())).unwrap(),
        doc! { "delete": "books", "deletes": [{ "q": {}, "limit": 0 }] },
    );
}

#[test]
fn select_with_where_projection_and_order() {
    let select = SelectStatement::new(book(), [Expression::column("title"), Expression::column("publication_year")])
        .restriction(Predicate::comparison(
            Expression::column("publication_year"),
            sql::ComparisonOperator::GreaterThan,
            Expression::parameter(0),
        ))
        .order_by(Expression::column("publication_year"), SortOrder::Descending);

    let document = translate(select).unwrap();

    assert_eq!(
        document,
        doc! {
            "aggregate": "books",
            "pipeline": [
                { "$match": { "year": { "$gt": Bson::Undefined } } },
                { "$project": { "title": true, "year": true, "_id": false } },
                { "$sort": { "year": -1 } },
            ],
        },
    );
}

#[test]
fn select_with_offset_and_fetch_appends_skip_and_limit() {
    let select = SelectStatement::new(book(), [Expression::column("id"), Expression::column("title")])
        .order_by(Expression::column("title"), SortOrder::Ascending)
        .offset(Expression::parameter(0))
        .fetch(Expression::literal(10));

    let document = translate(select).unwrap();
    let stages = document
        .get_array("pipeline")
        .unwrap()
        .iter()
        .map(|stage| stage.as_document().unwrap().keys().next().unwrap().clone())
        .collect::<Vec<_>>();

    assert_eq!(stages, ["$project", "$sort", "$skip", "$limit"]);
    assert_eq!(document.get_array("pipeline").unwrap()[0], Bson::Document(doc! { "$project": { "_id": true, "title": true } }));
    assert_eq!(document.get_array("pipeline").unwrap()[3], Bson::Document(doc! { "$limit": 10 }));
}

#[test]
fn select_without_clauses_has_an_empty_pipeline() {
    assert_eq!(
        translate(SelectStatement::new(book(), [])).unwrap(),
        doc! { "aggregate": "books", "pipeline": [] },
    );
}

#[test]
fn repeated_selections_are_projected_once() {
    let select = SelectStatement::new(book(), [Expression::column("title"), Expression::qualified_column("book", "title")]);

    assert_eq!(
        translate(select).unwrap(),
        doc! { "aggregate": "books", "pipeline": [{ "$project": { "title": true, "_id": false } }] },
    );
}

#[test]
fn ordering_by_an_unselected_column_is_not_supported() {
    let select = SelectStatement::new(book(), [Expression::column("title")])
        .order_by(Expression::column("publication_year"), SortOrder::Ascending);

    assert!(translate(select).unwrap_err().is_feature_not_supported());
}

#[test]
fn update_multi_flag_follows_identifier_equality() {
    let set_title = || Assignment::new("title", Expression::literal("Anna Karenina"));

    let broad = translate(UpdateStatement::new(book(), [set_title()]).restriction(year_equals(1877))).unwrap();
    assert_eq!(
        broad,
        doc! {
            "update": "books",
            "updates": [{
                "q": { "year": { "$eq": 1877 } },
                "u": { "$set": { "title": "Anna Karenina" } },
                "multi": true,
            }],
        },
    );

    let single = translate(UpdateStatement::new(book(), [set_title()]).restriction(id_equals(7))).unwrap();
    assert_eq!(
        single,
        doc! {
            "update": "books",
            "updates": [{
                "q": { "_id": { "$eq": 7 } },
                "u": { "$set": { "title": "Anna Karenina" } },
                "multi": false,
            }],
        },
    );
}

#[test]
fn update_of_the_identifier_is_not_supported() {
    let update = UpdateStatement::new(book(), [Assignment::new("id", Expression::literal(1))]);

    assert!(translate(update).unwrap_err().is_feature_not_supported());
}

#[test]
fn update_assigning_a_column_twice_is_not_supported() {
    let update = UpdateStatement::new(
        book(),
        [Assignment::new("title", Expression::literal("a")), Assignment::new("title", Expression::literal("b"))],
    )
    .restriction(id_equals(1));

    assert!(translate(update).unwrap_err().is_feature_not_supported());
}

/// Maps `isbn` as the identifier column without renaming it to `_id`.
struct IsbnKeyed(MappingMetadata);

impl EntityMetadata for IsbnKeyed {
    fn collection_name(&self, table: &str) -> DocSqlResult<&str> {
        self.0.collection_name(table)
    }

    fn field_name(&self, table: &str, column: &str) -> DocSqlResult<&str> {
        self.0.field_name(table, column)
    }

    fn is_identifier(&self, table: &str, column: &str) -> DocSqlResult<bool> {
        Ok(table == "book" && column == "isbn")
    }
}

#[test]
fn update_of_an_identifier_column_is_not_supported_whatever_its_field_name() {
    let mut translator = MongoTranslator::new(IsbnKeyed(metadata()), DefaultValueCodec);

    let rekey = UpdateStatement::new(book(), [Assignment::new("isbn", Expression::literal("978-1"))]);
    assert!(translator.translate(&rekey.into()).unwrap_err().is_feature_not_supported());

    let retitle = UpdateStatement::new(book(), [Assignment::new("title", Expression::literal("Resurrection"))]);
    assert!(translator.translate(&retitle.into()).is_ok());
}

#[test]
fn update_without_assignments_is_an_assertion() {
    assert!(translate(UpdateStatement::new(book(), [])).unwrap_err().is_assertion());
}

#[test_case(sql::ComparisonOperator::Equal, "$eq")]
#[test_case(sql::ComparisonOperator::NotEqual, "$ne")]
#[test_case(sql::ComparisonOperator::GreaterThan, "$gt")]
#[test_case(sql::ComparisonOperator::GreaterThanOrEqual, "$gte")]
#[test_case(sql::ComparisonOperator::LessThan, "$lt")]
#[test_case(sql::ComparisonOperator::LessThanOrEqual, "$lte")]
fn comparison_operators_map_to_query_operators(operator: sql::ComparisonOperator, token: &str) {
    let delete = DeleteStatement::new(book())
        .restriction(Predicate::comparison(Expression::column("publication_year"), operator, Expression::literal(1867)));

    assert_eq!(
        translate(delete).unwrap(),
        doc! { "delete": "books", "deletes": [{ "q": { "year": { token: 1867 } }, "limit": 0 }] },
    );
}

#[test_case(sql::ComparisonOperator::LessThan, "$gt")]
#[test_case(sql::ComparisonOperator::GreaterThanOrEqual, "$lte")]
#[test_case(sql::ComparisonOperator::Equal, "$eq")]
fn value_on_the_left_flips_the_operator(operator: sql::ComparisonOperator, token: &str) {
    let delete = DeleteStatement::new(book())
        .restriction(Predicate::comparison(Expression::literal(1867), operator, Expression::column("publication_year")));

    assert_eq!(
        translate(delete).unwrap(),
        doc! { "delete": "books", "deletes": [{ "q": { "year": { token: 1867 } }, "limit": 0 }] },
    );
}

#[test]
fn junctions_keep_their_children_in_order() {
    let delete = DeleteStatement::new(book()).restriction(Predicate::and([
        year_equals(1867),
        Predicate::grouped(Predicate::or([id_equals(1), id_equals(2)])),
    ]));

    assert_eq!(
        translate(delete).unwrap(),
        doc! {
            "delete": "books",
            "deletes": [{
                "q": { "$and": [
                    { "year": { "$eq": 1867 } },
                    { "$or": [{ "_id": { "$eq": 1 } }, { "_id": { "$eq": 2 } }] },
                ] },
                "limit": 0,
            }],
        },
    );
}

#[test]
fn negation_renders_as_nor_of_one_filter() {
    let delete = DeleteStatement::new(book()).restriction(Predicate::not(year_equals(1867)));

    assert_eq!(
        translate(delete).unwrap(),
        doc! { "delete": "books", "deletes": [{ "q": { "$nor": [{ "year": { "$eq": 1867 } }] }, "limit": 0 }] },
    );
}

#[test]
fn empty_junction_is_an_assertion() {
    let delete = DeleteStatement::new(book()).restriction(Predicate::and([]));

    assert!(translate(delete).unwrap_err().is_assertion());
}

#[test]
fn qualified_columns_resolve_against_alias() {
    let delete = DeleteStatement::new(TableReference::aliased("book", "b")).restriction(Predicate::comparison(
        Expression::qualified_column("b", "title"),
        sql::ComparisonOperator::Equal,
        Expression::parameter(0),
    ));

    assert_eq!(
        translate(delete).unwrap(),
        doc! { "delete": "books", "deletes": [{ "q": { "title": { "$eq": Bson::Undefined } }, "limit": 0 }] },
    );
}

#[test]
fn columns_of_other_tables_are_not_supported() {
    let delete = DeleteStatement::new(book()).restriction(Predicate::comparison(
        Expression::qualified_column("author", "name"),
        sql::ComparisonOperator::Equal,
        Expression::literal("Tolstoy"),
    ));

    assert!(translate(delete).unwrap_err().is_feature_not_supported());
}

#[test]
fn unmapped_names_are_metadata_errors() {
    assert!(matches!(translate(DeleteStatement::new(TableReference::new("shelf"))), Err(DocSqlError::Metadata(_))));

    let delete = DeleteStatement::new(book()).restriction(Predicate::comparison(
        Expression::column("pages"),
        sql::ComparisonOperator::Equal,
        Expression::literal(100),
    ));
    assert!(matches!(translate(delete), Err(DocSqlError::Metadata(_))));
}

#[test_case(sql::ComparisonOperator::DistinctFrom ; "is distinct from")]
#[test_case(sql::ComparisonOperator::NotDistinctFrom ; "is not distinct from")]
fn distinct_comparisons_are_not_supported(operator: sql::ComparisonOperator) {
    let delete = DeleteStatement::new(book())
        .restriction(Predicate::comparison(Expression::column("title"), operator, Expression::literal("x")));

    assert!(translate(delete).unwrap_err().is_feature_not_supported());
}

fn restricted_by(predicate: Predicate) -> DocSqlResult<bson::Document> {
    translate(DeleteStatement::new(book()).restriction(predicate))
}

#[test]
fn unsupported_predicates_and_expressions() {
    let title = || Expression::column("title");

    let cases = [
        Predicate::Nullness(sql::NullnessPredicate { expression: title(), negated: false }),
        Predicate::InList(sql::InListPredicate { expression: title(), list: vec![Expression::literal("a")], negated: false }),
        Predicate::Like(sql::LikePredicate { expression: title(), pattern: Expression::literal("War%"), negated: true }),
        Predicate::Between(sql::BetweenPredicate {
            expression: Expression::column("publication_year"),
            lower: Expression::literal(1800),
            upper: Expression::literal(1900),
            negated: false,
        }),
        Predicate::comparison(title(), sql::ComparisonOperator::Equal, Expression::Null),
        Predicate::comparison(
            title(),
            sql::ComparisonOperator::Equal,
            Expression::Function(sql::FunctionCall { name: "upper".into(), arguments: vec![Expression::literal("x")] }),
        ),
        Predicate::comparison(
            Expression::column("publication_year"),
            sql::ComparisonOperator::Equal,
            Expression::Arithmetic(sql::ArithmeticExpression {
                left: Box::new(Expression::literal(1800)),
                operator: sql::ArithmeticOperator::Add,
                right: Box::new(Expression::literal(67)),
            }),
        ),
        Predicate::comparison(title(), sql::ComparisonOperator::Equal, Expression::column("isbn")),
        Predicate::comparison(Expression::literal(1), sql::ComparisonOperator::Equal, Expression::literal(1)),
    ];

    for predicate in cases {
        let error = restricted_by(predicate.clone()).unwrap_err();
        assert!(error.is_feature_not_supported(), "{predicate:?} failed with {error}");
    }
}

#[test]
fn unsupported_select_shapes() {
    let mut joined = SelectStatement::new(book(), [Expression::column("title")]);
    joined.from = FromClause {
        root: book(),
        joins: vec![TableJoin { join_type: JoinType::Inner, table: TableReference::new("author"), predicate: None }],
    };

    let mut grouped = SelectStatement::new(book(), [Expression::column("author")]);
    grouped.group_by = vec![Expression::column("author")];

    let mut distinct = SelectStatement::new(book(), [Expression::column("author")]);
    distinct.distinct = true;

    let computed = SelectStatement::new(book(), [Expression::literal(1)]);

    for select in [joined, grouped, distinct, computed] {
        assert!(translate(select).unwrap_err().is_feature_not_supported());
    }
}

#[test]
fn fetch_of_zero_rows_is_not_supported() {
    let select = SelectStatement::new(book(), [Expression::column("title")]).fetch(Expression::literal(0));

    assert!(translate(select).unwrap_err().is_feature_not_supported());

    let skip_none = SelectStatement::new(book(), [Expression::column("title")]).offset(Expression::literal(0));
    assert_eq!(
        translate(skip_none).unwrap().get_array("pipeline").unwrap()[1],
        Bson::Document(doc! { "$skip": 0 }),
    );
}

#[test]
fn string_fetch_is_not_supported() {
    let select = SelectStatement::new(book(), [Expression::column("title")]).fetch(Expression::literal("ten"));

    assert!(translate(select).unwrap_err().is_feature_not_supported());
}

#[test]
fn translator_is_reusable_after_a_failure() {
    let mut translator = MongoTranslator::new(metadata(), DefaultValueCodec);

    let failing = DeleteStatement::new(book()).restriction(Predicate::comparison(
        Expression::column("title"),
        sql::ComparisonOperator::Equal,
        Expression::Null,
    ));
    assert!(translator.translate(&failing.into()).is_err());

    let command = translator.translate(&DeleteStatement::new(book()).restriction(id_equals(1)).into()).unwrap();
    assert_eq!(command.collection(), "books");
    assert_eq!(translator.exchange.depth(), 0);
    assert!(translator.scope.is_none());
}

#[test]
fn rendering_twice_is_byte_identical() {
    let statement: Statement = SelectStatement::new(book(), [Expression::column("title")])
        .restriction(year_equals(1867))
        .into();
    let command = MongoTranslator::new(metadata(), DefaultValueCodec).translate(&statement).unwrap();

    assert_eq!(command.to_bytes().unwrap(), command.to_bytes().unwrap());
}
