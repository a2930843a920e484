//! Aggregation pipeline stages.

use std::collections::HashSet;
use bson::Bson;

use docsql_core::{
    error::{DocSqlError, DocSqlResult},
    writer::DocumentWriter,
};

use crate::ast::{AstValue, FieldPath, Filter, Render};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// The `1` / `-1` wire form of the direction.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    field: FieldPath,
    direction: SortDirection,
}

impl SortField {
    pub fn new(field: FieldPath, direction: SortDirection) -> Self {
        SortField { field, direction }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

impl Render for SortField {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.write_name(self.field.as_str())?;
        writer.write_int32(self.direction.as_i32())
    }
}

/// Includes or excludes one field in a `$project` stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSpec {
    field: FieldPath,
    include: bool,
}

impl ProjectionSpec {
    pub fn include(field: FieldPath) -> Self {
        ProjectionSpec { field, include: true }
    }

    pub fn exclude(field: FieldPath) -> Self {
        ProjectionSpec { field, include: false }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn is_included(&self) -> bool {
        self.include
    }
}

impl Render for ProjectionSpec {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.write_name(self.field.as_str())?;
        writer.write_boolean(self.include)
    }
}

/// One step of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Project(Vec<ProjectionSpec>),
    Sort(Vec<SortField>),
    Skip(AstValue),
    Limit(AstValue),
}

impl Stage {
    pub fn filter(filter: Filter) -> Self {
        Stage::Match(filter)
    }

    /// # Errors
    ///
    /// Returns an assertion error if `specs` is empty or names a field twice.
    pub fn project(specs: impl IntoIterator<Item = ProjectionSpec>) -> DocSqlResult<Self> {
        let specs = specs.into_iter().collect::<Vec<_>>();
        ensure_distinct("$project", specs.iter().map(ProjectionSpec::field))?;

        Ok(Stage::Project(specs))
    }

    /// # Errors
    ///
    /// Returns an assertion error if `fields` is empty or names a field twice.
    pub fn sort(fields: impl IntoIterator<Item = SortField>) -> DocSqlResult<Self> {
        let fields = fields.into_iter().collect::<Vec<_>>();
        ensure_distinct("$sort", fields.iter().map(SortField::field))?;

        Ok(Stage::Sort(fields))
    }

    /// # Errors
    ///
    /// Returns [`DocSqlError::FeatureNotSupported`] unless `count` is a non-negative
    /// integer literal or a placeholder.
    pub fn skip(count: AstValue) -> DocSqlResult<Self> {
        Ok(Stage::Skip(ensure_count("$skip", count, 0)?))
    }

    /// # Errors
    ///
    /// Returns [`DocSqlError::FeatureNotSupported`] unless `count` is a positive
    /// integer literal or a placeholder. The server rejects `{"$limit": 0}`.
    pub fn limit(count: AstValue) -> DocSqlResult<Self> {
        Ok(Stage::Limit(ensure_count("$limit", count, 1)?))
    }

    /// The stage operator, e.g. `$match`.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Project(_) => "$project",
            Stage::Sort(_) => "$sort",
            Stage::Skip(_) => "$skip",
            Stage::Limit(_) => "$limit",
        }
    }
}

pub(crate) fn ensure_distinct<'a>(stage: &str, fields: impl Iterator<Item = &'a FieldPath>) -> DocSqlResult<()> {
    let mut seen = HashSet::new();
    let mut empty = true;

    for field in fields {
        empty = false;
        if !seen.insert(field) {
            return Err(DocSqlError::assertion(format!("{stage} names field {field} twice")));
        }
    }

    if empty {
        return Err(DocSqlError::assertion(format!("{stage} needs at least one field")));
    }

    Ok(())
}

fn ensure_count(stage: &str, count: AstValue, minimum: i64) -> DocSqlResult<AstValue> {
    match &count {
        AstValue::Placeholder(_) => Ok(count),
        AstValue::Literal(literal) => match literal.value() {
            Bson::Int32(n) if i64::from(*n) >= minimum => Ok(count),
            Bson::Int64(n) if *n >= minimum => Ok(count),
            other => Err(DocSqlError::unsupported(format!("{stage} with value {other}"))),
        },
        AstValue::Document(_) => Err(DocSqlError::unsupported(format!("{stage} with a document value"))),
    }
}

impl Render for Stage {
    fn render<W: DocumentWriter + ?Sized>(&self, writer: &mut W) -> DocSqlResult<()> {
        writer.start_document()?;
        writer.write_name(self.name())?;
        match self {
            Stage::Match(filter) => filter.render(writer)?,
            Stage::Project(specs) => {
                writer.start_document()?;
                for spec in specs {
                    spec.render(writer)?;
                }
                writer.end_document()?;
            }
            Stage::Sort(fields) => {
                writer.start_document()?;
                for field in fields {
                    field.render(writer)?;
                }
                writer.end_document()?;
            }
            Stage::Skip(count) | Stage::Limit(count) => count.render(writer)?,
        }
        writer.end_document()
    }
}
