//! Filter evaluation for in-memory documents.
//!
//! Evaluates the MongoDB filter subset docsql produces: comparison operators
//! (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`), the logical combinators `$and`, `$or`
//! and `$nor`, implicit equality (`{"field": value}`) and the empty match-all filter.
//! Field names may be dotted paths into embedded documents.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docsql_core::error::{DocSqlError, DocSqlResult};

/// Comparable view of a BSON value.
///
/// Numbers are normalized to `f64` so `Int32(1)`, `Int64(1)` and `Double(1.0)` compare
/// equal, the way the server compares them.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Bytes(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Binary(binary) => Comparable::Bytes(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    /// Position of the value's type in the server's cross-type sort order.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Bytes(_) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
            Comparable::Other(_) => 10,
        }
    }

    /// Total order used by `$sort`: first by type, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted field path inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head)? {
            Bson::Document(embedded) => lookup(embedded, rest),
            _ => None,
        },
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `true` if the document satisfies every clause of `filter`.
    pub fn matches(&self, filter: &Document) -> DocSqlResult<bool> {
        for (key, condition) in filter {
            let satisfied = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in clauses(key, condition)? {
                        if !self.matches(clause)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                "$or" => self.any(key, condition)?,
                "$nor" => !self.any(key, condition)?,
                operator if operator.starts_with('$') => {
                    return Err(DocSqlError::Backend(format!("unsupported query operator {operator}")));
                }
                field => self.matches_field(field, condition)?,
            };

            if !satisfied {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Keeps the documents that satisfy `filter`, in their original order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> DocSqlResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).matches(filter)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    fn any(&self, key: &str, condition: &Bson) -> DocSqlResult<bool> {
        for clause in clauses(key, condition)? {
            if self.matches(clause)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn matches_field(&self, field: &str, condition: &Bson) -> DocSqlResult<bool> {
        let value = lookup(self.document, field);

        match condition {
            Bson::Document(operators) if operators.keys().next().is_some_and(|key| key.starts_with('$')) => {
                for (operator, operand) in operators {
                    if !compare(value, operator, operand)? {
                        return Ok(false);
                    }
                }

                Ok(true)
            }
            literal => compare(value, "$eq", literal),
        }
    }
}

fn clauses<'f>(key: &str, condition: &'f Bson) -> DocSqlResult<Vec<&'f Document>> {
    let Bson::Array(items) = condition else {
        return Err(DocSqlError::Backend(format!("{key} expects an array of filters")));
    };

    items
        .iter()
        .map(|item| {
            item.as_document()
                .ok_or_else(|| DocSqlError::Backend(format!("{key} expects an array of filters")))
        })
        .collect()
}

fn compare(value: Option<&Bson>, operator: &str, operand: &Bson) -> DocSqlResult<bool> {
    let Some(value) = value else {
        // A missing field only satisfies `$ne`.
        return match operator {
            "$eq" | "$gt" | "$gte" | "$lt" | "$lte" => Ok(false),
            "$ne" => Ok(true),
            other => Err(DocSqlError::Backend(format!("unsupported query operator {other}"))),
        };
    };

    let (left, right) = (Comparable::from(value), Comparable::from(operand));

    Ok(match operator {
        "$eq" => left == right,
        "$ne" => left != right,
        "$gt" => left.partial_cmp(&right) == Some(Ordering::Greater),
        "$gte" => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => left.partial_cmp(&right) == Some(Ordering::Less),
        "$lte" => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
        other => return Err(DocSqlError::Backend(format!("unsupported query operator {other}"))),
    })
}
