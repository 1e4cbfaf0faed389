//! Query evaluation for in-memory document filtering and ordering.
//!
//! Filters are evaluated field by field against the stored JSON record; ordering
//! compares values through [`Comparable`], which only orders values of the same
//! kind.

use serde_json::Value;
use std::{cmp::Ordering, collections::HashMap};

use docbridge_core::{
    document::RawFields,
    error::RemoteError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable view of a JSON value.
///
/// Numbers are normalized to f64. Timestamps stay strings; ISO-8601 strings in
/// one format order chronologically.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value.as_f64().map_or(Comparable::Null, Comparable::Number),
            Value::String(value) => Comparable::String(value),
            Value::Array(values) => Comparable::Array(values.iter().map(Comparable::from).collect()),
            Value::Object(map) => Comparable::Map(
                map.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compares one field of two records. Missing and null values sort first.
pub(crate) fn compare_field(left: &RawFields, right: &RawFields, field: &str) -> Ordering {
    let left = left.get(field).map_or(Comparable::Null, Comparable::from);
    let right = right.get(field).map_or(Comparable::Null, Comparable::from);

    match (&left, &right) {
        (Comparable::Null, Comparable::Null) => Ordering::Equal,
        (Comparable::Null, _) => Ordering::Less,
        (_, Comparable::Null) => Ordering::Greater,
        _ => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a RawFields,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a RawFields) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<bool, RemoteError> {
        self.visit_expr(expr)
    }

    /// Returns whether `document` matches every expression.
    pub fn matches_all(document: &'a RawFields, exprs: &[&Expr]) -> Result<bool, RemoteError> {
        let mut evaluator = DocumentEvaluator::new(document);

        for expr in exprs {
            if !evaluator.evaluate(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn any_shared(left: &Comparable<'_>, right: &Comparable<'_>) -> bool {
    match (left, right) {
        (Comparable::Array(items), Comparable::Array(values)) => {
            values.iter().any(|value| items.contains(value))
        }
        (Comparable::Array(items), single) | (single, Comparable::Array(items)) => {
            items.contains(single)
        }
        (left, right) => left == right,
    }
}

fn invalid_query(message: impl Into<String>) -> RemoteError {
    RemoteError::api(400, "general_query_invalid", message)
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = RemoteError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Err(invalid_query("or() requires at least one query"));
        }

        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, present: bool) -> Result<Self::Output, Self::Error> {
        let is_set = self.document.get(field).is_some_and(|value| !value.is_null());

        Ok(is_set == present)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Value) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.document.get(field) else {
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };
        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => match left.partial_cmp(&right) {
                Some(ordering) => match op {
                    FieldOp::Gt => ordering.is_gt(),
                    FieldOp::Gte => ordering.is_ge(),
                    FieldOp::Lt => ordering.is_lt(),
                    _ => ordering.is_le(),
                },
                None => false,
            },
            FieldOp::Contains | FieldOp::NotContains => {
                let contains = match (&left, &right) {
                    (Comparable::Array(items), needle) => items.contains(needle),
                    (Comparable::String(haystack), Comparable::String(needle)) => haystack.contains(needle),
                    _ => false,
                };
                contains == matches!(op, FieldOp::Contains)
            }
            FieldOp::StartsWith => match (&left, &right) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (&left, &right) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => any_shared(&left, &right),
            FieldOp::NoneOf => !any_shared(&left, &right),
        })
    }
}
