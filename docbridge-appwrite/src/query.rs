//! Query translation from docbridge tokens to Appwrite's JSON query syntax.
//!
//! Appwrite receives every query as a JSON object in a repeated `queries[]`
//! parameter, e.g. `{"method":"equal","attribute":"status","values":["active"]}`.
//! Negations are pushed down to the matching `not*` method (or through De
//! Morgan for `and`/`or`), since Appwrite has no generic `not`.

use serde_json::{Value, json};

use docbridge_core::{
    error::{RemoteError, RemoteResult},
    query::{Expr, FieldOp, Query, QueryVisitor},
};

/// Encodes one query token as the string sent in `queries[]`.
///
/// [`Query::Raw`] tokens are sent verbatim; they must already be Appwrite JSON.
pub fn encode_query(query: &Query) -> RemoteResult<String> {
    let value = match query {
        Query::Filter(expr) => AppwriteQueryTranslator.visit_expr(expr)?,
        Query::OrderAsc(field) => json!({ "method": "orderAsc", "attribute": field }),
        Query::OrderDesc(field) => json!({ "method": "orderDesc", "attribute": field }),
        Query::CursorAfter(id) => json!({ "method": "cursorAfter", "values": [id] }),
        Query::CursorBefore(id) => json!({ "method": "cursorBefore", "values": [id] }),
        Query::Limit(limit) => json!({ "method": "limit", "values": [limit] }),
        Query::Offset(offset) => json!({ "method": "offset", "values": [offset] }),
        Query::Select(fields) => json!({ "method": "select", "values": fields }),
        Query::Raw(token) => return Ok(token.clone()),
    };

    Ok(value.to_string())
}

/// Encodes a whole query set, preserving order.
pub fn encode_queries(queries: &[Query]) -> RemoteResult<Vec<String>> {
    queries.iter().map(encode_query).collect()
}

/// Translates filter expressions into Appwrite query objects.
pub(crate) struct AppwriteQueryTranslator;

fn values_of(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        other => Value::Array(vec![other.clone()]),
    }
}

fn attribute_query(method: &str, field: &str, value: &Value) -> Value {
    json!({ "method": method, "attribute": field, "values": values_of(value) })
}

impl AppwriteQueryTranslator {
    fn group(&mut self, method: &str, exprs: &[Expr], negate: bool) -> RemoteResult<Value> {
        if exprs.is_empty() {
            return Err(RemoteError::Other(format!("{method}() requires at least one query")));
        }

        let values = exprs
            .iter()
            .map(|expr| if negate { self.visit_not(expr) } else { self.visit_expr(expr) })
            .collect::<RemoteResult<Vec<_>>>()?;

        Ok(json!({ "method": method, "values": values }))
    }
}

impl QueryVisitor for AppwriteQueryTranslator {
    type Output = Value;
    type Error = RemoteError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        self.group("and", exprs, false)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        self.group("or", exprs, false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::Not(inner) => self.visit_expr(inner),
            Expr::And(exprs) => self.group("or", exprs, true),
            Expr::Or(exprs) => self.group("and", exprs, true),
            Expr::Exists(field, present) => self.visit_exists(field, !present),
            Expr::Field { field, op, value } => match op.negated() {
                Some(op) => self.visit_field(field, &op, value),
                None if *op == FieldOp::StartsWith => Ok(attribute_query("notStartsWith", field, value)),
                None => Ok(attribute_query("notEndsWith", field, value)),
            },
        }
    }

    fn visit_exists(&mut self, field: &str, present: bool) -> Result<Self::Output, Self::Error> {
        let method = if present { "isNotNull" } else { "isNull" };

        Ok(json!({ "method": method, "attribute": field }))
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Value) -> Result<Self::Output, Self::Error> {
        Ok(match op {
            FieldOp::Eq | FieldOp::AnyOf => attribute_query("equal", field, value),
            FieldOp::Ne => attribute_query("notEqual", field, value),
            FieldOp::Gt => attribute_query("greaterThan", field, value),
            FieldOp::Gte => attribute_query("greaterThanEqual", field, value),
            FieldOp::Lt => attribute_query("lessThan", field, value),
            FieldOp::Lte => attribute_query("lessThanEqual", field, value),
            FieldOp::Contains => attribute_query("contains", field, value),
            FieldOp::NotContains => attribute_query("notContains", field, value),
            FieldOp::StartsWith => attribute_query("startsWith", field, value),
            FieldOp::EndsWith => attribute_query("endsWith", field, value),
            FieldOp::NoneOf => match values_of(value) {
                Value::Array(values) if values.len() > 1 => json!({
                    "method": "and",
                    "values": values
                        .iter()
                        .map(|value| attribute_query("notEqual", field, value))
                        .collect::<Vec<_>>(),
                }),
                values => json!({ "method": "notEqual", "attribute": field, "values": values }),
            },
        })
    }
}
