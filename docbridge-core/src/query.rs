//! Query tokens and filter expressions forwarded to document backends.
//!
//! A query set is a plain `Vec<Query>`. The client forwards it untouched, except
//! for [`paginated_list`](crate::client::DocumentClient::paginated_list), which
//! appends a [`Query::Limit`] and a [`Query::Offset`] token.
//!
//! Filters are [`Expr`] trees, usually built with [`Filter`]:
//!
//! ```ignore
//! use docbridge::query::{Filter, Query};
//!
//! let queries = vec![
//!     Query::filter(Filter::eq("status", "active").and(Filter::gt("priority", 2))),
//!     Query::order_desc("$createdAt"),
//!     Query::limit(10),
//! ];
//! ```
//!
//! Backends translate expressions through a [`QueryVisitor`]. Tokens a backend
//! has its own syntax for can be passed verbatim with [`Query::Raw`].

use serde_json::Value;
use std::fmt;

use crate::error::RemoteError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Comparison applied by an [`Expr::Field`] filter.
///
/// Ordering operators compare numbers numerically and strings lexically.
/// `Contains` works on strings (substring) and arrays (element). `AnyOf` and
/// `NoneOf` take an array of candidates; a scalar counts as a one-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    AnyOf,
    NoneOf,
}

impl FieldOp {
    /// The operator matching exactly the documents this one rejects, if one exists.
    ///
    /// Prefix and suffix matches have no complement in this set.
    pub fn negated(self) -> Option<FieldOp> {
        Some(match self {
            FieldOp::Eq => FieldOp::Ne,
            FieldOp::Ne => FieldOp::Eq,
            FieldOp::Gt => FieldOp::Lte,
            FieldOp::Gte => FieldOp::Lt,
            FieldOp::Lt => FieldOp::Gte,
            FieldOp::Lte => FieldOp::Gt,
            FieldOp::Contains => FieldOp::NotContains,
            FieldOp::NotContains => FieldOp::Contains,
            FieldOp::AnyOf => FieldOp::NoneOf,
            FieldOp::NoneOf => FieldOp::AnyOf,
            FieldOp::StartsWith | FieldOp::EndsWith => return None,
        })
    }
}

/// A predicate over a document's fields, carried by [`Query::Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `true` matches documents where the field holds a non-null value.
    Exists(String, bool),
    Field { field: String, op: FieldOp, value: Value },
}

impl Expr {
    pub fn field(field: impl Into<String>, op: FieldOp, value: impl Into<Value>) -> Self {
        Expr::Field { field: field.into(), op, value: value.into() }
    }

    /// Adds `other` to this conjunction, or starts one.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Adds `other` to this disjunction, or starts one.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// One token of a backend query set.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Keep only documents matching the expression.
    Filter(Expr),
    /// Sort ascending by a field.
    OrderAsc(String),
    /// Sort descending by a field.
    OrderDesc(String),
    /// Start after the document with this id.
    CursorAfter(String),
    /// End before the document with this id.
    CursorBefore(String),
    /// Return at most this many documents.
    Limit(usize),
    /// Skip this many documents.
    Offset(usize),
    /// Only return these fields.
    Select(Vec<String>),
    /// A backend-specific token, forwarded verbatim.
    Raw(String),
}

impl Query {
    pub fn filter(expr: Expr) -> Self {
        Query::Filter(expr)
    }

    pub fn order(field: impl Into<String>, direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Query::OrderAsc(field.into()),
            SortDirection::Desc => Query::OrderDesc(field.into()),
        }
    }

    pub fn order_asc(field: impl Into<String>) -> Self {
        Query::OrderAsc(field.into())
    }

    pub fn order_desc(field: impl Into<String>) -> Self {
        Query::OrderDesc(field.into())
    }

    pub fn cursor_after(id: impl Into<String>) -> Self {
        Query::CursorAfter(id.into())
    }

    pub fn cursor_before(id: impl Into<String>) -> Self {
        Query::CursorBefore(id.into())
    }

    pub fn limit(limit: usize) -> Self {
        Query::Limit(limit)
    }

    pub fn offset(offset: usize) -> Self {
        Query::Offset(offset)
    }

    pub fn select<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Select(fields.into_iter().map(Into::into).collect())
    }

    pub fn raw(token: impl Into<String>) -> Self {
        Query::Raw(token.into())
    }
}

impl From<Expr> for Query {
    fn from(expr: Expr) -> Self {
        Query::Filter(expr)
    }
}

impl From<&str> for Query {
    fn from(token: &str) -> Self {
        Query::Raw(token.to_string())
    }
}

impl From<String> for Query {
    fn from(token: String) -> Self {
        Query::Raw(token)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Filter(expr) => write!(f, "filter({expr:?})"),
            Query::OrderAsc(field) => write!(f, "orderAsc({field})"),
            Query::OrderDesc(field) => write!(f, "orderDesc({field})"),
            Query::CursorAfter(id) => write!(f, "cursorAfter({id})"),
            Query::CursorBefore(id) => write!(f, "cursorBefore({id})"),
            Query::Limit(limit) => write!(f, "limit({limit})"),
            Query::Offset(offset) => write!(f, "offset({offset})"),
            Query::Select(fields) => write!(f, "select({})", fields.join(", ")),
            Query::Raw(token) => f.write_str(token),
        }
    }
}

/// Shorthand constructors for [`Expr`].
///
/// ```ignore
/// use docbridge::query::Filter;
///
/// let overdue = Filter::lt("due", "2026-01-01").and(Filter::ne("status", "done"));
/// ```
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::Ne, value)
    }

    /// Field equals one of `values` (an array).
    pub fn any_of(field: impl Into<String>, values: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::AnyOf, values)
    }

    /// Field equals none of `values` (an array). Missing fields match.
    pub fn none_of(field: impl Into<String>, values: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::NoneOf, values)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::Lte, value)
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::StartsWith, prefix)
    }

    pub fn ends_with(field: impl Into<String>, suffix: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::EndsWith, suffix)
    }

    /// Substring of a string field, or element of an array field.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::Contains, value)
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Value>) -> Expr {
        Expr::field(field, FieldOp::NotContains, value)
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Field is missing or null.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// Walks an [`Expr`] tree, producing one backend-specific output per node.
///
/// Implementors handle each node kind; [`visit_expr`](Self::visit_expr)
/// dispatches. Errors surface to the client as remote faults.
pub trait QueryVisitor {
    type Output;
    type Error: Into<RemoteError>;

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Value) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str, present: bool) -> Result<Self::Output, Self::Error>;
    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    /// Receives the operand of the negation, not the `Not` node itself.
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
            Expr::Exists(field, present) => self.visit_exists(field, *present),
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(inner) => self.visit_not(inner),
        }
    }
}
