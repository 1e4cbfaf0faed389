//! In-memory implementation of the remote document API.
//!
//! Records are kept as JSON field maps in nested HashMaps behind an async-aware
//! read-write lock. The store mirrors the service's observable behavior closely
//! enough to develop and test against: `$`-prefixed metadata on every record,
//! the same status codes for missing and duplicate documents, and evaluation of
//! filter, ordering, cursor and pagination tokens.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use mea::rwlock::RwLock;
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use docbridge_core::{
    backend::{DocumentList, DocumentsApi},
    document::{ID_FIELD, RawFields},
    error::{RemoteError, RemoteResult},
    permission::Permission,
    query::{Expr, Query},
};

use crate::evaluator::{DocumentEvaluator, compare_field};

type CollectionMap = HashMap<String, RawFields>;
type DatabaseMap = HashMap<String, CollectionMap>;
type StoreMap = HashMap<String, DatabaseMap>;

const SEQUENCE_FIELD: &str = "$sequence";
const DEFAULT_LIMIT: usize = 25;
const MAX_ID_LEN: usize = 36;

#[derive(Debug, Default)]
struct State {
    databases: StoreMap,
    sequence: u64,
}

/// Thread-safe in-memory document API.
///
/// Clones share the same data, so a test can keep one handle for assertions
/// while a client owns another.
///
/// # Example
///
/// ```ignore
/// use docbridge_memory::InMemoryApi;
/// use docbridge::backend::DocumentsApi;
///
/// let api = InMemoryApi::new();
/// let data = serde_json::json!({ "title": "Write docs" }).as_object().cloned().unwrap();
///
/// let record = api.create_document("main", "tasks", "t1", data, None).await?;
/// assert_eq!(record["$id"], "t1");
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryApi {
    state: Arc<RwLock<State>>,
    auto_create: bool,
    default_limit: usize,
}

impl Default for InMemoryApi {
    fn default() -> Self {
        InMemoryApi::builder().build()
    }
}

impl InMemoryApi {
    /// Creates an empty store that creates collections on first write.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryApiBuilder {
        InMemoryApiBuilder::default()
    }

    /// Number of documents stored in a collection.
    pub async fn len(&self, database_id: &str, collection_id: &str) -> usize {
        self.state
            .read()
            .await
            .databases
            .get(database_id)
            .and_then(|collections| collections.get(collection_id))
            .map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self, database_id: &str, collection_id: &str) -> bool {
        self.len(database_id, collection_id).await == 0
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false)
}

fn document_not_found(id: &str) -> RemoteError {
    RemoteError::api(
        404,
        "document_not_found",
        format!("Document with the requested ID '{id}' could not be found."),
    )
}

fn collection_not_found(id: &str) -> RemoteError {
    RemoteError::api(
        404,
        "collection_not_found",
        format!("Collection with the requested ID '{id}' could not be found."),
    )
}

fn invalid_query(message: impl Into<String>) -> RemoteError {
    RemoteError::api(400, "general_query_invalid", message)
}

fn validate_id(id: &str) -> RemoteResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && !id.starts_with(['.', '-', '_'])
        && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        Err(RemoteError::api(
            400,
            "document_invalid_id",
            format!("Invalid document id '{id}': use up to {MAX_ID_LEN} characters a-z, A-Z, 0-9, period, hyphen and underscore, not starting with a special character."),
        ))
    }
}

fn validate_data(data: &RawFields) -> RemoteResult<()> {
    match data.keys().find(|key| key.starts_with('$')) {
        Some(key) => Err(RemoteError::api(
            400,
            "document_invalid_structure",
            format!("Invalid document structure: attribute '{key}' is reserved."),
        )),
        None => Ok(()),
    }
}

fn permissions_value(permissions: &[Permission]) -> Value {
    Value::Array(
        permissions
            .iter()
            .map(|permission| Value::String(permission.to_string()))
            .collect(),
    )
}

/// Keeps the selected fields and every `$` metadata field.
fn select(record: &RawFields, fields: &[String]) -> RawFields {
    record
        .iter()
        .filter(|(key, _)| key.starts_with('$') || fields.iter().any(|field| field == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// The list tokens, grouped by how they are applied.
#[derive(Default)]
struct ListPlan<'q> {
    filters: Vec<&'q Expr>,
    orders: Vec<(&'q str, bool)>,
    cursor_after: Option<&'q str>,
    cursor_before: Option<&'q str>,
    limit: Option<usize>,
    offset: usize,
    select: Option<&'q [String]>,
}

impl<'q> ListPlan<'q> {
    fn new(queries: &'q [Query]) -> RemoteResult<Self> {
        let mut plan = ListPlan::default();

        for query in queries {
            match query {
                Query::Filter(expr) => plan.filters.push(expr),
                Query::OrderAsc(field) => plan.orders.push((field.as_str(), true)),
                Query::OrderDesc(field) => plan.orders.push((field.as_str(), false)),
                Query::CursorAfter(id) => plan.cursor_after = Some(id.as_str()),
                Query::CursorBefore(id) => plan.cursor_before = Some(id.as_str()),
                Query::Limit(limit) => plan.limit = Some(*limit),
                Query::Offset(offset) => plan.offset = *offset,
                Query::Select(fields) => plan.select = Some(fields.as_slice()),
                Query::Raw(token) => {
                    return Err(invalid_query(format!("Invalid query: unsupported raw token '{token}'")));
                }
            }
        }

        if plan.cursor_after.is_some() && plan.cursor_before.is_some() {
            return Err(invalid_query("Invalid query: cursorAfter and cursorBefore are mutually exclusive"));
        }

        Ok(plan)
    }
}

fn cursor_position(records: &[&RawFields], id: &str) -> RemoteResult<usize> {
    records
        .iter()
        .position(|record| record.get(ID_FIELD).and_then(Value::as_str) == Some(id))
        .ok_or_else(|| {
            RemoteError::api(
                400,
                "general_cursor_not_found",
                format!("Cursor document with the requested ID '{id}' could not be found."),
            )
        })
}

#[async_trait]
impl DocumentsApi for InMemoryApi {
    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<RawFields> {
        let mut fields = None;
        for query in &queries {
            match query {
                Query::Select(selected) => fields = Some(selected.as_slice()),
                other => {
                    return Err(invalid_query(format!("Invalid query: '{other}' is not allowed when fetching one document")));
                }
            }
        }

        let state = self.state.read().await;
        let record = state
            .databases
            .get(database_id)
            .and_then(|collections| collections.get(collection_id))
            .and_then(|collection| collection.get(document_id))
            .ok_or_else(|| document_not_found(document_id))?;

        Ok(match fields {
            Some(fields) => select(record, fields),
            None => record.clone(),
        })
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: RawFields,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        validate_id(document_id)?;
        validate_data(&data)?;

        let mut state = self.state.write().await;
        state.sequence += 1;
        let sequence = state.sequence;

        let collections = state.databases.entry(database_id.to_string()).or_default();
        let collection = if self.auto_create {
            collections.entry(collection_id.to_string()).or_default()
        } else {
            collections
                .get_mut(collection_id)
                .ok_or_else(|| collection_not_found(collection_id))?
        };

        if collection.contains_key(document_id) {
            return Err(RemoteError::api(
                409,
                "document_already_exists",
                format!("Document with the requested ID '{document_id}' already exists."),
            ));
        }

        let timestamp = now();
        let mut record = data;
        record.insert(ID_FIELD.into(), json!(document_id));
        record.insert(SEQUENCE_FIELD.into(), json!(sequence));
        record.insert("$collectionId".into(), json!(collection_id));
        record.insert("$databaseId".into(), json!(database_id));
        record.insert("$createdAt".into(), json!(timestamp));
        record.insert("$updatedAt".into(), json!(timestamp));
        record.insert(
            "$permissions".into(),
            permissions_value(permissions.as_deref().unwrap_or_default()),
        );

        collection.insert(document_id.to_string(), record.clone());
        trace!(database_id, collection_id, document_id, "document stored");

        Ok(record)
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Option<RawFields>,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        if let Some(data) = &data {
            validate_data(data)?;
        }

        let mut state = self.state.write().await;
        let record = state
            .databases
            .get_mut(database_id)
            .and_then(|collections| collections.get_mut(collection_id))
            .and_then(|collection| collection.get_mut(document_id))
            .ok_or_else(|| document_not_found(document_id))?;

        record.extend(data.unwrap_or_default());
        if let Some(permissions) = permissions {
            record.insert("$permissions".into(), permissions_value(&permissions));
        }
        record.insert("$updatedAt".into(), json!(now()));
        trace!(database_id, collection_id, document_id, "document updated");

        Ok(record.clone())
    }

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RemoteResult<()> {
        let mut state = self.state.write().await;

        state
            .databases
            .get_mut(database_id)
            .and_then(|collections| collections.get_mut(collection_id))
            .and_then(|collection| collection.remove(document_id))
            .ok_or_else(|| document_not_found(document_id))?;
        trace!(database_id, collection_id, document_id, "document deleted");

        Ok(())
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<DocumentList> {
        let plan = ListPlan::new(&queries)?;

        let state = self.state.read().await;
        let collection = match state
            .databases
            .get(database_id)
            .and_then(|collections| collections.get(collection_id))
        {
            Some(collection) => collection,
            None if self.auto_create => return Ok(DocumentList::default()),
            None => return Err(collection_not_found(collection_id)),
        };

        let mut matched = Vec::with_capacity(collection.len());
        for record in collection.values() {
            if DocumentEvaluator::matches_all(record, &plan.filters)? {
                matched.push(record);
            }
        }

        matched.sort_by(|a, b| compare_field(a, b, SEQUENCE_FIELD));
        for (field, ascending) in plan.orders.iter().rev() {
            matched.sort_by(|a, b| {
                let ordering = compare_field(a, b, field);
                if *ascending { ordering } else { ordering.reverse() }
            });
        }

        let total = matched.len() as u64;
        let limit = plan.limit.unwrap_or(self.default_limit);

        let window: Vec<&RawFields> = match (plan.cursor_after, plan.cursor_before) {
            (_, Some(id)) => {
                let end = cursor_position(&matched, id)?.saturating_sub(plan.offset);
                let start = end.saturating_sub(limit);
                matched[start..end].to_vec()
            }
            (Some(id), None) => {
                let start = cursor_position(&matched, id)? + 1;
                matched.into_iter().skip(start.saturating_add(plan.offset)).take(limit).collect()
            }
            (None, None) => matched.into_iter().skip(plan.offset).take(limit).collect(),
        };

        let documents = window
            .into_iter()
            .map(|record| match plan.select {
                Some(fields) => select(record, fields),
                None => record.clone(),
            })
            .collect();

        Ok(DocumentList { total, documents })
    }
}

/// Builder for [`InMemoryApi`].
///
/// # Example
///
/// ```ignore
/// let api = InMemoryApi::builder()
///     .auto_create_collections(false)
///     .collection("main", "tasks")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryApiBuilder {
    auto_create: bool,
    default_limit: usize,
    collections: Vec<(String, String)>,
}

impl Default for InMemoryApiBuilder {
    fn default() -> Self {
        Self {
            auto_create: true,
            default_limit: DEFAULT_LIMIT,
            collections: Vec::new(),
        }
    }
}

impl InMemoryApiBuilder {
    /// Whether writing to an unknown collection creates it. When disabled,
    /// unknown collections answer 404.
    pub fn auto_create_collections(mut self, enabled: bool) -> Self {
        self.auto_create = enabled;
        self
    }

    /// Number of documents a list returns when no limit token is given.
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Registers an empty collection up front.
    pub fn collection(mut self, database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        self.collections.push((database_id.into(), collection_id.into()));
        self
    }

    pub fn build(self) -> InMemoryApi {
        let mut state = State::default();
        for (database_id, collection_id) in self.collections {
            state
                .databases
                .entry(database_id)
                .or_default()
                .entry(collection_id)
                .or_default();
        }

        InMemoryApi {
            state: Arc::new(RwLock::new(state)),
            auto_create: self.auto_create,
            default_limit: self.default_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbridge_core::{permission::Role, query::Filter};

    fn fields(value: Value) -> RawFields {
        value.as_object().cloned().unwrap()
    }

    async fn seeded() -> InMemoryApi {
        let api = InMemoryApi::new();
        for (id, title, priority) in [("a", "alpha", 2), ("b", "beta", 1), ("c", "gamma", 3), ("d", "delta", 2)] {
            api.create_document("main", "tasks", id, fields(json!({ "title": title, "priority": priority })), None)
                .await
                .unwrap();
        }
        api
    }

    fn ids(list: &DocumentList) -> Vec<&str> {
        list.documents
            .iter()
            .map(|record| record[ID_FIELD].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn create_adds_metadata() {
        let api = InMemoryApi::new();

        let record = api
            .create_document(
                "main",
                "tasks",
                "t1",
                fields(json!({ "title": "write" })),
                Some(vec![Permission::read(Role::Any)]),
            )
            .await
            .unwrap();

        assert_eq!(record["$id"], "t1");
        assert_eq!(record["$collectionId"], "tasks");
        assert_eq!(record["$databaseId"], "main");
        assert_eq!(record["$permissions"], json!([r#"read("any")"#]));
        assert_eq!(record["$createdAt"], record["$updatedAt"]);
        assert_eq!(record["title"], "write");
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let api = seeded().await;

        let err = api
            .create_document("main", "tasks", "a", RawFields::new(), None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn rejects_invalid_ids_and_reserved_fields() {
        let api = InMemoryApi::new();

        let bad_id = api.create_document("main", "tasks", "_hidden", RawFields::new(), None).await;
        let reserved = api
            .create_document("main", "tasks", "t1", fields(json!({ "$id": "other" })), None)
            .await;

        assert_eq!(bad_id.unwrap_err().status(), Some(400));
        assert_eq!(reserved.unwrap_err().status(), Some(400));
    }

    #[tokio::test]
    async fn missing_documents_are_not_found() {
        let api = seeded().await;

        for err in [
            api.get_document("main", "tasks", "zz", vec![]).await.unwrap_err(),
            api.update_document("main", "tasks", "zz", None, None).await.unwrap_err(),
            api.delete_document("main", "tasks", "zz").await.unwrap_err(),
        ] {
            assert_eq!(err.status(), Some(404));
        }
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_permissions_when_omitted() {
        let api = InMemoryApi::new();
        api.create_document("main", "tasks", "t1", fields(json!({ "title": "a", "done": false })), Some(Permission::open()))
            .await
            .unwrap();

        let record = api
            .update_document("main", "tasks", "t1", Some(fields(json!({ "done": true }))), None)
            .await
            .unwrap();

        assert_eq!(record["title"], "a");
        assert_eq!(record["done"], true);
        assert_eq!(record["$permissions"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn update_replaces_permissions_when_given() {
        let api = InMemoryApi::new();
        api.create_document("main", "tasks", "t1", RawFields::new(), Some(Permission::open()))
            .await
            .unwrap();

        let record = api
            .update_document("main", "tasks", "t1", None, Some(vec![Permission::read(Role::Users)]))
            .await
            .unwrap();

        assert_eq!(record["$permissions"], json!([r#"read("users")"#]));
    }

    #[tokio::test]
    async fn lists_in_insertion_order_by_default() {
        let list = seeded().await.list_documents("main", "tasks", vec![]).await.unwrap();

        assert_eq!(list.total, 4);
        assert_eq!(ids(&list), vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn filters_orders_and_pages() {
        let api = seeded().await;

        let list = api
            .list_documents(
                "main",
                "tasks",
                vec![
                    Query::filter(Filter::gte("priority", 2)),
                    Query::order_desc("priority"),
                    Query::order_asc("title"),
                    Query::limit(2),
                    Query::offset(1),
                ],
            )
            .await
            .unwrap();

        assert_eq!(list.total, 3);
        assert_eq!(ids(&list), vec!["a", "d"]);
    }

    #[tokio::test]
    async fn cursors_page_around_a_document() {
        let api = seeded().await;

        let after = api
            .list_documents("main", "tasks", vec![Query::cursor_after("b"), Query::limit(1)])
            .await
            .unwrap();
        let before = api
            .list_documents("main", "tasks", vec![Query::cursor_before("d"), Query::limit(2)])
            .await
            .unwrap();

        assert_eq!(ids(&after), vec!["c"]);
        assert_eq!(ids(&before), vec!["b", "c"]);
        assert_eq!(after.total, 4);
    }

    #[tokio::test]
    async fn offsets_past_the_end_return_an_empty_window() {
        let api = seeded().await;

        let after = api
            .list_documents("main", "tasks", vec![Query::cursor_after("a"), Query::offset(usize::MAX)])
            .await
            .unwrap();
        let plain = api
            .list_documents("main", "tasks", vec![Query::offset(usize::MAX), Query::limit(usize::MAX)])
            .await
            .unwrap();

        assert!(after.documents.is_empty());
        assert!(plain.documents.is_empty());
        assert_eq!(after.total, 4);
    }

    #[tokio::test]
    async fn select_keeps_metadata() {
        let api = seeded().await;

        let record = api
            .get_document("main", "tasks", "a", vec![Query::select(["title"])])
            .await
            .unwrap();

        assert_eq!(record["title"], "alpha");
        assert!(record.get("priority").is_none());
        assert_eq!(record["$id"], "a");
    }

    #[tokio::test]
    async fn raw_tokens_are_rejected() {
        let api = seeded().await;

        let err = api
            .list_documents("main", "tasks", vec![Query::raw("status=active")])
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn default_limit_applies() {
        let api = InMemoryApi::builder().default_limit(2).build();
        for id in ["a", "b", "c"] {
            api.create_document("main", "tasks", id, RawFields::new(), None).await.unwrap();
        }

        let list = api.list_documents("main", "tasks", vec![]).await.unwrap();

        assert_eq!(list.total, 3);
        assert_eq!(list.documents.len(), 2);
    }

    #[tokio::test]
    async fn unknown_collections_are_not_found_without_auto_create() {
        let api = InMemoryApi::builder()
            .auto_create_collections(false)
            .collection("main", "tasks")
            .build();

        let unknown = api.create_document("main", "notes", "n1", RawFields::new(), None).await;
        let known = api.create_document("main", "tasks", "t1", RawFields::new(), None).await;

        assert_eq!(unknown.unwrap_err().status(), Some(404));
        assert!(known.is_ok());
        assert_eq!(api.len("main", "tasks").await, 1);
    }
}
