//! Typed client for one remote collection.
//!
//! A [`DocumentClient`] forwards each operation to a [`DocumentsApi`] and wraps
//! the call in the same pipeline:
//!
//! 1. ask the [`ConnectivityProbe`]; offline short-circuits with
//!    [`Failure::NoInternetConnection`],
//! 2. encode the document (create and update) or decode the returned records,
//!    mapping codec errors to [`Failure::ToJson`] and [`Failure::FromJson`],
//! 3. map backend faults through [`Failure::from_remote`],
//! 4. log the outcome and report it to the [`Telemetry`] hook.
//!
//! No operation panics or returns an error other than [`Failure`].
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryApi};
//!
//! let tasks = DocumentClient::<Task>::for_document(InMemoryApi::new(), "main").build()?;
//!
//! let created = tasks.create(None, &Task { title: "Write docs".into(), done: false }, None).await?;
//! let open = tasks.list(vec![Filter::eq("done", false).into()]).await?;
//! tasks.delete_many(open.iter().map(|t| t.id.clone())).await?;
//! ```

use futures::future::try_join_all;
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::{Instrument, debug, error, instrument};

use crate::{
    backend::DocumentsApi,
    connectivity::{AlwaysOnline, Connectivity, ConnectivityProbe},
    document::{Document, DocumentCodec, RawFields, SerdeCodec, unique_id},
    error::{DocumentResult, Failure, FailureDetails, FaultContext},
    hooks::{self, NoopTelemetry, Telemetry},
    page::{Page, PaginationParams},
    permission::Permission,
    query::Query,
};

/// The client operations, as reported to logs, telemetry and fault contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
    DeleteMany,
    List,
    PaginatedList,
    Page,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::DeleteMany => "delete_many",
            Operation::List => "list",
            Operation::PaginatedList => "paginated_list",
            Operation::Page => "page",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised by [`DocumentClientBuilder::build`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("a document codec is required")]
    MissingCodec,
    #[error("{0} must not be empty")]
    EmptyId(&'static str),
}

/// Typed CRUD access to one collection of a remote document database.
///
/// The client holds only immutable configuration and is cheap to clone.
pub struct DocumentClient<T> {
    api: Arc<dyn DocumentsApi>,
    codec: Arc<dyn DocumentCodec<T>>,
    probe: Arc<dyn ConnectivityProbe>,
    telemetry: Arc<dyn Telemetry>,
    database_id: String,
    collection_id: String,
}

impl<T> Clone for DocumentClient<T> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            codec: Arc::clone(&self.codec),
            probe: Arc::clone(&self.probe),
            telemetry: Arc::clone(&self.telemetry),
            database_id: self.database_id.clone(),
            collection_id: self.collection_id.clone(),
        }
    }
}

impl<T> fmt::Debug for DocumentClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentClient")
            .field("api", &self.api)
            .field("probe", &self.probe)
            .field("database_id", &self.database_id)
            .field("collection_id", &self.collection_id)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> DocumentClient<T> {
    /// Starts building a client for `collection_id` in `database_id`.
    pub fn builder(
        api: impl DocumentsApi + 'static,
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> DocumentClientBuilder<T> {
        DocumentClientBuilder::new(api, database_id, collection_id)
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// Fetches one document.
    ///
    /// # Errors
    ///
    /// [`Failure::FromJson`] if the record cannot be decoded, otherwise the
    /// mapped backend fault.
    #[instrument(skip_all, fields(collection = %self.collection_id, document_id = %id))]
    pub async fn get(&self, id: &str, queries: Vec<Query>) -> DocumentResult<T> {
        let context = self.begin(Operation::Get, Some(id));

        let result = async {
            self.ensure_online(&context).await?;
            let record = self
                .api
                .get_document(&self.database_id, &self.collection_id, id, queries)
                .await
                .map_err(|e| Failure::from_remote(e, context.clone()))?;

            self.decode(record, &context)
        }
        .await;

        self.finish(Operation::Get, result)
    }

    /// Creates a document and returns the record the backend stored.
    ///
    /// Without an `id` a fresh one is generated client-side. Without
    /// `permissions` the document is opened to everyone
    /// ([`Permission::open`]); pass an explicit set to restrict access.
    ///
    /// # Errors
    ///
    /// [`Failure::ToJson`] if the document cannot be encoded (nothing is sent),
    /// [`Failure::FromJson`] if the stored record cannot be decoded, otherwise
    /// the mapped backend fault.
    #[instrument(skip_all, fields(collection = %self.collection_id, document_id = ?id))]
    pub async fn create(
        &self,
        id: Option<&str>,
        document: &T,
        permissions: Option<Vec<Permission>>,
    ) -> DocumentResult<T> {
        let id = id.map_or_else(unique_id, str::to_string);
        let context = self.begin(Operation::Create, Some(&id));

        let result = async {
            self.ensure_online(&context).await?;
            let data = self.encode(document, &context)?;
            let record = self
                .api
                .create_document(
                    &self.database_id,
                    &self.collection_id,
                    &id,
                    data,
                    Some(permissions.unwrap_or_else(Permission::open)),
                )
                .await
                .map_err(|e| Failure::from_remote(e, context.clone()))?;

            self.decode(record, &context)
        }
        .await;

        self.finish(Operation::Create, result)
    }

    /// Updates a document and returns the record the backend stored.
    ///
    /// Without `permissions` the stored permissions are left as they are.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    #[instrument(skip_all, fields(collection = %self.collection_id, document_id = %id))]
    pub async fn update(
        &self,
        id: &str,
        document: &T,
        permissions: Option<Vec<Permission>>,
    ) -> DocumentResult<T> {
        let context = self.begin(Operation::Update, Some(id));

        let result = async {
            self.ensure_online(&context).await?;
            let data = self.encode(document, &context)?;
            let record = self
                .api
                .update_document(&self.database_id, &self.collection_id, id, Some(data), permissions)
                .await
                .map_err(|e| Failure::from_remote(e, context.clone()))?;

            self.decode(record, &context)
        }
        .await;

        self.finish(Operation::Update, result)
    }

    /// Deletes one document.
    #[instrument(skip_all, fields(collection = %self.collection_id, document_id = %id))]
    pub async fn delete(&self, id: &str) -> DocumentResult<()> {
        let context = self.begin(Operation::Delete, Some(id));

        let result = async {
            self.ensure_online(&context).await?;
            self.api
                .delete_document(&self.database_id, &self.collection_id, id)
                .await
                .map_err(|e| Failure::from_remote(e, context.clone()))
        }
        .await;

        self.finish(Operation::Delete, result)
    }

    /// Deletes every document in `ids` concurrently.
    ///
    /// Connectivity is checked once. Each delete runs as its own task, so every
    /// id is sent even when a sibling fails first. The call resolves with the
    /// first failure as soon as it happens; deletes that already succeeded are
    /// not rolled back, and the remaining ones keep running in the background.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip_all, fields(collection = %self.collection_id))]
    pub async fn delete_many<I, S>(&self, ids: I) -> DocumentResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = ids.into_iter().map(Into::into).collect::<Vec<String>>();
        let context = self.begin(Operation::DeleteMany, None);

        let result = async {
            self.ensure_online(&context).await?;
            debug!(count = ids.len(), "issuing deletes");

            let tasks = ids
                .into_iter()
                .map(|id| {
                    let api = Arc::clone(&self.api);
                    let database_id = self.database_id.clone();
                    let collection_id = self.collection_id.clone();
                    let context = FaultContext::new(Operation::DeleteMany, &collection_id, Some(&id));

                    tokio::spawn(
                        async move {
                            api.delete_document(&database_id, &collection_id, &id)
                                .await
                                .map_err(|e| Failure::from_remote(e, context))
                        }
                        .in_current_span(),
                    )
                })
                .collect::<Vec<_>>();

            try_join_all(tasks.into_iter().map(|task| {
                let context = context.clone();
                async move {
                    task.await.unwrap_or_else(|e| {
                        Err(Failure::Server(FailureDetails::new(e.to_string(), context)))
                    })
                }
            }))
            .await?;

            Ok::<_, Failure>(())
        }
        .await;

        self.finish(Operation::DeleteMany, result)
    }

    /// Lists the documents matching `queries`.
    ///
    /// # Errors
    ///
    /// [`Failure::FromJson`] if any single record cannot be decoded; no partial
    /// list is returned.
    #[instrument(skip_all, fields(collection = %self.collection_id))]
    pub async fn list(&self, queries: Vec<Query>) -> DocumentResult<Vec<T>> {
        let context = self.begin(Operation::List, None);
        let result = self.fetch(queries, &context).await.map(|(items, _)| items);

        self.finish(Operation::List, result)
    }

    /// Lists at most `limit` documents matching `queries`, skipping the first `offset`.
    ///
    /// The backend receives `queries` followed by `limit` and `offset` tokens, in
    /// that order.
    #[instrument(skip_all, fields(collection = %self.collection_id, offset = offset, limit = limit))]
    pub async fn paginated_list(
        &self,
        offset: usize,
        limit: usize,
        mut queries: Vec<Query>,
    ) -> DocumentResult<Vec<T>> {
        let context = self.begin(Operation::PaginatedList, None);
        queries.push(Query::Limit(limit));
        queries.push(Query::Offset(offset));

        let result = self.fetch(queries, &context).await.map(|(items, _)| items);

        self.finish(Operation::PaginatedList, result)
    }

    /// Fetches one numbered page of documents matching `queries`, along with the
    /// total count and the neighbouring page numbers.
    #[instrument(skip_all, fields(collection = %self.collection_id, page = params.page))]
    pub async fn page(
        &self,
        params: PaginationParams,
        mut queries: Vec<Query>,
    ) -> DocumentResult<Page<T>> {
        let context = self.begin(Operation::Page, None);
        queries.extend(params.queries());

        let result = self
            .fetch(queries, &context)
            .await
            .map(|(items, total)| params.to_page(items, usize::try_from(total).unwrap_or(usize::MAX)));

        self.finish(Operation::Page, result)
    }

    async fn fetch(
        &self,
        queries: Vec<Query>,
        context: &FaultContext,
    ) -> DocumentResult<(Vec<T>, u64)> {
        self.ensure_online(context).await?;
        let list = self
            .api
            .list_documents(&self.database_id, &self.collection_id, queries)
            .await
            .map_err(|e| Failure::from_remote(e, context.clone()))?;

        let items = list
            .documents
            .into_iter()
            .map(|record| self.decode(record, context))
            .collect::<DocumentResult<Vec<T>>>()?;

        Ok((items, list.total))
    }

    fn begin(&self, operation: Operation, document_id: Option<&str>) -> FaultContext {
        debug!(%operation, "document operation started");
        FaultContext::new(operation, &self.collection_id, document_id)
    }

    fn finish<R>(&self, operation: Operation, result: DocumentResult<R>) -> DocumentResult<R> {
        match &result {
            Ok(_) => debug!(%operation, "document operation succeeded"),
            Err(failure) => error!(
                %operation,
                kind = failure.kind(),
                error = failure.error(),
                "document operation failed"
            ),
        }

        hooks::report(self.telemetry.as_ref(), operation, &result);

        result
    }

    async fn ensure_online(&self, context: &FaultContext) -> DocumentResult<()> {
        match self.probe.check_connection().await {
            Connectivity::Online => Ok(()),
            Connectivity::Offline => Err(Failure::NoInternetConnection(FailureDetails::new(
                "connectivity probe reported no connection",
                context.clone(),
            ))),
        }
    }

    fn encode(&self, document: &T, context: &FaultContext) -> DocumentResult<RawFields> {
        self.codec
            .encode(document)
            .map_err(|e| Failure::ToJson(FailureDetails::new(e.to_string(), context.clone())))
    }

    fn decode(&self, record: RawFields, context: &FaultContext) -> DocumentResult<T> {
        self.codec
            .decode(record)
            .map_err(|e| Failure::FromJson(FailureDetails::new(e.to_string(), context.clone())))
    }
}

impl<D: Document> DocumentClient<D> {
    /// Starts building a client for a [`Document`] type, using its collection id
    /// and a [`SerdeCodec`].
    pub fn for_document(
        api: impl DocumentsApi + 'static,
        database_id: impl Into<String>,
    ) -> DocumentClientBuilder<D> {
        DocumentClientBuilder::new(api, database_id, D::collection_id())
            .codec(SerdeCodec::<D>::new())
    }
}

/// Builder for [`DocumentClient`].
///
/// The probe defaults to [`AlwaysOnline`] and telemetry to [`NoopTelemetry`];
/// the codec has no default.
pub struct DocumentClientBuilder<T> {
    api: Arc<dyn DocumentsApi>,
    database_id: String,
    collection_id: String,
    codec: Option<Arc<dyn DocumentCodec<T>>>,
    probe: Arc<dyn ConnectivityProbe>,
    telemetry: Arc<dyn Telemetry>,
}

impl<T: Send + Sync + 'static> DocumentClientBuilder<T> {
    pub fn new(
        api: impl DocumentsApi + 'static,
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            api: Arc::new(api),
            database_id: database_id.into(),
            collection_id: collection_id.into(),
            codec: None,
            probe: Arc::new(AlwaysOnline),
            telemetry: Arc::new(NoopTelemetry),
        }
    }

    /// Sets the codec converting between `T` and raw fields.
    pub fn codec(mut self, codec: impl DocumentCodec<T> + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Sets the probe consulted before every remote call.
    pub fn probe(mut self, probe: impl ConnectivityProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Sets the hook notified of every operation's outcome.
    pub fn telemetry(mut self, telemetry: impl Telemetry + 'static) -> Self {
        self.telemetry = Arc::new(telemetry);
        self
    }

    pub fn build(self) -> Result<DocumentClient<T>, BuildError> {
        if self.database_id.is_empty() {
            return Err(BuildError::EmptyId("database id"));
        }
        if self.collection_id.is_empty() {
            return Err(BuildError::EmptyId("collection id"));
        }

        Ok(DocumentClient {
            api: self.api,
            codec: self.codec.ok_or(BuildError::MissingCodec)?,
            probe: self.probe,
            telemetry: self.telemetry,
            database_id: self.database_id,
            collection_id: self.collection_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::DocumentList,
        connectivity::StaticProbe,
        document::FnCodec,
        error::{RemoteError, RemoteResult},
        hooks::FnTelemetry,
        permission::Role,
    };
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};
    use std::{
        collections::HashSet,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Task {
        title: String,
        done: bool,
    }

    impl Document for Task {
        fn collection_id() -> &'static str {
            "tasks"
        }
    }

    fn fields(value: Value) -> RawFields {
        value.as_object().cloned().unwrap()
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Get(String),
        Create { id: String, data: RawFields, permissions: Option<Vec<Permission>> },
        Update { id: String, permissions: Option<Vec<Permission>> },
        Delete(String),
        List(Vec<Query>),
    }

    /// Records every call and answers from canned responses.
    #[derive(Debug, Default)]
    struct RecordingApi {
        calls: Mutex<Vec<Call>>,
        record: Option<RawFields>,
        documents: Vec<RawFields>,
        fault: Option<RemoteError>,
        failing_delete: Option<String>,
    }

    impl RecordingApi {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn respond(&self, echo: RawFields) -> RemoteResult<RawFields> {
            match &self.fault {
                Some(fault) => Err(fault.clone()),
                None => Ok(self.record.clone().unwrap_or(echo)),
            }
        }
    }

    #[async_trait]
    impl DocumentsApi for RecordingApi {
        async fn get_document(
            &self,
            _database_id: &str,
            _collection_id: &str,
            document_id: &str,
            _queries: Vec<Query>,
        ) -> RemoteResult<RawFields> {
            self.push(Call::Get(document_id.to_string()));
            self.respond(RawFields::new())
        }

        async fn create_document(
            &self,
            _database_id: &str,
            _collection_id: &str,
            document_id: &str,
            data: RawFields,
            permissions: Option<Vec<Permission>>,
        ) -> RemoteResult<RawFields> {
            self.push(Call::Create { id: document_id.to_string(), data: data.clone(), permissions });
            let mut echo = data;
            echo.insert("$id".into(), json!(document_id));
            self.respond(echo)
        }

        async fn update_document(
            &self,
            _database_id: &str,
            _collection_id: &str,
            document_id: &str,
            data: Option<RawFields>,
            permissions: Option<Vec<Permission>>,
        ) -> RemoteResult<RawFields> {
            self.push(Call::Update { id: document_id.to_string(), permissions });
            self.respond(data.unwrap_or_default())
        }

        async fn delete_document(
            &self,
            _database_id: &str,
            _collection_id: &str,
            document_id: &str,
        ) -> RemoteResult<()> {
            self.push(Call::Delete(document_id.to_string()));
            if self.failing_delete.as_deref() == Some(document_id) {
                return Err(RemoteError::api(404, "document_not_found", "Document not found"));
            }
            self.respond(RawFields::new()).map(|_| ())
        }

        async fn list_documents(
            &self,
            _database_id: &str,
            _collection_id: &str,
            queries: Vec<Query>,
        ) -> RemoteResult<DocumentList> {
            self.push(Call::List(queries));
            match &self.fault {
                Some(fault) => Err(fault.clone()),
                None => Ok(DocumentList {
                    total: self.documents.len() as u64,
                    documents: self.documents.clone(),
                }),
            }
        }
    }

    fn client(api: &Arc<RecordingApi>) -> DocumentClient<Task> {
        DocumentClient::for_document(Arc::clone(api), "main").build().unwrap()
    }

    fn task() -> Task {
        Task { title: "write docs".into(), done: false }
    }

    #[tokio::test]
    async fn offline_operations_never_reach_the_api() {
        let api = Arc::new(RecordingApi::default());
        let client = DocumentClient::<Task>::for_document(Arc::clone(&api), "main")
            .probe(StaticProbe::offline())
            .build()
            .unwrap();

        let results = vec![
            client.get("t1", vec![]).await.map(|_| ()),
            client.create(None, &task(), None).await.map(|_| ()),
            client.update("t1", &task(), None).await.map(|_| ()),
            client.delete("t1").await,
            client.delete_many(["a", "b"]).await,
            client.list(vec![]).await.map(|_| ()),
            client.paginated_list(0, 10, vec![]).await.map(|_| ()),
            client.page(PaginationParams::default(), vec![]).await.map(|_| ()),
        ];

        for result in results {
            assert!(matches!(result, Err(Failure::NoInternetConnection(_))));
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn get_decodes_the_record() {
        let api = Arc::new(RecordingApi {
            record: Some(fields(json!({ "$id": "t1", "title": "stored", "done": true }))),
            ..Default::default()
        });

        let task = client(&api).get("t1", vec![]).await.unwrap();

        assert_eq!(task, Task { title: "stored".into(), done: true });
        assert_eq!(api.calls(), vec![Call::Get("t1".into())]);
    }

    #[tokio::test]
    async fn undecodable_records_are_from_json_failures() {
        let api = Arc::new(RecordingApi {
            record: Some(fields(json!({ "title": 7 }))),
            ..Default::default()
        });
        let client = client(&api);

        let get = client.get("t1", vec![]).await.unwrap_err();
        let create = client.create(Some("t1"), &task(), None).await.unwrap_err();
        let update = client.update("t1", &task(), None).await.unwrap_err();

        assert!(matches!(get, Failure::FromJson(_)));
        assert!(matches!(create, Failure::FromJson(_)));
        assert!(matches!(update, Failure::FromJson(_)));
        assert_eq!(get.context().document_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn encoding_failures_skip_the_remote_call() {
        let api = Arc::new(RecordingApi::default());
        let client = DocumentClient::builder(Arc::clone(&api), "main", "tasks")
            .codec(FnCodec::new(
                |_fields: RawFields| Ok::<_, String>(task()),
                |_task: &Task| Err::<RawFields, _>("cannot encode"),
            ))
            .build()
            .unwrap();

        let create = client.create(None, &task(), None).await.unwrap_err();
        let update = client.update("t1", &task(), None).await.unwrap_err();

        assert!(matches!(create, Failure::ToJson(_)));
        assert!(matches!(update, Failure::ToJson(_)));
        assert_eq!(update.error(), "cannot encode");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn create_generates_distinct_ids() {
        let api = Arc::new(RecordingApi::default());
        let client = client(&api);

        client.create(None, &task(), None).await.unwrap();
        client.create(None, &task(), None).await.unwrap();

        let ids = api
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create { id, .. } => Some(id),
                _ => None,
            })
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn create_keeps_the_caller_id_and_sends_encoded_fields() {
        let api = Arc::new(RecordingApi::default());

        let created = client(&api).create(Some("t1"), &task(), None).await.unwrap();

        assert_eq!(created, task());
        match &api.calls()[0] {
            Call::Create { id, data, .. } => {
                assert_eq!(id, "t1");
                assert_eq!(data, &fields(json!({ "title": "write docs", "done": false })));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_defaults_to_open_permissions_and_update_to_none() {
        let api = Arc::new(RecordingApi::default());
        let client = client(&api);

        client.create(Some("t1"), &task(), None).await.unwrap();
        client.update("t1", &task(), None).await.unwrap();

        let calls = api.calls();
        assert!(matches!(&calls[0], Call::Create { permissions: Some(p), .. } if *p == Permission::open()));
        assert_eq!(calls[1], Call::Update { id: "t1".into(), permissions: None });
    }

    #[tokio::test]
    async fn explicit_permissions_are_forwarded() {
        let api = Arc::new(RecordingApi::default());
        let client = client(&api);
        let owner_only = vec![Permission::read(Role::User("u1".into()))];

        client.create(Some("t1"), &task(), Some(owner_only.clone())).await.unwrap();
        client.update("t1", &task(), Some(owner_only.clone())).await.unwrap();

        let calls = api.calls();
        assert!(matches!(&calls[0], Call::Create { permissions: Some(p), .. } if *p == owner_only));
        assert_eq!(calls[1], Call::Update { id: "t1".into(), permissions: Some(owner_only) });
    }

    #[tokio::test]
    async fn remote_faults_are_mapped() {
        let api = Arc::new(RecordingApi {
            fault: Some(RemoteError::api(403, "user_unauthorized", "not allowed")),
            ..Default::default()
        });

        let failure = client(&api).delete("t1").await.unwrap_err();

        assert!(matches!(failure, Failure::Forbidden(_)));
        assert_eq!(failure.error(), "not allowed");
        assert_eq!(failure.context().operation, Operation::Delete);
    }

    #[tokio::test]
    async fn paginated_list_appends_limit_then_offset() {
        let api = Arc::new(RecordingApi::default());

        client(&api)
            .paginated_list(20, 10, vec![Query::from("status=active")])
            .await
            .unwrap();

        assert_eq!(
            api.calls(),
            vec![Call::List(vec![
                Query::Raw("status=active".into()),
                Query::Limit(10),
                Query::Offset(20),
            ])]
        );
    }

    #[tokio::test]
    async fn list_fails_whole_when_one_record_is_bad() {
        let api = Arc::new(RecordingApi {
            documents: vec![
                fields(json!({ "title": "a", "done": false })),
                fields(json!({ "title": "b" })),
                fields(json!({ "title": "c", "done": true })),
            ],
            ..Default::default()
        });
        let client = client(&api);

        assert!(matches!(client.list(vec![]).await, Err(Failure::FromJson(_))));
        assert!(matches!(client.paginated_list(0, 3, vec![]).await, Err(Failure::FromJson(_))));
    }

    #[tokio::test]
    async fn list_decodes_every_record() {
        let api = Arc::new(RecordingApi {
            documents: vec![
                fields(json!({ "title": "a", "done": false })),
                fields(json!({ "title": "b", "done": true })),
            ],
            ..Default::default()
        });

        let tasks = client(&api).list(vec![]).await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].title, "b");
    }

    #[tokio::test]
    async fn page_reports_totals() {
        let api = Arc::new(RecordingApi {
            documents: vec![
                fields(json!({ "title": "a", "done": false })),
                fields(json!({ "title": "b", "done": true })),
            ],
            ..Default::default()
        });

        let page = client(&api).page(PaginationParams::new(1, 2), vec![]).await.unwrap();

        assert_eq!(page.count, 2);
        assert_eq!(page.next_page, None);
        assert_eq!(api.calls(), vec![Call::List(vec![Query::Limit(2), Query::Offset(0)])]);
    }

    #[tokio::test]
    async fn delete_many_returns_first_failure_and_issues_every_delete() {
        let api = Arc::new(RecordingApi {
            failing_delete: Some("b".into()),
            ..Default::default()
        });

        let failure = client(&api).delete_many(["a", "b", "c"]).await.unwrap_err();

        assert!(matches!(failure, Failure::NotFound(_)));
        assert_eq!(failure.context().document_id.as_deref(), Some("b"));

        for _ in 0..100 {
            if api.calls().len() == 3 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let deleted = api
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect::<HashSet<_>>();
        assert_eq!(deleted, HashSet::from(["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[tokio::test]
    async fn delete_many_of_nothing_succeeds() {
        let api = Arc::new(RecordingApi::default());

        client(&api).delete_many(Vec::<String>::new()).await.unwrap();

        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn telemetry_sees_every_outcome() {
        let api = Arc::new(RecordingApi {
            failing_delete: Some("b".into()),
            ..Default::default()
        });
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let client = DocumentClient::<Task>::for_document(Arc::clone(&api), "main")
            .telemetry(
                FnTelemetry::new()
                    .on_success({
                        let successes = Arc::clone(&successes);
                        move |_| {
                            successes.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                    .on_error({
                        let failures = Arc::clone(&failures);
                        move |operation, failure| {
                            failures.lock().unwrap().push((operation, failure.kind()));
                        }
                    }),
            )
            .build()
            .unwrap();

        client.delete("a").await.unwrap();
        client.delete("b").await.unwrap_err();

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(*failures.lock().unwrap(), vec![(Operation::Delete, "not_found")]);
    }

    #[tokio::test]
    async fn panicking_telemetry_does_not_mask_results() {
        let api = Arc::new(RecordingApi {
            failing_delete: Some("gone".into()),
            ..Default::default()
        });
        let client = DocumentClient::<Task>::for_document(Arc::clone(&api), "main")
            .telemetry(
                FnTelemetry::new()
                    .on_success(|_| panic!("telemetry down"))
                    .on_error(|_, _| panic!("telemetry down")),
            )
            .build()
            .unwrap();

        assert_eq!(client.create(Some("t1"), &task(), None).await.unwrap(), task());
        assert!(matches!(client.delete("gone").await, Err(Failure::NotFound(_))));
        assert!(matches!(
            client.delete_many(["t1", "gone"]).await,
            Err(Failure::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn panicking_error_hook_keeps_offline_failures() {
        let api = Arc::new(RecordingApi::default());
        let client = DocumentClient::<Task>::for_document(Arc::clone(&api), "main")
            .probe(StaticProbe::offline())
            .telemetry(FnTelemetry::new().on_error(|_, _| panic!("telemetry down")))
            .build()
            .unwrap();

        let failure = client.get("t1", vec![]).await.unwrap_err();

        assert!(matches!(failure, Failure::NoInternetConnection(_)));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn build_requires_a_codec_and_ids() {
        let api = RecordingApi::default;

        assert_eq!(
            DocumentClient::<Task>::builder(api(), "main", "tasks").build().unwrap_err(),
            BuildError::MissingCodec
        );
        assert_eq!(
            DocumentClient::<Task>::for_document(api(), "").build().unwrap_err(),
            BuildError::EmptyId("database id")
        );
    }
}
