//! Remote document API abstraction.
//!
//! This module defines the trait a document backend implements. The client
//! forwards every operation one-to-one to it, so an implementation is a thin
//! binding over a service's document endpoints (the REST API, an in-memory
//! stand-in, a test double).
//!
//! # Error Handling
//!
//! Operations return [`RemoteResult<T>`](crate::error::RemoteResult). Faults the
//! service reports with an HTTP status should be raised as
//! [`RemoteError::Api`](crate::error::RemoteError::Api) carrying that status;
//! the client maps 401, 403 and 404 onto dedicated failures and everything else
//! onto a server failure.
//!
//! # Examples
//!
//! ```ignore
//! use docbridge::backend::DocumentsApi;
//! use serde_json::json;
//!
//! let api = MyBackendImpl::new();
//! let data = json!({ "title": "Write docs" }).as_object().cloned().unwrap();
//! let record = api.create_document("main", "tasks", "t1", data, None).await?;
//! assert_eq!(record["$id"], "t1");
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

use crate::{
    document::RawFields,
    error::RemoteResult,
    permission::Permission,
    query::Query,
};

/// One page of raw records returned by [`DocumentsApi::list_documents`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    /// Number of documents matching the filters, ignoring limit and offset.
    pub total: u64,
    /// The records in this page.
    pub documents: Vec<RawFields>,
}

/// Abstract interface for a remote document store.
///
/// Every method addresses a collection by `database_id` and `collection_id`.
/// Implementations must be thread-safe; the client shares one instance between
/// concurrent calls and spawned tasks.
#[async_trait]
pub trait DocumentsApi: Send + Sync + Debug {
    /// Fetches one document.
    ///
    /// `queries` may narrow the returned fields (e.g. [`Query::Select`]).
    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<RawFields>;

    /// Creates a document under the given id and returns the stored record.
    ///
    /// `permissions` of `None` leaves the service default in place.
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: RawFields,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields>;

    /// Updates a document and returns the stored record.
    ///
    /// Fields in `data` are merged into the stored record. `permissions` of
    /// `None` leaves the stored permissions untouched.
    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Option<RawFields>,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields>;

    /// Deletes one document.
    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RemoteResult<()>;

    /// Lists the documents matching `queries`.
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<DocumentList>;
}

#[async_trait]
impl<B> DocumentsApi for &B
where
    B: DocumentsApi + ?Sized,
{
    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<RawFields> {
        (**self)
            .get_document(database_id, collection_id, document_id, queries)
            .await
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: RawFields,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        (**self)
            .create_document(database_id, collection_id, document_id, data, permissions)
            .await
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Option<RawFields>,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        (**self)
            .update_document(database_id, collection_id, document_id, data, permissions)
            .await
    }

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RemoteResult<()> {
        (**self)
            .delete_document(database_id, collection_id, document_id)
            .await
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<DocumentList> {
        (**self)
            .list_documents(database_id, collection_id, queries)
            .await
    }
}

#[async_trait]
impl<B> DocumentsApi for Arc<B>
where
    B: DocumentsApi + ?Sized,
{
    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<RawFields> {
        (**self)
            .get_document(database_id, collection_id, document_id, queries)
            .await
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: RawFields,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        (**self)
            .create_document(database_id, collection_id, document_id, data, permissions)
            .await
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Option<RawFields>,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        (**self)
            .update_document(database_id, collection_id, document_id, data, permissions)
            .await
    }

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RemoteResult<()> {
        (**self)
            .delete_document(database_id, collection_id, document_id)
            .await
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<DocumentList> {
        (**self)
            .list_documents(database_id, collection_id, queries)
            .await
    }
}
