//! Appwrite REST binding of the remote document API.

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use docbridge_core::{
    backend::{DocumentList, DocumentsApi},
    document::RawFields,
    error::{RemoteError, RemoteResult},
    permission::Permission,
    query::Query,
};

use crate::{
    config::{AppwriteConfig, AppwriteConfigError, AppwriteConfigResult},
    query::encode_queries,
};

const PROJECT_HEADER: &str = "x-appwrite-project";
const KEY_HEADER: &str = "x-appwrite-key";
const JWT_HEADER: &str = "x-appwrite-jwt";
const LOCALE_HEADER: &str = "x-appwrite-locale";

/// The error body Appwrite returns with every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocumentBody<'a> {
    document_id: &'a str,
    data: RawFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    permissions: Option<Vec<Permission>>,
}

#[derive(Serialize)]
struct UpdateDocumentBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<RawFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permissions: Option<Vec<Permission>>,
}

/// Converts a transport fault, keeping the status code when there is one.
pub fn transport_error(err: reqwest::Error) -> RemoteError {
    match err.status() {
        Some(status) => RemoteError::Api {
            code: Some(status.as_u16()),
            kind: None,
            message: err.to_string(),
        },
        None => RemoteError::Other(err.to_string()),
    }
}

async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();

    match response.json::<ErrorBody>().await {
        Ok(body) => RemoteError::Api {
            code: Some(status.as_u16()),
            kind: body.kind,
            message: body.message,
        },
        Err(_) => RemoteError::Api {
            code: Some(status.as_u16()),
            kind: None,
            message: status
                .canonical_reason()
                .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string),
        },
    }
}

/// Document API of an Appwrite project over HTTP.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use docbridge_appwrite::AppwriteApi;
///
/// let api = AppwriteApi::builder("https://cloud.appwrite.io/v1", "demo")
///     .api_key(std::env::var("APPWRITE_API_KEY")?)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct AppwriteApi {
    http: Client,
    endpoint: Url,
}

impl AppwriteApi {
    /// Wraps a preconfigured client. Authentication headers must already be
    /// set as its defaults.
    pub fn new(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn builder(endpoint: impl Into<String>, project_id: impl Into<String>) -> AppwriteApiBuilder {
        AppwriteApiBuilder::from(AppwriteConfig::new(endpoint, project_id))
    }

    pub fn from_config(config: AppwriteConfig) -> AppwriteConfigResult<Self> {
        AppwriteApiBuilder::from(config).build()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn documents_url(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: Option<&str>,
    ) -> RemoteResult<Url> {
        let mut url = self.endpoint.clone();

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::Other(format!("endpoint `{}` cannot be a base URL", self.endpoint)))?;
            segments
                .pop_if_empty()
                .extend(["databases", database_id, "collections", collection_id, "documents"]);
            if let Some(document_id) = document_id {
                segments.push(document_id);
            }
        }

        Ok(url)
    }

    fn with_queries(mut url: Url, queries: &[Query]) -> RemoteResult<Url> {
        let encoded = encode_queries(queries)?;
        if !encoded.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for query in &encoded {
                pairs.append_pair("queries[]", query);
            }
        }

        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let request = request.build().map_err(transport_error)?;
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = self.http.execute(request).await.map_err(transport_error)?;
        let status = response.status();
        debug!(%method, path = %path, status = status.as_u16(), "appwrite request");

        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn send_for_record(&self, request: RequestBuilder) -> RemoteResult<RawFields> {
        self.send(request)
            .await?
            .json::<RawFields>()
            .await
            .map_err(transport_error)
    }
}

#[async_trait]
impl DocumentsApi for AppwriteApi {
    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<RawFields> {
        let url = self.documents_url(database_id, collection_id, Some(document_id))?;
        let url = Self::with_queries(url, &queries)?;

        self.send_for_record(self.http.get(url)).await
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: RawFields,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        let url = self.documents_url(database_id, collection_id, None)?;
        let body = CreateDocumentBody { document_id, data, permissions };

        self.send_for_record(self.http.post(url).json(&body)).await
    }

    async fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Option<RawFields>,
        permissions: Option<Vec<Permission>>,
    ) -> RemoteResult<RawFields> {
        let url = self.documents_url(database_id, collection_id, Some(document_id))?;
        let body = UpdateDocumentBody { data, permissions };

        self.send_for_record(self.http.patch(url).json(&body)).await
    }

    async fn delete_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> RemoteResult<()> {
        let url = self.documents_url(database_id, collection_id, Some(document_id))?;
        self.send(self.http.delete(url)).await?;

        Ok(())
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: Vec<Query>,
    ) -> RemoteResult<DocumentList> {
        let url = self.documents_url(database_id, collection_id, None)?;
        let url = Self::with_queries(url, &queries)?;

        self.send(self.http.get(url))
            .await?
            .json::<DocumentList>()
            .await
            .map_err(transport_error)
    }
}

/// Builder for [`AppwriteApi`].
#[derive(Debug, Clone)]
pub struct AppwriteApiBuilder {
    config: AppwriteConfig,
}

impl From<AppwriteConfig> for AppwriteApiBuilder {
    fn from(config: AppwriteConfig) -> Self {
        Self { config }
    }
}

impl AppwriteApiBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn jwt(mut self, jwt: impl Into<String>) -> Self {
        self.config.jwt = Some(jwt.into());
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.config.locale = Some(locale.into());
        self
    }

    pub fn self_signed(mut self, accept: bool) -> Self {
        self.config.self_signed = accept;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs();
        self
    }

    pub fn build(self) -> AppwriteConfigResult<AppwriteApi> {
        let config = self.config;

        if config.project_id.trim().is_empty() {
            return Err(AppwriteConfigError::Missing("project_id"));
        }
        let endpoint = Url::parse(&config.endpoint).map_err(|e| AppwriteConfigError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AppwriteConfigError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: "expected an http(s) URL".into(),
            });
        }

        let mut headers = HeaderMap::new();
        insert_header(&mut headers, PROJECT_HEADER, &config.project_id, false)?;
        if let Some(key) = &config.api_key {
            insert_header(&mut headers, KEY_HEADER, key, true)?;
        }
        if let Some(jwt) = &config.jwt {
            insert_header(&mut headers, JWT_HEADER, jwt, true)?;
        }
        if let Some(locale) = &config.locale {
            insert_header(&mut headers, LOCALE_HEADER, locale, false)?;
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.self_signed)
            .build()?;

        Ok(AppwriteApi::new(http, endpoint))
    }
}

fn insert_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
    sensitive: bool,
) -> AppwriteConfigResult<()> {
    let mut value = HeaderValue::from_str(value).map_err(|_| AppwriteConfigError::InvalidHeader(name))?;
    value.set_sensitive(sensitive);
    headers.insert(HeaderName::from_static(name), value);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn api(server: &MockServer) -> AppwriteApi {
        AppwriteApi::builder(server.url("/v1"), "demo")
            .api_key("secret")
            .build()
            .unwrap()
    }

    fn fields(value: serde_json::Value) -> RawFields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn get_sends_auth_headers_and_queries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/databases/main/collections/tasks/documents/t1")
                    .header("x-appwrite-project", "demo")
                    .header("x-appwrite-key", "secret")
                    .query_param("queries[]", r#"{"method":"select","values":["title"]}"#);
                then.status(200).json_body(json!({ "$id": "t1", "title": "write" }));
            })
            .await;

        let record = api(&server)
            .get_document("main", "tasks", "t1", vec![Query::select(["title"])])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(record["title"], "write");
    }

    #[tokio::test]
    async fn create_posts_id_data_and_permissions() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/databases/main/collections/tasks/documents")
                    .json_body(json!({
                        "documentId": "t1",
                        "data": { "title": "write" },
                        "permissions": [r#"read("any")"#],
                    }));
                then.status(201).json_body(json!({ "$id": "t1", "title": "write" }));
            })
            .await;

        let record = api(&server)
            .create_document(
                "main",
                "tasks",
                "t1",
                fields(json!({ "title": "write" })),
                Some(vec![Permission::read(docbridge_core::permission::Role::Any)]),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(record["$id"], "t1");
    }

    #[tokio::test]
    async fn update_omits_absent_permissions() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/v1/databases/main/collections/tasks/documents/t1")
                    .json_body(json!({ "data": { "done": true } }));
                then.status(200).json_body(json!({ "$id": "t1", "done": true }));
            })
            .await;

        api(&server)
            .update_document("main", "tasks", "t1", Some(fields(json!({ "done": true }))), None)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_accepts_no_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v1/databases/main/collections/tasks/documents/t1");
                then.status(204);
            })
            .await;

        api(&server).delete_document("main", "tasks", "t1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_parses_total_and_documents() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/databases/main/collections/tasks/documents")
                    .query_param("queries[]", r#"{"method":"limit","values":[1]}"#);
                then.status(200).json_body(json!({
                    "total": 7,
                    "documents": [{ "$id": "t1", "title": "write" }],
                }));
            })
            .await;

        let list = api(&server)
            .list_documents("main", "tasks", vec![Query::limit(1)])
            .await
            .unwrap();

        assert_eq!(list.total, 7);
        assert_eq!(list.documents.len(), 1);
    }

    #[tokio::test]
    async fn error_bodies_become_api_faults() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/databases/main/collections/tasks/documents/missing");
                then.status(404).json_body(json!({
                    "message": "Document with the requested ID could not be found.",
                    "code": 404,
                    "type": "document_not_found",
                    "version": "1.6.0",
                }));
            })
            .await;

        let err = api(&server)
            .get_document("main", "tasks", "missing", vec![])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RemoteError::Api {
                code: Some(404),
                kind: Some("document_not_found".into()),
                message: "Document with the requested ID could not be found.".into(),
            }
        );
    }

    #[tokio::test]
    async fn non_json_errors_keep_the_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE);
                then.status(502).body("bad gateway");
            })
            .await;

        let err = api(&server).delete_document("main", "tasks", "t1").await.unwrap_err();

        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn unreachable_hosts_are_transport_faults() {
        let api = AppwriteApi::builder("http://127.0.0.1:9/v1", "demo")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = api.delete_document("main", "tasks", "t1").await.unwrap_err();

        assert!(matches!(err, RemoteError::Other(_)));
    }

    #[test]
    fn rejects_bad_endpoints() {
        assert!(matches!(
            AppwriteApi::builder("not a url", "demo").build(),
            Err(AppwriteConfigError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            AppwriteApi::builder("mailto:ops@example.com", "demo").build(),
            Err(AppwriteConfigError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            AppwriteApi::builder("http://localhost/v1", " ").build(),
            Err(AppwriteConfigError::Missing("project_id"))
        ));
    }

    #[test]
    fn document_ids_are_path_encoded() {
        let api = AppwriteApi::builder("http://localhost/v1/", "demo").build().unwrap();

        let url = api.documents_url("main", "tasks", Some("a/b")).unwrap();

        assert_eq!(url.as_str(), "http://localhost/v1/databases/main/collections/tasks/documents/a%2Fb");
    }
}
