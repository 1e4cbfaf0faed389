//! Failure taxonomy and result types for document client operations.
//!
//! Every fault raised while serving a client operation (connectivity, encoding,
//! decoding, transport) is converted into exactly one [`Failure`] variant before it
//! leaves the client. Use [`DocumentResult<T>`] as the return type for client
//! operations and [`RemoteResult<T>`] for backend implementations.

use std::fmt;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::client::Operation;

/// Where a failure originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultContext {
    /// The client operation that was running.
    pub operation: Operation,
    /// The collection the operation targeted.
    pub collection_id: String,
    /// The document the operation targeted, if it targeted a single document.
    pub document_id: Option<String>,
}

impl FaultContext {
    pub fn new(
        operation: Operation,
        collection_id: impl Into<String>,
        document_id: Option<&str>,
    ) -> Self {
        Self {
            operation,
            collection_id: collection_id.into(),
            document_id: document_id.map(str::to_string),
        }
    }
}

impl fmt::Display for FaultContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document_id {
            Some(id) => write!(f, "{} {}/{}", self.operation, self.collection_id, id),
            None => write!(f, "{} {}", self.operation, self.collection_id),
        }
    }
}

/// The payload shared by every [`Failure`] variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetails {
    /// The stringified underlying error.
    pub error: String,
    /// The originating fault context.
    pub context: FaultContext,
}

impl FailureDetails {
    pub fn new(error: impl Into<String>, context: FaultContext) -> Self {
        Self { error: error.into(), context }
    }
}

impl fmt::Display for FailureDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)
    }
}

/// Represents every way a document client operation can fail.
///
/// The set is closed: callers (and the [`Localizer`](crate::localize::Localizer))
/// match on it exhaustively.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A record returned by the backend could not be decoded into the document type.
    FromJson(FailureDetails),
    /// A document could not be encoded into raw fields before sending it.
    ToJson(FailureDetails),
    /// The backend rejected the request as unauthenticated (HTTP 401).
    Unauthorized(FailureDetails),
    /// The requested document or collection does not exist (HTTP 404).
    NotFound(FailureDetails),
    /// The caller lacks permission for the request (HTTP 403).
    Forbidden(FailureDetails),
    /// Any other backend or transport fault.
    Server(FailureDetails),
    /// The connectivity probe reported no connection; nothing was sent.
    NoInternetConnection(FailureDetails),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message(), self.details())
    }
}

impl Failure {
    /// Returns the fixed, human-readable category message of this failure.
    pub fn message(&self) -> &'static str {
        match self {
            Failure::FromJson(_) => "Failed to decode document from JSON",
            Failure::ToJson(_) => "Failed to encode document to JSON",
            Failure::Unauthorized(_) => "Unauthorized",
            Failure::NotFound(_) => "Not found",
            Failure::Forbidden(_) => "Forbidden",
            Failure::Server(_) => "Server failure",
            Failure::NoInternetConnection(_) => "No internet connection",
        }
    }

    /// Returns the underlying error and fault context.
    pub fn details(&self) -> &FailureDetails {
        match self {
            Failure::FromJson(details)
            | Failure::ToJson(details)
            | Failure::Unauthorized(details)
            | Failure::NotFound(details)
            | Failure::Forbidden(details)
            | Failure::Server(details)
            | Failure::NoInternetConnection(details) => details,
        }
    }

    /// Returns the stringified underlying error.
    pub fn error(&self) -> &str {
        &self.details().error
    }

    /// Returns the context the failure originated from.
    pub fn context(&self) -> &FaultContext {
        &self.details().context
    }

    /// Short, stable name of the variant, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::FromJson(_) => "from_json",
            Failure::ToJson(_) => "to_json",
            Failure::Unauthorized(_) => "unauthorized",
            Failure::NotFound(_) => "not_found",
            Failure::Forbidden(_) => "forbidden",
            Failure::Server(_) => "server",
            Failure::NoInternetConnection(_) => "no_internet_connection",
        }
    }

    /// Maps a backend fault onto the failure taxonomy.
    ///
    /// | status | failure |
    /// |---|---|
    /// | 401 | [`Failure::Unauthorized`] |
    /// | 403 | [`Failure::Forbidden`] |
    /// | 404 | [`Failure::NotFound`] |
    /// | any other / none | [`Failure::Server`] |
    pub fn from_remote(error: RemoteError, context: FaultContext) -> Self {
        let details = FailureDetails::new(error.to_string(), context);

        match error.status() {
            Some(401) => Failure::Unauthorized(details),
            Some(403) => Failure::Forbidden(details),
            Some(404) => Failure::NotFound(details),
            _ => Failure::Server(details),
        }
    }
}

/// A specialized `Result` type for document client operations.
pub type DocumentResult<T> = Result<T, Failure>;

/// A fault raised by a [`DocumentsApi`](crate::backend::DocumentsApi) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// A structured fault reported by the remote service.
    ///
    /// `code` is the HTTP status when the service reported one, `kind` the
    /// service's machine-readable error type (e.g. `document_not_found`).
    #[error("{message}")]
    Api {
        code: Option<u16>,
        kind: Option<String>,
        message: String,
    },
    /// Anything that is not a structured service fault.
    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    /// Creates a structured fault with a status code.
    pub fn api(code: u16, kind: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Api {
            code: Some(code),
            kind: Some(kind.into()),
            message: message.into(),
        }
    }

    /// Returns the status code carried by this fault, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Api { code, .. } => *code,
            RemoteError::Other(_) => None,
        }
    }
}

/// A specialized `Result` type for backend implementations.
pub type RemoteResult<T> = Result<T, RemoteError>;

impl From<SerdeJsonError> for RemoteError {
    fn from(err: SerdeJsonError) -> Self {
        RemoteError::Other(err.to_string())
    }
}

/// Raised by a [`DocumentCodec`](crate::document::DocumentCodec).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] SerdeJsonError),
    /// The document did not encode to a JSON object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("{0}")]
    Custom(String),
}
