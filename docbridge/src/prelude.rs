//! Convenient re-exports of commonly used types from docbridge.
//!
//! ```ignore
//! use docbridge::prelude::*;
//! ```

pub use docbridge_core::{
    backend::{DocumentList, DocumentsApi},
    client::{BuildError, DocumentClient, DocumentClientBuilder, Operation},
    connectivity::{AlwaysOnline, Connectivity, ConnectivityProbe, StaticProbe},
    document::{Document, DocumentCodec, FnCodec, RawFields, SerdeCodec, unique_id},
    error::{DocumentResult, Failure, FailureDetails, FaultContext, RemoteError, RemoteResult},
    hooks::{FnTelemetry, NoopTelemetry, Telemetry},
    localize::{FailureCatalog, FailureMessages, Locale, LocaleContext, LocalizeError, Localizer},
    page::{Page, PaginationParams},
    permission::{Permission, PermissionAction, Role},
    query::{Expr, FieldOp, Filter, Query, QueryVisitor, SortDirection},
};
