//! A thin typed client layer over backend-as-a-service document databases.
//!
//! This crate is the core of the docbridge project and provides:
//!
//! - **Document codecs** ([`document`]) - Converting typed documents to and from raw JSON fields
//! - **Remote API abstraction** ([`backend`]) - The trait a document service binding implements
//! - **Typed client** ([`client`]) - CRUD and list operations for one collection
//! - **Failure taxonomy** ([`error`]) - The closed set of failures every operation returns
//! - **Failure localization** ([`localize`]) - User-facing failure messages per locale
//! - **Query tokens** ([`query`]) - Filters, ordering, cursors and pagination tokens
//! - **Permissions** ([`permission`]) - Document-level access grants
//! - **Connectivity** ([`connectivity`]) - The probe consulted before every remote call
//! - **Telemetry hooks** ([`hooks`]) - Best-effort success and error callbacks
//! - **Pagination** ([`page`]) - Page-number pagination on top of limit/offset
//!
//! # Example
//!
//! ```ignore
//! use docbridge_core::{client::DocumentClient, document::Document};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Task {
//!     #[serde(rename = "$id", default, skip_serializing)]
//!     pub id: String,
//!     pub title: String,
//! }
//!
//! impl Document for Task {
//!     fn collection_id() -> &'static str {
//!         "tasks"
//!     }
//! }
//!
//! let tasks = DocumentClient::<Task>::for_document(api, "main").build()?;
//! let task = tasks.get("t1", vec![]).await?;
//! ```

pub mod backend;
pub mod client;
pub mod connectivity;
pub mod document;
pub mod error;
pub mod hooks;
pub mod localize;
pub mod page;
pub mod permission;
pub mod query;
