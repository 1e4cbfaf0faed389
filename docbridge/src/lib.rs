//! Typed CRUD access to backend-as-a-service document databases.
//!
//! This crate is the primary entry point for users of docbridge. It re-exports
//! the core types from the sub-crates and gives access to the available
//! backends.
//!
//! # Features
//!
//! - **Typed documents** - Define your records with Serde, or plug in your own codec
//! - **One failure type** - Every operation returns a [`Failure`](error::Failure) from a closed set
//! - **Localized messages** - Render failures for users in English, Spanish, Portuguese or your own locales
//! - **Connectivity gating** - Operations fail fast without touching the network when offline
//! - **Multiple backends** - In-memory for development and tests, Appwrite over REST
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryApi};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Task {
//!     #[serde(rename = "$id", default, skip_serializing)]
//!     pub id: String,
//!     pub title: String,
//!     pub done: bool,
//! }
//!
//! impl Document for Task {
//!     fn collection_id() -> &'static str { "tasks" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tasks = DocumentClient::<Task>::for_document(InMemoryApi::new(), "main").build()?;
//!
//!     let task = Task { id: String::new(), title: "Write docs".into(), done: false };
//!     let created = tasks.create(None, &task, None).await?;
//!
//!     let open = tasks
//!         .paginated_list(0, 10, vec![Filter::eq("done", false).into()])
//!         .await?;
//!     println!("{} open tasks, first is {}", open.len(), created.id);
//!
//!     match tasks.get("missing", vec![]).await {
//!         Err(failure) => println!("{}", Localizer::default().localize(&failure, "es")),
//!         Ok(task) => println!("found {task:?}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory document API for development and testing
//! - `appwrite` - Appwrite REST API (requires the `appwrite` feature)

pub mod prelude;

pub use docbridge_core::{
    backend, client, connectivity, document, error, hooks, localize, page, permission, query,
};

// Re-export serde_json, which raw records and filter values are built from
pub use serde_json;

/// In-memory document API.
pub mod memory {
    pub use docbridge_memory::{InMemoryApi, InMemoryApiBuilder};
}

/// Appwrite REST document API.
///
/// This module is only available when the `appwrite` feature is enabled.
#[cfg(feature = "appwrite")]
pub mod appwrite {
    pub use docbridge_appwrite::{
        AppwriteApi, AppwriteApiBuilder, AppwriteConfig, AppwriteConfigError, AppwriteConfigResult,
        query::{encode_queries, encode_query},
    };
}
