//! In-memory document API for docbridge.
//!
//! [`InMemoryApi`] implements [`DocumentsApi`](docbridge_core::backend::DocumentsApi)
//! without a network. It is meant for development and tests: it stamps the same
//! `$` metadata a hosted service would, answers with the same status codes for
//! missing or duplicate documents, and evaluates filter, ordering, cursor and
//! pagination tokens.
//!
//! # Quick Start
//!
//! ```ignore
//! use docbridge::{prelude::*, memory::InMemoryApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = InMemoryApi::new();
//!     let tasks = DocumentClient::<Task>::for_document(api.clone(), "main").build()?;
//!
//!     tasks.create(Some("t1"), &Task { title: "Write docs".into() }, None).await?;
//!     assert_eq!(api.len("main", "tasks").await, 1);
//!
//!     Ok(())
//! }
//! ```

pub mod evaluator;
pub mod store;

pub use store::{InMemoryApi, InMemoryApiBuilder};
