//! Appwrite REST backend for docbridge.
//!
//! This crate implements [`DocumentsApi`](docbridge_core::backend::DocumentsApi)
//! over Appwrite's Databases REST API with `reqwest`. Filter expressions are
//! translated into Appwrite's JSON query syntax, and error bodies are mapped to
//! [`RemoteError::Api`](docbridge_core::error::RemoteError::Api) carrying the
//! HTTP status and the Appwrite error type.
//!
//! To use this backend, include the `appwrite` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbridge = { version = "x.y.z", features = ["appwrite"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{prelude::*, appwrite::{AppwriteApi, AppwriteConfig}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = AppwriteApi::from_config(AppwriteConfig::from_env()?)?;
//!     let tasks = DocumentClient::<Task>::for_document(api, "main").build()?;
//!
//!     let open = tasks.list(vec![Filter::eq("done", false).into()]).await?;
//!     println!("{} open tasks", open.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod query;

pub use api::{AppwriteApi, AppwriteApiBuilder};
pub use config::{AppwriteConfig, AppwriteConfigError, AppwriteConfigResult};
