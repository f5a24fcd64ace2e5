//! Stack Catalog REST API Client
//!
//! A Rust client library for the stack catalog exposed by an IDE server
//! (`/api/stack`) and for remote stack-source URLs serving JSON arrays of
//! stack definitions.
//!
//! # Example
//!
//! ```no_run
//! use catalog_client::{CatalogClient, StackCatalogApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CatalogClient::new()?;
//!
//! // List the stacks currently registered on the IDE server
//! let stacks = client.list_stacks("http://localhost:8080").await?;
//! for stack in &stacks {
//!     println!("{} ({})", stack.name, stack.id);
//! }
//!
//! // Delete one of them
//! let status = client.delete_stack("http://localhost:8080", &stacks[0].id).await?;
//! assert_eq!(status, 204);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Catalog Operations**: list, create and delete stacks on the IDE server
//! - **Source Fetch**: download replacement stack definitions from a remote URL
//! - **Explicit JSON headers**: every request carries `Accept`/`Content-Type`
//! - **test-util**: in-memory mock catalog that records every call

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod catalog_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use catalog_trait::StackCatalogApi;
pub use client::CatalogClient;
pub use error::CatalogError;
pub use models::StackRef;
#[cfg(feature = "test-util")]
pub use mock::MockCatalog;
