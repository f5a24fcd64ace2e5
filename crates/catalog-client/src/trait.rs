//! StackCatalogApi trait for mocking
//!
//! This trait abstracts the catalog client to enable mocking in unit tests.
//! The concrete `CatalogClient` implements it; tests use `MockCatalog`.
//!
//! The catalog endpoint is passed per call rather than held by the client:
//! the controller rewrites the endpoint to the pod IP once in-cluster
//! discovery resolves, and must not have to rebuild the client to do so.

use crate::error::CatalogError;
use crate::models::StackRef;
use serde_json::Value;

/// Trait for stack catalog operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime.
#[async_trait::async_trait]
pub trait StackCatalogApi: Send + Sync {
    /// List the stacks currently registered on the catalog.
    ///
    /// `GET {endpoint}/api/stack`. An empty or non-JSON body is an error,
    /// never a panic.
    async fn list_stacks(&self, endpoint: &str) -> Result<Vec<StackRef>, CatalogError>;

    /// Register a new stack definition on the catalog.
    ///
    /// `POST {endpoint}/api/stack/`. Returns the HTTP status code; the
    /// catalog answers 201 on success.
    async fn create_stack(&self, endpoint: &str, stack: &Value) -> Result<u16, CatalogError>;

    /// Delete a stack by id.
    ///
    /// `DELETE {endpoint}/api/stack/{id}`. Returns the HTTP status code;
    /// the catalog answers 204 on success.
    async fn delete_stack(&self, endpoint: &str, id: &str) -> Result<u16, CatalogError>;

    /// Fetch the desired stack set from a remote source URL.
    ///
    /// `GET {url}`, expecting a JSON array of full stack definitions.
    async fn fetch_source_stacks(&self, url: &str) -> Result<Vec<Value>, CatalogError>;
}
