//! Mock catalog client for unit testing
//!
//! Provides an in-memory implementation of `StackCatalogApi` that records
//! every call, so tests can assert on the exact sequence of deletes and
//! creates a refresh performed and on which endpoint each call used.

use crate::catalog_trait::StackCatalogApi;
use crate::error::CatalogError;
use crate::models::StackRef;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Mock catalog for testing
///
/// Stores catalog contents in memory and can be configured to fail
/// individual operations for error-isolation tests.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    stacks: Arc<Mutex<Vec<StackRef>>>,
    source_stacks: Arc<Mutex<Vec<Value>>>,
    // Ids whose delete returns an error instead of 204
    fail_delete_ids: Arc<Mutex<HashSet<String>>>,
    // Ids whose delete returns 204 but leaves the entry in place
    sticky_ids: Arc<Mutex<HashSet<String>>>,
    fail_list: Arc<Mutex<bool>>,
    fail_source: Arc<Mutex<bool>>,
    // Call recording
    deleted_ids: Arc<Mutex<Vec<String>>>,
    created_stacks: Arc<Mutex<Vec<Value>>>,
    endpoints_used: Arc<Mutex<Vec<String>>>,
}

impl MockCatalog {
    /// Create an empty mock catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog with an existing stack (for test setup)
    pub fn add_stack(&self, id: &str, name: &str) {
        self.stacks.lock().unwrap().push(StackRef {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    /// Set the stack definitions the remote source will return
    pub fn set_source_stacks(&self, stacks: Vec<Value>) {
        *self.source_stacks.lock().unwrap() = stacks;
    }

    /// Make `delete_stack` return an error for the given id
    pub fn fail_delete(&self, id: &str) {
        self.fail_delete_ids.lock().unwrap().insert(id.to_string());
    }

    /// Make `delete_stack` answer 204 for the given id without removing it
    pub fn make_sticky(&self, id: &str) {
        self.sticky_ids.lock().unwrap().insert(id.to_string());
    }

    /// Make `list_stacks` fail
    pub fn fail_list(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    /// Make `fetch_source_stacks` fail
    pub fn fail_source(&self) {
        *self.fail_source.lock().unwrap() = true;
    }

    /// Ids passed to `delete_stack`, in call order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted_ids.lock().unwrap().clone()
    }

    /// Bodies passed to `create_stack`, in call order
    pub fn created_stacks(&self) -> Vec<Value> {
        self.created_stacks.lock().unwrap().clone()
    }

    /// Catalog endpoints used across all calls, in call order
    pub fn endpoints_used(&self) -> Vec<String> {
        self.endpoints_used.lock().unwrap().clone()
    }

    /// Current catalog contents
    pub fn current_stacks(&self) -> Vec<StackRef> {
        self.stacks.lock().unwrap().clone()
    }

    fn record_endpoint(&self, endpoint: &str) {
        self.endpoints_used.lock().unwrap().push(endpoint.to_string());
    }
}

#[async_trait::async_trait]
impl StackCatalogApi for MockCatalog {
    async fn list_stacks(&self, endpoint: &str) -> Result<Vec<StackRef>, CatalogError> {
        self.record_endpoint(endpoint);
        if *self.fail_list.lock().unwrap() {
            return Err(CatalogError::EmptyBody(format!("{}/api/stack", endpoint)));
        }
        Ok(self.stacks.lock().unwrap().clone())
    }

    async fn create_stack(&self, endpoint: &str, stack: &Value) -> Result<u16, CatalogError> {
        self.record_endpoint(endpoint);
        self.created_stacks.lock().unwrap().push(stack.clone());

        let name = stack
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unnamed")
            .to_string();
        let mut stacks = self.stacks.lock().unwrap();
        let id = format!("mock-{}", stacks.len() + 1);
        stacks.push(StackRef { id, name });
        Ok(201)
    }

    async fn delete_stack(&self, endpoint: &str, id: &str) -> Result<u16, CatalogError> {
        self.record_endpoint(endpoint);
        self.deleted_ids.lock().unwrap().push(id.to_string());

        if self.fail_delete_ids.lock().unwrap().contains(id) {
            return Err(CatalogError::Api(format!("delete of stack {} refused", id)));
        }
        if self.sticky_ids.lock().unwrap().contains(id) {
            return Ok(204);
        }
        self.stacks.lock().unwrap().retain(|s| s.id != id);
        Ok(204)
    }

    async fn fetch_source_stacks(&self, url: &str) -> Result<Vec<Value>, CatalogError> {
        if *self.fail_source.lock().unwrap() {
            return Err(CatalogError::EmptyBody(url.to_string()));
        }
        Ok(self.source_stacks.lock().unwrap().clone())
    }
}
