//! Stack catalog API client
//!
//! Implements the REST client for the IDE server's stack catalog
//! (`/api/stack`) and for remote stack-source URLs.

use crate::catalog_trait::StackCatalogApi;
use crate::error::CatalogError;
use crate::models::StackRef;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Stack catalog API client
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
}

impl CatalogClient {
    /// Create a new catalog client with a 30 second request timeout.
    pub fn new() -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(CatalogError::Http)?;

        Ok(Self { client })
    }

    fn catalog_url(endpoint: &str, path: &str) -> String {
        format!("{}{}", endpoint.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl StackCatalogApi for CatalogClient {
    async fn list_stacks(&self, endpoint: &str) -> Result<Vec<StackRef>, CatalogError> {
        let url = Self::catalog_url(endpoint, "/api/stack");
        debug!("Listing stacks from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(CatalogError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(format!(
                "Failed to list stacks: {} - {}",
                status, body
            )));
        }

        let body = response.text().await.map_err(CatalogError::Http)?;
        if body.trim().is_empty() {
            return Err(CatalogError::EmptyBody(url));
        }

        let stacks: Vec<StackRef> = serde_json::from_str(&body)?;
        Ok(stacks)
    }

    async fn create_stack(&self, endpoint: &str, stack: &Value) -> Result<u16, CatalogError> {
        let url = Self::catalog_url(endpoint, "/api/stack/");
        debug!("Creating stack at {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(stack)
            .send()
            .await
            .map_err(CatalogError::Http)?;

        Ok(response.status().as_u16())
    }

    async fn delete_stack(&self, endpoint: &str, id: &str) -> Result<u16, CatalogError> {
        let url = Self::catalog_url(endpoint, &format!("/api/stack/{}", id));
        debug!("Deleting stack {} at {}", id, url);

        let response = self
            .client
            .delete(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(CatalogError::Http)?;

        Ok(response.status().as_u16())
    }

    async fn fetch_source_stacks(&self, url: &str) -> Result<Vec<Value>, CatalogError> {
        debug!("Fetching stack source from {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(CatalogError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(format!(
                "Failed to fetch stack source: {} - {}",
                status, body
            )));
        }

        let body = response.text().await.map_err(CatalogError::Http)?;
        if body.trim().is_empty() {
            return Err(CatalogError::EmptyBody(url.to_string()));
        }

        let stacks: Vec<Value> = serde_json::from_str(&body)?;
        Ok(stacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_url_strips_trailing_slash() {
        assert_eq!(
            CatalogClient::catalog_url("http://localhost:8080/", "/api/stack"),
            "http://localhost:8080/api/stack"
        );
        assert_eq!(
            CatalogClient::catalog_url("http://10.1.2.3:8080", "/api/stack/42"),
            "http://10.1.2.3:8080/api/stack/42"
        );
    }
}
