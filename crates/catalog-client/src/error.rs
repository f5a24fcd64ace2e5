//! Stack catalog client errors

use thiserror::Error;

/// Errors that can occur when interacting with the stack catalog API
/// or a remote stack source.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog API returned an error
    #[error("Catalog API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A body was expected but the response was empty
    #[error("Empty response body from {0}")]
    EmptyBody(String),
}
