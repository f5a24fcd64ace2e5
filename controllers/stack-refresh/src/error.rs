//! Controller-specific error types.
//!
//! This module defines error types specific to the stack-refresh controller
//! that are not covered by upstream library errors.

use catalog_client::CatalogError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the stack-refresh controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Stack catalog API error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pod cache did not complete its initial sync in time.
    /// This is a startup failure (connectivity or RBAC), not a runtime fault.
    #[error("Timed out waiting for the pod cache to sync")]
    SyncTimeout,

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
