//! Adapter error taxonomy

use crate::repository::StorageError;
use thiserror::Error;

/// Errors surfaced by the route adapter
///
/// None are retried or swallowed. Operations that fail midway leave their
/// earlier pending writes in place; wrap calls in one repository unit of
/// work and roll back if atomicity matters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The configured base path does not resolve to a node
    #[error("The route base path points to a non-existent path \"{0}\"")]
    Configuration(String),

    /// A node at a route path is neither a placeholder nor usable as a route
    #[error(
        "Encountered existing document at path \"{path}\" of shape \"{shape}\"; \
         the route tree should contain only route nodes and placeholders"
    )]
    Conflict { path: String, shape: String },

    /// A converted placeholder did not reload as a route node
    #[error(
        "Failed to migrate placeholder at \"{path}\" to a route node; \
         it reloaded with shape \"{shape}\""
    )]
    Migration { path: String, shape: String },

    /// The candidate URI has no segments
    #[error("URI \"{0}\" has no path segments")]
    EmptyUri(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;
