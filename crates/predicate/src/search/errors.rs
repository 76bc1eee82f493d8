//! Registry error types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryError {
    /// The resource type registry has no identifiers left.
    TooManyResourceTypes {
        /// The type that could not be registered.
        resource_type: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::TooManyResourceTypes { resource_type } => {
                write!(
                    f,
                    "Cannot register resource type '{}': identifier space exhausted",
                    resource_type
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}
