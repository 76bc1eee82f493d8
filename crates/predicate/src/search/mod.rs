//! Search parameter metadata.
//!
//! - [`registry`] - SearchParameter definitions with their legal comparator
//!   and modifier sets, plus the resource type registry
//! - [`errors`] - Registry error types
//!
//! Criteria reference their definition by `Arc`; the definitions themselves
//! are loaded and owned upstream.

pub mod errors;
pub mod registry;

pub use errors::RegistryError;
pub use registry::{
    CompositeComponentDef, ResourceTypeRegistry, SearchParameterDefinition, SearchParameterStatus,
};
