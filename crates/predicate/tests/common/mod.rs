//! Test infrastructure for the predicate compiler.
//!
//! Provides search parameter fixtures shaped like the FHIR base definitions
//! and a harness that compiles criteria and evaluates the result against an
//! in-memory index.

#![allow(dead_code)]

pub mod harness;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;
