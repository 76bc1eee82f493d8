//! Search tests for every parameter type.
//!
//! Each module seeds an in-memory index, compiles criteria and checks which
//! records the resulting predicate selects.

pub mod composite_tests;
pub mod missing_tests;
pub mod number_tests;
pub mod quantity_tests;
pub mod reference_tests;
pub mod string_tests;
pub mod token_tests;
