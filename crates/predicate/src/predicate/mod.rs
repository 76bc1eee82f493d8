//! The compiled predicate and the operations on it.
//!
//! - [`ast`] - [`Predicate`] over record versions and [`RowCondition`] over rows
//! - [`eval`] - evaluation over in-memory index rows
//! - [`display`] - SQL-like rendering
//! - [`rewrite`] - the reference-set rewrite pass

pub mod ast;
pub mod display;
pub mod eval;
pub mod rewrite;

pub use ast::{CompareOp, Field, Operand, Predicate, RowCondition, RowMatch};
pub use rewrite::{collapse_alternatives, collapse_reference_sets};
