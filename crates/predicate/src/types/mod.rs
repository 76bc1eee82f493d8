//! Core types for the predicate compiler.
//!
//! This module provides the fundamental types the compiler consumes:
//!
//! - [`SearchParamType`], [`SearchModifier`], [`SearchPrefix`] - parameter vocabulary
//! - [`Criterion`], [`SearchValue`] - typed criteria as produced by the query parser
//! - [`IndexRow`], [`IndexEntry`], [`RecordVersion`] - the index model predicates run against
//!
//! # Examples
//!
//! ## Building a criterion
//!
//! ```
//! use std::sync::Arc;
//! use helios_predicate::search::SearchParameterDefinition;
//! use helios_predicate::types::{Criterion, DateValue, SearchParamType, SearchPrefix, SearchValue};
//!
//! let birthdate = Arc::new(
//!     SearchParameterDefinition::new(
//!         "http://hl7.org/fhir/SearchParameter/individual-birthdate",
//!         "birthdate",
//!         SearchParamType::Date,
//!         "Patient.birthDate",
//!     )
//!     .with_base(vec!["Patient"]),
//! );
//!
//! let criterion = Criterion::new(birthdate).with_value(SearchValue::Date(
//!     DateValue::parse("2023").unwrap().with_prefix(SearchPrefix::Ge),
//! ));
//! assert_eq!(criterion.code(), "birthdate");
//! ```

mod criterion;
mod index;
mod search_params;
mod values;

pub use criterion::{ChainLink, Criterion, HAS_PARAMETER_URL, has_parameter};
pub use index::{
    IndexComparator, IndexEntry, IndexRow, IndexTable, RecordVersion, ResourceTypeId,
    SearchParamId,
};
pub use search_params::{ModifierKind, SearchModifier, SearchParamType, SearchPrefix};
pub use values::{
    CompositeValue, DatePrecision, DateValue, MAX_NUMBER_SCALE, NumberValue, QuantityValue,
    ReferenceValue, ReverseChain, ReverseChainCondition, SearchValue, TokenValue, UriValue,
    tolerance_band,
};
