//! Helios FHIR Server Search Predicate Compiler
//!
//! This crate turns parsed FHIR search criteria into one composable boolean
//! predicate over the record-version index. Storage backends consume the
//! predicate as a filter; this crate never reads or writes resources itself.
//!
//! # Features
//!
//! - **All indexed types**: date, number, quantity, token, string, uri and
//!   reference criteria, each with the comparators and modifiers FHIR allows
//! - **Window semantics**: dates match by interval overlap, numbers and
//!   quantities by the tolerance band implied by their precision, composed
//!   with comparators stored on the index row
//! - **Chains**: composite criteria, forward chains and `_has` reverse chains,
//!   with explicit depth limits
//! - **Introspectable output**: the result is a small AST that can be
//!   rendered, serialized, rewritten and evaluated
//! - **Cancellation**: every async step honours the caller's token
//!
//! # Architecture
//!
//! - [`types`] - Criteria, search values and index row shapes
//! - [`search`] - Search parameter metadata and the resource type registry
//! - [`predicate`] - The predicate AST, its evaluation and rewrite passes
//! - [`compiler`] - The orchestrator and one handler per parameter type
//! - [`tenant`] - Tenant, server identity cache and request context
//! - [`store`] - The index store collaborator used to resolve chains
//! - [`config`] - Compiler configuration
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```
//! use helios_predicate::predicate::Predicate;
//! use helios_predicate::types::{
//!     DateValue, IndexEntry, IndexRow, RecordVersion, SearchParamId,
//! };
//! use helios_predicate::compiler::DateHandler;
//! use helios_predicate::search::SearchParameterDefinition;
//! use helios_predicate::types::{IndexTable, SearchParamType};
//!
//! let date = SearchParameterDefinition::new(
//!     "http://hl7.org/fhir/SearchParameter/clinical-date",
//!     "date",
//!     SearchParamType::Date,
//!     "Observation.effective",
//! );
//!
//! // "2023" covers the whole year.
//! let condition = DateHandler::build(&date, &DateValue::parse("2023").unwrap()).unwrap();
//! let predicate = Predicate::exists(IndexTable::Date, date.id(), condition);
//!
//! let june = DateValue::parse("2023-06-01").unwrap().instant;
//! let entries = vec![IndexEntry {
//!     record: RecordVersion::new("Observation", "o1", 1),
//!     param_id: SearchParamId::new("http://hl7.org/fhir/SearchParameter/clinical-date"),
//!     row: IndexRow::Date { low: june, high: june },
//! }];
//! assert!(predicate.matches("o1", &entries));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod compiler;
pub mod config;
pub mod error;
pub mod predicate;
pub mod search;
pub mod store;
pub mod tenant;
pub mod types;

// Re-export commonly used types at crate root
pub use compiler::PredicateCompiler;
pub use config::{CompilerConfig, ConfigError};
pub use error::{BackendError, ChainError, DefectError, PredicateError, PredicateResult};
pub use predicate::Predicate;
pub use store::{InMemoryIndexStore, IndexStore};
pub use tenant::{IdentityCache, SearchContext, ServerIdentity, TenantId};
pub use types::Criterion;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
