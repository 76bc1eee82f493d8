//! Criteria: one named, typed search condition per parameter occurrence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::search::SearchParameterDefinition;

use super::search_params::{SearchModifier, SearchParamType};
use super::values::{ReverseChain, SearchValue};

/// Canonical URL of the built-in `_has` parameter.
pub const HAS_PARAMETER_URL: &str = "http://hl7.org/fhir/SearchParameter/Resource-has";

/// A single search criterion.
///
/// Alternative values combine by OR; separate criteria combine by AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Definition of the parameter being searched.
    pub parameter: Arc<SearchParameterDefinition>,

    /// Optional modifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<SearchModifier>,

    /// Alternative values (OR). Empty only with `:missing` or a chain link.
    #[serde(default)]
    pub values: Vec<SearchValue>,

    /// Forward chain link (e.g. `subject:Patient.name=Smith`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainLink>,
}

/// Criteria evaluated against the type a reference parameter points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLink {
    /// Type of the referenced record.
    pub target_type: String,
    /// Criteria the referenced record must satisfy (AND).
    pub criteria: Vec<Criterion>,
}

impl Criterion {
    /// Creates a criterion with no modifier and no values.
    pub fn new(parameter: Arc<SearchParameterDefinition>) -> Self {
        Self {
            parameter,
            modifier: None,
            values: Vec::new(),
            chain: None,
        }
    }

    /// Creates a `_has` criterion.
    pub fn has(reverse: ReverseChain) -> Self {
        Self::new(has_parameter()).with_value(SearchValue::Has(reverse))
    }

    /// Sets the modifier.
    pub fn with_modifier(mut self, modifier: SearchModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Adds an alternative value.
    pub fn with_value(mut self, value: SearchValue) -> Self {
        self.values.push(value);
        self
    }

    /// Adds several alternative values.
    pub fn with_values<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = SearchValue>,
    {
        self.values.extend(values);
        self
    }

    /// Chains this (reference) criterion to criteria on `target_type`.
    pub fn chained(mut self, target_type: impl Into<String>, criteria: Vec<Criterion>) -> Self {
        self.chain = Some(ChainLink {
            target_type: target_type.into(),
            criteria,
        });
        self
    }

    /// The parameter code.
    pub fn code(&self) -> &str {
        &self.parameter.code
    }

    /// The declared parameter type.
    pub fn param_type(&self) -> SearchParamType {
        self.parameter.param_type
    }

    /// Returns true if compiling this criterion needs the orchestrator
    /// (forward chain, `_has` or composite).
    pub fn is_chained(&self) -> bool {
        self.chain.is_some()
            || self.param_type() == SearchParamType::Composite
            || self.values.iter().any(|v| matches!(v, SearchValue::Has(_)))
    }

    /// Returns true if this is a `:missing` criterion.
    pub fn is_missing(&self) -> bool {
        matches!(self.modifier, Some(SearchModifier::Missing))
    }

    /// Number of forward hops in this criterion's chain, 0 when unchained.
    pub fn chain_depth(&self) -> usize {
        match &self.chain {
            Some(link) => {
                1 + link
                    .criteria
                    .iter()
                    .map(Criterion::chain_depth)
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }
}

/// Definition of the `_has` pseudo-parameter.
pub fn has_parameter() -> Arc<SearchParameterDefinition> {
    Arc::new(
        SearchParameterDefinition::new(HAS_PARAMETER_URL, "_has", SearchParamType::Special, "")
            .with_base(vec!["Resource"]),
    )
}
