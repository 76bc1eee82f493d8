//! SearchParameter definitions and the resource type registry.
//!
//! A definition carries everything the compiler checks a criterion against:
//! type, base, reference targets, status and the legal comparator and
//! modifier sets. The resource type registry maps type names to stable
//! identifiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ModifierKind, ResourceTypeId, SearchParamId, SearchParamType, SearchPrefix};

use super::errors::RegistryError;

/// Status of a SearchParameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchParameterStatus {
    /// Active - can be used in searches.
    #[default]
    Active,
    /// Draft - informational, not yet active.
    Draft,
    /// Retired - disabled, not usable.
    Retired,
}

impl SearchParameterStatus {
    /// Returns true if this status allows the parameter to be used in searches.
    pub fn is_usable(&self) -> bool {
        *self == SearchParameterStatus::Active
    }
}

impl std::fmt::Display for SearchParameterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchParameterStatus::Active => write!(f, "active"),
            SearchParameterStatus::Draft => write!(f, "draft"),
            SearchParameterStatus::Retired => write!(f, "retired"),
        }
    }
}

/// Component of a composite search parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeComponentDef {
    /// Definition URL of the component parameter.
    pub definition: String,
    /// FHIRPath expression for extracting this component.
    pub expression: String,
}

/// Complete definition of a SearchParameter.
///
/// Besides identity and type, a definition carries the comparators and
/// modifiers the server accepts for it. When those lists are absent every
/// comparator or modifier the type supports is legal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameterDefinition {
    /// Canonical URL (unique identifier).
    pub url: String,

    /// Parameter code (the URL param name, e.g., "name", "identifier").
    pub code: String,

    /// The parameter type.
    #[serde(rename = "type")]
    pub param_type: SearchParamType,

    /// FHIRPath expression for extracting values.
    #[serde(default)]
    pub expression: String,

    /// Resource types this parameter applies to.
    #[serde(default)]
    pub base: Vec<String>,

    /// Target resource types (for reference parameters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<String>>,

    /// Components (for composite parameters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Vec<CompositeComponentDef>>,

    /// Current status.
    #[serde(default)]
    pub status: SearchParameterStatus,

    /// Supported modifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<Vec<ModifierKind>>,

    /// Comparators supported (for number/date/quantity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<Vec<SearchPrefix>>,
}

impl SearchParameterDefinition {
    /// Creates a new SearchParameter definition.
    pub fn new(
        url: impl Into<String>,
        code: impl Into<String>,
        param_type: SearchParamType,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            code: code.into(),
            param_type,
            expression: expression.into(),
            base: Vec::new(),
            target: None,
            component: None,
            status: SearchParameterStatus::Active,
            modifier: None,
            comparator: None,
        }
    }

    /// Sets the base resource types.
    pub fn with_base<I, S>(mut self, base: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base = base.into_iter().map(Into::into).collect();
        self
    }

    /// Sets target types for reference parameters.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the components of a composite parameter.
    pub fn with_components(mut self, components: Vec<CompositeComponentDef>) -> Self {
        self.component = Some(components);
        self
    }

    /// Restricts the modifiers accepted for this parameter.
    pub fn with_modifiers(mut self, modifiers: Vec<ModifierKind>) -> Self {
        self.modifier = Some(modifiers);
        self
    }

    /// Restricts the comparators accepted for this parameter.
    pub fn with_comparators(mut self, comparators: Vec<SearchPrefix>) -> Self {
        self.comparator = Some(comparators);
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: SearchParameterStatus) -> Self {
        self.status = status;
        self
    }

    /// The stable identifier index rows are keyed by.
    pub fn id(&self) -> SearchParamId {
        SearchParamId::new(self.url.clone())
    }

    /// Returns whether this is a composite parameter.
    pub fn is_composite(&self) -> bool {
        self.param_type == SearchParamType::Composite
    }

    /// Returns whether this parameter applies to the given resource type.
    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.base
            .iter()
            .any(|b| b == resource_type || b == "Resource" || b == "DomainResource")
    }

    /// Returns whether this reference parameter may point at `resource_type`.
    ///
    /// A reference without declared targets may point at anything.
    pub fn can_target(&self, resource_type: &str) -> bool {
        match &self.target {
            Some(targets) if !targets.is_empty() => targets.iter().any(|t| t == resource_type),
            _ => true,
        }
    }

    /// Modifiers legal on this parameter: the declared set narrowed to what
    /// the type supports.
    pub fn legal_modifiers(&self) -> Vec<ModifierKind> {
        let supported = self.param_type.supported_modifiers();
        match &self.modifier {
            Some(declared) => supported
                .iter()
                .copied()
                .filter(|m| declared.contains(m))
                .collect(),
            None => supported.to_vec(),
        }
    }

    /// Comparators legal on this parameter: the declared set narrowed to what
    /// the type supports.
    pub fn legal_prefixes(&self) -> Vec<SearchPrefix> {
        let supported = self.param_type.supported_prefixes();
        match &self.comparator {
            Some(declared) => supported
                .iter()
                .copied()
                .filter(|p| *p == SearchPrefix::Eq || declared.contains(p))
                .collect(),
            None => supported.to_vec(),
        }
    }
}

/// Maps resource type names to stable identifiers.
///
/// Identifiers are assigned in registration order and never reused.
#[derive(Debug, Clone, Default)]
pub struct ResourceTypeRegistry {
    by_name: BTreeMap<String, ResourceTypeId>,
    names: Vec<String>,
}

impl ResourceTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given types.
    pub fn with_types<I, S>(types: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for t in types {
            registry.register(t)?;
        }
        Ok(registry)
    }

    /// Registers a type, returning its identifier. Idempotent.
    pub fn register(&mut self, name: impl Into<String>) -> Result<ResourceTypeId, RegistryError> {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return Ok(*id);
        }
        let id = u16::try_from(self.names.len())
            .map(ResourceTypeId)
            .map_err(|_| RegistryError::TooManyResourceTypes {
                resource_type: name.clone(),
            })?;
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        Ok(id)
    }

    /// Returns the identifier of a type.
    pub fn id_of(&self, name: &str) -> Option<ResourceTypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of an identifier.
    pub fn name_of(&self, id: ResourceTypeId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Returns true if the type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
