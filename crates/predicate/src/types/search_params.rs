//! FHIR search parameter types.
//!
//! This module defines the vocabulary shared by every criterion: the declared
//! parameter types, the modifiers that change match semantics and the
//! comparison prefixes applicable to ordered types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// FHIR search parameter types.
///
/// See: https://build.fhir.org/search.html#ptypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchParamType {
    /// A simple string, like a name or description.
    String,
    /// A search against a URI.
    Uri,
    /// A search for a number.
    Number,
    /// A search for a date, dateTime, or period.
    Date,
    /// A quantity, with a number and units.
    Quantity,
    /// A code from a code system or value set.
    Token,
    /// A reference to another resource.
    Reference,
    /// A composite search parameter that combines others.
    Composite,
    /// Special search parameters (`_has`).
    Special,
}

impl SearchParamType {
    /// Returns true for types whose values are ordered and accept comparison prefixes.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            SearchParamType::Number | SearchParamType::Date | SearchParamType::Quantity
        )
    }

    /// Modifiers the compiler understands for this type.
    ///
    /// A parameter definition may narrow this set but never widen it.
    pub fn supported_modifiers(&self) -> &'static [ModifierKind] {
        match self {
            SearchParamType::String => &[
                ModifierKind::Missing,
                ModifierKind::Exact,
                ModifierKind::Contains,
            ],
            SearchParamType::Uri => &[
                ModifierKind::Missing,
                ModifierKind::Exact,
                ModifierKind::Contains,
                ModifierKind::Above,
                ModifierKind::Below,
            ],
            SearchParamType::Reference => &[ModifierKind::Missing, ModifierKind::Type],
            SearchParamType::Number
            | SearchParamType::Date
            | SearchParamType::Quantity
            | SearchParamType::Token => &[ModifierKind::Missing],
            SearchParamType::Composite | SearchParamType::Special => &[],
        }
    }

    /// Comparison prefixes the compiler understands for this type.
    pub fn supported_prefixes(&self) -> &'static [SearchPrefix] {
        match self {
            SearchParamType::Date => &[
                SearchPrefix::Eq,
                SearchPrefix::Ne,
                SearchPrefix::Gt,
                SearchPrefix::Lt,
                SearchPrefix::Ge,
                SearchPrefix::Le,
                SearchPrefix::Sa,
                SearchPrefix::Eb,
                SearchPrefix::Ap,
            ],
            SearchParamType::Number | SearchParamType::Quantity => &[
                SearchPrefix::Eq,
                SearchPrefix::Ne,
                SearchPrefix::Gt,
                SearchPrefix::Lt,
                SearchPrefix::Ge,
                SearchPrefix::Le,
                SearchPrefix::Ap,
            ],
            _ => &[SearchPrefix::Eq],
        }
    }
}

impl fmt::Display for SearchParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchParamType::String => write!(f, "string"),
            SearchParamType::Uri => write!(f, "uri"),
            SearchParamType::Number => write!(f, "number"),
            SearchParamType::Date => write!(f, "date"),
            SearchParamType::Quantity => write!(f, "quantity"),
            SearchParamType::Token => write!(f, "token"),
            SearchParamType::Reference => write!(f, "reference"),
            SearchParamType::Composite => write!(f, "composite"),
            SearchParamType::Special => write!(f, "special"),
        }
    }
}

impl FromStr for SearchParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(SearchParamType::String),
            "uri" => Ok(SearchParamType::Uri),
            "number" => Ok(SearchParamType::Number),
            "date" => Ok(SearchParamType::Date),
            "quantity" => Ok(SearchParamType::Quantity),
            "token" => Ok(SearchParamType::Token),
            "reference" => Ok(SearchParamType::Reference),
            "composite" => Ok(SearchParamType::Composite),
            "special" => Ok(SearchParamType::Special),
            _ => Err(format!("unknown search parameter type: {}", s)),
        }
    }
}

/// Search modifiers that can be applied to a criterion.
///
/// See: https://build.fhir.org/search.html#modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchModifier {
    /// Match if value is missing (or present, with `false`).
    Missing,
    /// Exact string match.
    Exact,
    /// Contains substring.
    Contains,
    /// Restrict a reference to a resource type (e.g. `subject:Patient`).
    Type(String),
    /// Hierarchical match upwards (uri: suffix match).
    Above,
    /// Hierarchical match downwards (uri: prefix match).
    Below,
}

impl SearchModifier {
    /// Parses a modifier string, returning None for unknown modifiers.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "missing" => Some(SearchModifier::Missing),
            "exact" => Some(SearchModifier::Exact),
            "contains" => Some(SearchModifier::Contains),
            "above" => Some(SearchModifier::Above),
            "below" => Some(SearchModifier::Below),
            _ => {
                // Resource type modifiers start with an uppercase letter
                if s.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
                    Some(SearchModifier::Type(s.to_string()))
                } else {
                    None
                }
            }
        }
    }

    /// Returns the kind of this modifier, dropping any payload.
    pub fn kind(&self) -> ModifierKind {
        match self {
            SearchModifier::Missing => ModifierKind::Missing,
            SearchModifier::Exact => ModifierKind::Exact,
            SearchModifier::Contains => ModifierKind::Contains,
            SearchModifier::Type(_) => ModifierKind::Type,
            SearchModifier::Above => ModifierKind::Above,
            SearchModifier::Below => ModifierKind::Below,
        }
    }

    /// Returns true if this modifier is valid for the given parameter type.
    pub fn is_valid_for(&self, param_type: SearchParamType) -> bool {
        param_type.supported_modifiers().contains(&self.kind())
    }
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchModifier::Type(t) => write!(f, "{}", t),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Payload-free discriminant of [`SearchModifier`], used in legal-modifier sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    /// `:missing`
    Missing,
    /// `:exact`
    Exact,
    /// `:contains`
    Contains,
    /// `:[type]`
    Type,
    /// `:above`
    Above,
    /// `:below`
    Below,
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierKind::Missing => write!(f, "missing"),
            ModifierKind::Exact => write!(f, "exact"),
            ModifierKind::Contains => write!(f, "contains"),
            ModifierKind::Type => write!(f, "[type]"),
            ModifierKind::Above => write!(f, "above"),
            ModifierKind::Below => write!(f, "below"),
        }
    }
}

/// Comparison prefixes for search parameters.
///
/// See: https://build.fhir.org/search.html#prefix
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchPrefix {
    /// Equal (default).
    #[default]
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
    /// Starts after.
    Sa,
    /// Ends before.
    Eb,
    /// Approximately equal.
    Ap,
}

impl fmt::Display for SearchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPrefix::Eq => write!(f, "eq"),
            SearchPrefix::Ne => write!(f, "ne"),
            SearchPrefix::Gt => write!(f, "gt"),
            SearchPrefix::Lt => write!(f, "lt"),
            SearchPrefix::Ge => write!(f, "ge"),
            SearchPrefix::Le => write!(f, "le"),
            SearchPrefix::Sa => write!(f, "sa"),
            SearchPrefix::Eb => write!(f, "eb"),
            SearchPrefix::Ap => write!(f, "ap"),
        }
    }
}

impl FromStr for SearchPrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(SearchPrefix::Eq),
            "ne" => Ok(SearchPrefix::Ne),
            "gt" => Ok(SearchPrefix::Gt),
            "lt" => Ok(SearchPrefix::Lt),
            "ge" => Ok(SearchPrefix::Ge),
            "le" => Ok(SearchPrefix::Le),
            "sa" => Ok(SearchPrefix::Sa),
            "eb" => Ok(SearchPrefix::Eb),
            "ap" => Ok(SearchPrefix::Ap),
            _ => Err(format!("unknown search prefix: {}", s)),
        }
    }
}

impl SearchPrefix {
    /// Extracts a prefix from the beginning of a value string.
    ///
    /// Returns the prefix and the remaining value.
    pub fn extract(value: &str) -> (Self, &str) {
        if value.len() >= 2 && value.is_char_boundary(2) {
            let prefix = &value[..2];
            if let Ok(p) = prefix.parse() {
                return (p, &value[2..]);
            }
        }
        (SearchPrefix::Eq, value)
    }

    /// Returns true if this prefix is valid for the given parameter type.
    pub fn is_valid_for(&self, param_type: SearchParamType) -> bool {
        param_type.supported_prefixes().contains(self)
    }
}
