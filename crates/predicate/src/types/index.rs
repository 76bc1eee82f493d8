//! The index model predicates are evaluated against.
//!
//! Rows are produced by the resource indexer, one table per value type, and
//! every row is keyed by the record version and the parameter that produced
//! it. The compiler only reads this shape; it never writes rows.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::search_params::SearchParamType;

/// Stable identifier of a resource type, assigned by the
/// [`ResourceTypeRegistry`](crate::search::ResourceTypeRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceTypeId(pub u16);

/// Stable identifier of a search parameter: its canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchParamId(String);

impl SearchParamId {
    /// Creates an identifier from a canonical URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the canonical URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One immutable version of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordVersion {
    /// Resource type name.
    pub resource_type: String,
    /// Logical id.
    pub resource_id: String,
    /// Version number.
    pub version_id: u32,
}

impl RecordVersion {
    /// Creates a record key.
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>, version_id: u32) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            version_id,
        }
    }
}

/// Index tables, one per value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexTable {
    /// String rows.
    String,
    /// Token rows.
    Token,
    /// Number and quantity rows.
    Quantity,
    /// Date rows.
    Date,
    /// URI rows.
    Uri,
    /// Reference rows.
    Reference,
}

impl IndexTable {
    /// The table holding rows for a parameter type, if the type is indexed directly.
    pub fn for_param_type(param_type: SearchParamType) -> Option<Self> {
        match param_type {
            SearchParamType::String => Some(IndexTable::String),
            SearchParamType::Token => Some(IndexTable::Token),
            SearchParamType::Number | SearchParamType::Quantity => Some(IndexTable::Quantity),
            SearchParamType::Date => Some(IndexTable::Date),
            SearchParamType::Uri => Some(IndexTable::Uri),
            SearchParamType::Reference => Some(IndexTable::Reference),
            SearchParamType::Composite | SearchParamType::Special => None,
        }
    }
}

impl fmt::Display for IndexTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexTable::String => write!(f, "string_index"),
            IndexTable::Token => write!(f, "token_index"),
            IndexTable::Quantity => write!(f, "quantity_index"),
            IndexTable::Date => write!(f, "date_index"),
            IndexTable::Uri => write!(f, "uri_index"),
            IndexTable::Reference => write!(f, "reference_index"),
        }
    }
}

/// Inequality flag carried by a stored quantity (`>10`, `<=3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexComparator {
    /// Stored value is `>` its magnitude.
    Gt,
    /// Stored value is `>=` its magnitude.
    Ge,
    /// Stored value is `<` its magnitude.
    Lt,
    /// Stored value is `<=` its magnitude.
    Le,
}

impl IndexComparator {
    /// Parses a FHIR quantity comparator (`<`, `<=`, `>=`, `>`).
    pub fn from_fhir(s: &str) -> Option<Self> {
        match s {
            ">" => Some(IndexComparator::Gt),
            ">=" => Some(IndexComparator::Ge),
            "<" => Some(IndexComparator::Lt),
            "<=" => Some(IndexComparator::Le),
            _ => None,
        }
    }
}

impl fmt::Display for IndexComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexComparator::Gt => write!(f, ">"),
            IndexComparator::Ge => write!(f, ">="),
            IndexComparator::Lt => write!(f, "<"),
            IndexComparator::Le => write!(f, "<="),
        }
    }
}

/// The value columns of one index row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "lowercase")]
pub enum IndexRow {
    /// A string row.
    String {
        /// Indexed text.
        value: String,
    },
    /// A token row.
    Token {
        /// Code system.
        #[serde(default)]
        system: Option<String>,
        /// Code.
        #[serde(default)]
        code: Option<String>,
    },
    /// A number or quantity row.
    Quantity {
        /// Magnitude.
        value: Decimal,
        /// Stored inequality, if the source value was one.
        #[serde(default)]
        comparator: Option<IndexComparator>,
        /// Unit system.
        #[serde(default)]
        system: Option<String>,
        /// Unit code.
        #[serde(default)]
        code: Option<String>,
        /// Human unit text.
        #[serde(default)]
        unit: Option<String>,
    },
    /// A date row: the inclusive window the source value covers.
    Date {
        /// Window start, unbounded when absent.
        #[serde(default)]
        low: Option<DateTime<Utc>>,
        /// Window end, unbounded when absent.
        #[serde(default)]
        high: Option<DateTime<Utc>>,
    },
    /// A URI row.
    Uri {
        /// The URI.
        value: String,
    },
    /// A reference row.
    Reference {
        /// Service base; absent for references local to this server.
        #[serde(default)]
        base_uri: Option<String>,
        /// Target type.
        #[serde(default)]
        resource_type: Option<String>,
        /// Target logical id.
        resource_id: String,
        /// Target version.
        #[serde(default)]
        version: Option<String>,
    },
}

impl IndexRow {
    /// The table this row belongs to.
    pub fn table(&self) -> IndexTable {
        match self {
            IndexRow::String { .. } => IndexTable::String,
            IndexRow::Token { .. } => IndexTable::Token,
            IndexRow::Quantity { .. } => IndexTable::Quantity,
            IndexRow::Date { .. } => IndexTable::Date,
            IndexRow::Uri { .. } => IndexTable::Uri,
            IndexRow::Reference { .. } => IndexTable::Reference,
        }
    }

    /// A plain number row.
    pub fn number(value: Decimal) -> Self {
        IndexRow::Quantity {
            value,
            comparator: None,
            system: None,
            code: None,
            unit: None,
        }
    }

    /// A local reference row.
    pub fn local_reference(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        IndexRow::Reference {
            base_uri: None,
            resource_type: Some(resource_type.into()),
            resource_id: resource_id.into(),
            version: None,
        }
    }
}

/// An index row keyed by its record version and producing parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The record version the row was extracted from.
    pub record: RecordVersion,
    /// The parameter that produced the row.
    pub param_id: SearchParamId,
    /// The row columns.
    pub row: IndexRow,
}
