//! Typed alternative values carried by a criterion.
//!
//! The upstream parser produces these already classified; the helpers here
//! exist so fixtures, tests and the explain binary can build them from the
//! usual FHIR textual forms.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::search::SearchParameterDefinition;

use super::criterion::Criterion;
use super::search_params::SearchPrefix;

/// Largest decimal scale whose tolerance band is still representable.
pub const MAX_NUMBER_SCALE: u32 = 27;

/// One alternative value of a criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchValue {
    /// A date, dateTime or period bound.
    Date(DateValue),
    /// A plain decimal.
    Number(NumberValue),
    /// A decimal with optional unit system and code.
    Quantity(QuantityValue),
    /// A coded value.
    Token(TokenValue),
    /// A string value.
    String(String),
    /// A URI.
    Uri(UriValue),
    /// A reference to another resource.
    Reference(ReferenceValue),
    /// One value-group of a composite parameter.
    Composite(CompositeValue),
    /// A reverse chain (`_has`).
    Has(ReverseChain),
    /// The boolean operand of `:missing`: `true` selects records without a
    /// row, `false` records with one.
    Missing(bool),
}

impl SearchValue {
    /// Short name of the value's shape, used in defect messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SearchValue::Date(_) => "date",
            SearchValue::Number(_) => "number",
            SearchValue::Quantity(_) => "quantity",
            SearchValue::Token(_) => "token",
            SearchValue::String(_) => "string",
            SearchValue::Uri(_) => "uri",
            SearchValue::Reference(_) => "reference",
            SearchValue::Composite(_) => "composite",
            SearchValue::Has(_) => "_has",
            SearchValue::Missing(_) => "missing",
        }
    }

    /// The comparator carried by this value, if any.
    pub fn prefix(&self) -> Option<SearchPrefix> {
        match self {
            SearchValue::Date(v) => v.prefix,
            SearchValue::Number(v) => v.prefix,
            SearchValue::Quantity(v) => v.prefix,
            _ => None,
        }
    }

    /// Creates a string value.
    pub fn string(value: impl Into<String>) -> Self {
        SearchValue::String(value.into())
    }

    /// Creates a token value from `code`, `system|code`, `|code` or `system|`.
    pub fn token(value: &str) -> Self {
        SearchValue::Token(TokenValue::parse(value))
    }
}

// ============================================================================
// Dates
// ============================================================================

/// Precision of a date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    /// Year only (YYYY).
    Year,
    /// Year and month (YYYY-MM).
    Month,
    /// Full date (YYYY-MM-DD).
    Day,
    /// Date with hour.
    Hour,
    /// Date with hour and minute.
    Minute,
    /// Date with time to seconds.
    Second,
    /// Date with time to milliseconds.
    Millisecond,
}

impl DatePrecision {
    /// Start of the next period after `start`.
    pub fn next_period(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DatePrecision::Year => start.checked_add_months(Months::new(12)),
            DatePrecision::Month => start.checked_add_months(Months::new(1)),
            DatePrecision::Day => start.checked_add_signed(Duration::days(1)),
            DatePrecision::Hour => start.checked_add_signed(Duration::hours(1)),
            DatePrecision::Minute => start.checked_add_signed(Duration::minutes(1)),
            DatePrecision::Second => start.checked_add_signed(Duration::seconds(1)),
            DatePrecision::Millisecond => start.checked_add_signed(Duration::milliseconds(1)),
        }
    }

    /// Start of the period before `start`.
    pub fn previous_period(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DatePrecision::Year => start.checked_sub_months(Months::new(12)),
            DatePrecision::Month => start.checked_sub_months(Months::new(1)),
            DatePrecision::Day => start.checked_sub_signed(Duration::days(1)),
            DatePrecision::Hour => start.checked_sub_signed(Duration::hours(1)),
            DatePrecision::Minute => start.checked_sub_signed(Duration::minutes(1)),
            DatePrecision::Second => start.checked_sub_signed(Duration::seconds(1)),
            DatePrecision::Millisecond => start.checked_sub_signed(Duration::milliseconds(1)),
        }
    }
}

impl fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePrecision::Year => write!(f, "year"),
            DatePrecision::Month => write!(f, "month"),
            DatePrecision::Day => write!(f, "day"),
            DatePrecision::Hour => write!(f, "hour"),
            DatePrecision::Minute => write!(f, "minute"),
            DatePrecision::Second => write!(f, "second"),
            DatePrecision::Millisecond => write!(f, "millisecond"),
        }
    }
}

/// A date search value: the start of a period plus its precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    /// Start of the period, normalized to UTC.
    pub instant: Option<DateTime<Utc>>,
    /// How much of the value was specified.
    pub precision: DatePrecision,
    /// Comparator, `eq` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<SearchPrefix>,
}

impl DateValue {
    /// Creates a date value from a start instant and precision.
    pub fn new(instant: DateTime<Utc>, precision: DatePrecision) -> Self {
        Self {
            instant: Some(instant),
            precision,
            prefix: None,
        }
    }

    /// Parses a FHIR date/dateTime (`2023`, `2023-06`, `2023-06-01`,
    /// `2023-06-01T10:30`, `2023-06-01T10:30:00.250+02:00`).
    ///
    /// Values without an offset are taken as UTC.
    pub fn parse(text: &str) -> Option<Self> {
        let (instant, precision) = parse_partial_datetime(text)?;
        Some(Self::new(instant, precision))
    }

    /// Sets the comparator.
    pub fn with_prefix(mut self, prefix: SearchPrefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Half-open `[start, end)` window covered by this value. `end` is the
    /// start of the next period, so instants of any resolution fall on
    /// exactly one side of it.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.instant?;
        let end = self.precision.next_period(start)?;
        Some((start, end))
    }

    /// The half-open window widened by one precision unit on either side.
    pub fn approximate_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.instant?;
        let wide_start = self.precision.previous_period(start)?;
        let wide_end = self
            .precision
            .next_period(self.precision.next_period(start)?)?;
        Some((wide_start, wide_end))
    }
}

fn parse_partial_datetime(text: &str) -> Option<(DateTime<Utc>, DatePrecision)> {
    let (date_part, time_part) = match text.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (text, None),
    };

    let mut parts = date_part.split('-');
    let year_str = parts.next()?;
    if year_str.len() != 4 {
        return None;
    }
    let year: i32 = year_str.parse().ok()?;
    let month: Option<u32> = match parts.next() {
        Some(m) => Some(m.parse().ok()?),
        None => None,
    };
    let day: Option<u32> = match parts.next() {
        Some(d) => Some(d.parse().ok()?),
        None => None,
    };
    if parts.next().is_some() {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))?;

    let Some(time_part) = time_part else {
        let precision = match (month, day) {
            (None, _) => DatePrecision::Year,
            (Some(_), None) => DatePrecision::Month,
            (Some(_), Some(_)) => DatePrecision::Day,
        };
        let naive = date.and_time(NaiveTime::MIN);
        return Some((Utc.from_utc_datetime(&naive), precision));
    };
    // A time is only meaningful on a full date
    day?;

    let (clock, offset_minutes) = split_offset(time_part)?;
    let mut fields = clock.split(':');
    let hour: u32 = fields.next()?.parse().ok()?;
    let (minute, mut precision) = match fields.next() {
        Some(m) => (m.parse::<u32>().ok()?, DatePrecision::Minute),
        None => (0, DatePrecision::Hour),
    };
    let (second, millis) = match fields.next() {
        Some(s) => {
            let (whole, frac) = match s.split_once('.') {
                Some((w, f)) => (w, Some(f)),
                None => (s, None),
            };
            precision = DatePrecision::Second;
            let millis = match frac {
                Some(f) => {
                    precision = DatePrecision::Millisecond;
                    let digits: String = f.chars().chain("000".chars()).take(3).collect();
                    digits.parse::<u32>().ok()?
                }
                None => 0,
            };
            (whole.parse::<u32>().ok()?, millis)
        }
        None => (0, 0),
    };
    if fields.next().is_some() {
        return None;
    }

    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
    let local = NaiveDateTime::new(date, time);
    let utc = local.checked_sub_signed(Duration::minutes(offset_minutes))?;
    Some((Utc.from_utc_datetime(&utc), precision))
}

/// Splits a trailing `Z` or `±hh:mm` offset from a time string.
fn split_offset(time: &str) -> Option<(&str, i64)> {
    if let Some(clock) = time.strip_suffix('Z') {
        return Some((clock, 0));
    }
    match time.rfind(['+', '-']) {
        Some(pos) => {
            let (clock, offset) = time.split_at(pos);
            let sign = if offset.starts_with('-') { -1 } else { 1 };
            let (h, m) = offset[1..].split_once(':')?;
            let minutes = h.parse::<i64>().ok()? * 60 + m.parse::<i64>().ok()?;
            Some((clock, sign * minutes))
        }
        None => Some((time, 0)),
    }
}

// ============================================================================
// Numbers and quantities
// ============================================================================

/// A number search value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberValue {
    /// The magnitude; its scale carries the implied precision.
    pub value: Option<Decimal>,
    /// Comparator, `eq` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<SearchPrefix>,
}

impl NumberValue {
    /// Creates a number value.
    pub fn new(value: Decimal) -> Self {
        Self {
            value: Some(value),
            prefix: None,
        }
    }

    /// Sets the comparator.
    pub fn with_prefix(mut self, prefix: SearchPrefix) -> Self {
        self.prefix = Some(prefix);
        self
    }
}

/// A quantity search value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityValue {
    /// The magnitude; its scale carries the implied precision.
    pub value: Option<Decimal>,
    /// Comparator, `eq` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<SearchPrefix>,
    /// Unit system (e.g. `http://unitsofmeasure.org`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Unit code, or unit text when no system is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl QuantityValue {
    /// Creates a unitless quantity.
    pub fn new(value: Decimal) -> Self {
        Self {
            value: Some(value),
            prefix: None,
            system: None,
            code: None,
        }
    }

    /// Sets the unit system and code.
    pub fn with_unit(mut self, system: Option<&str>, code: impl Into<String>) -> Self {
        self.system = system.map(str::to_string);
        self.code = Some(code.into());
        self
    }

    /// Sets the comparator.
    pub fn with_prefix(mut self, prefix: SearchPrefix) -> Self {
        self.prefix = Some(prefix);
        self
    }
}

impl From<NumberValue> for QuantityValue {
    fn from(n: NumberValue) -> Self {
        Self {
            value: n.value,
            prefix: n.prefix,
            system: None,
            code: None,
        }
    }
}

/// Half-open tolerance band `[low, high)` implied by a decimal's scale.
///
/// `5.0` covers `[4.95, 5.05)` and `100` covers `[99.5, 100.5)`. Returns
/// `None` when the scale is too large or the band overflows.
pub fn tolerance_band(value: Decimal) -> Option<(Decimal, Decimal)> {
    let scale = value.scale();
    if scale > MAX_NUMBER_SCALE {
        return None;
    }
    let half = Decimal::new(5, scale + 1);
    Some((value.checked_sub(half)?, value.checked_add(half)?))
}

// ============================================================================
// Tokens, strings and URIs
// ============================================================================

/// A token value classified by match mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenValue {
    /// `code`: the code in any system.
    Code(String),
    /// `system|`: any code in the system.
    System(String),
    /// `system|code`: the code in the system.
    SystemAndCode {
        /// Code system.
        system: String,
        /// Code.
        code: String,
    },
    /// `|code`: the code with no system.
    CodeWithoutSystem(String),
}

impl TokenValue {
    /// Classifies a textual token.
    pub fn parse(value: &str) -> Self {
        match value.split_once('|') {
            Some(("", code)) => TokenValue::CodeWithoutSystem(code.to_string()),
            Some((system, "")) => TokenValue::System(system.to_string()),
            Some((system, code)) => TokenValue::SystemAndCode {
                system: system.to_string(),
                code: code.to_string(),
            },
            None => TokenValue::Code(value.to_string()),
        }
    }
}

/// A URI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriValue {
    /// The URI text.
    pub value: String,
    /// Whether the URI is absolute.
    pub absolute: bool,
}

impl UriValue {
    /// Creates a URI value, classifying it as absolute or relative.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let absolute = url::Url::parse(&value).is_ok();
        Self { value, absolute }
    }
}

// ============================================================================
// References
// ============================================================================

/// A parsed reference value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceValue {
    /// Service base of an absolute reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    /// Target type, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Logical id of the target.
    pub id: String,
    /// Specific version of the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ReferenceValue {
    /// Creates a relative reference.
    pub fn local(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            base_uri: None,
            resource_type: Some(resource_type.into()),
            id: id.into(),
            version: None,
        }
    }

    /// Sets the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Parses `id`, `Type/id`, `Type/id/_history/v` or an absolute URL ending
    /// in one of the latter two.
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty() {
            return None;
        }
        let absolute = value.contains("://");
        if absolute {
            url::Url::parse(value).ok()?;
        }

        let segments: Vec<&str> = value.trim_end_matches('/').split('/').collect();
        let n = segments.len();

        if n == 1 {
            return Some(Self {
                base_uri: None,
                resource_type: None,
                id: segments[0].to_string(),
                version: None,
            });
        }

        let (type_idx, version) = if n >= 4 && segments[n - 2] == "_history" {
            (n - 4, Some(segments[n - 1].to_string()))
        } else {
            (n - 2, None)
        };

        let resource_type = segments[type_idx];
        if !resource_type
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
        {
            return None;
        }
        let id = segments[type_idx + 1];
        if id.is_empty() {
            return None;
        }

        let base_uri = if type_idx > 0 {
            Some(segments[..type_idx].join("/"))
        } else {
            None
        };
        if base_uri.is_some() && !absolute {
            return None;
        }

        Some(Self {
            base_uri,
            resource_type: Some(resource_type.to_string()),
            id: id.to_string(),
            version,
        })
    }
}

impl fmt::Display for ReferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(base) = &self.base_uri {
            write!(f, "{}/", base)?;
        }
        if let Some(t) = &self.resource_type {
            write!(f, "{}/", t)?;
        }
        write!(f, "{}", self.id)?;
        if let Some(v) = &self.version {
            write!(f, "/_history/{}", v)?;
        }
        Ok(())
    }
}

// ============================================================================
// Composite and reverse chains
// ============================================================================

/// One value-group of a composite criterion: its criteria are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeValue {
    /// Component criteria.
    pub criteria: Vec<Criterion>,
}

/// A `_has` link: records of `source_type` whose `reference_param` points at
/// the searched record and which satisfy `condition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverseChain {
    /// Type owning the back-reference.
    pub source_type: String,
    /// The back-reference parameter on `source_type`.
    pub reference_param: Arc<SearchParameterDefinition>,
    /// What the referencing records must satisfy.
    pub condition: ReverseChainCondition,
}

/// Terminal criterion or further reverse link of a `_has` chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverseChainCondition {
    /// Leaf criterion evaluated against `source_type`.
    Criterion(Box<Criterion>),
    /// Another `_has` hop, evaluated relative to `source_type`.
    Nested(Box<ReverseChain>),
}

impl ReverseChain {
    /// Creates a terminal reverse chain.
    pub fn new(
        source_type: impl Into<String>,
        reference_param: Arc<SearchParameterDefinition>,
        criterion: Criterion,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            reference_param,
            condition: ReverseChainCondition::Criterion(Box::new(criterion)),
        }
    }

    /// Creates a reverse chain whose condition is a further `_has` hop.
    pub fn nested(
        source_type: impl Into<String>,
        reference_param: Arc<SearchParameterDefinition>,
        inner: ReverseChain,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            reference_param,
            condition: ReverseChainCondition::Nested(Box::new(inner)),
        }
    }

    /// Returns true if this hop ends in a criterion.
    pub fn is_terminal(&self) -> bool {
        matches!(self.condition, ReverseChainCondition::Criterion(_))
    }

    /// Number of `_has` hops, counting this one.
    pub fn depth(&self) -> usize {
        match &self.condition {
            ReverseChainCondition::Criterion(_) => 1,
            ReverseChainCondition::Nested(inner) => 1 + inner.depth(),
        }
    }
}
