//! Search predicates and their wire encoding.
//!
//! # Design
//! Field filters are stored as already-encoded JSON values keyed by field
//! code, in insertion order. The typed helpers on [`Field`] produce the
//! shapes the platform expects for each field kind; anything else that
//! implements `Serialize` can be added with [`Fields::try_with`].
//!
//! The map always serializes wrapped as `{"tf": {...}}`, including when it
//! is empty.

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Per-field filters, serialized as `{"tf": {code: filter, ...}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(IndexMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the filter for `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace the filter for `key` using any serializable value.
    pub fn try_with<V: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &V) -> Result<Self, ApiError> {
        let value = serde_json::to_value(value).map_err(ApiError::EncodeFailure)?;
        self.0.insert(key.into(), value);
        Ok(self)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("tf", &self.0)?;
        map.end()
    }
}

/// Sort order for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortExpression {
    pub ascending: bool,
    pub field: String,
}

impl SortExpression {
    pub fn asc(field: &str) -> Self {
        Self {
            ascending: true,
            field: field.to_string(),
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            ascending: false,
            field: field.to_string(),
        }
    }
}

/// The filter envelope sent with every search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilter {
    #[serde(rename = "filter")]
    pub fields: Fields,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    #[serde(rename = "sortExpressions", skip_serializing_if = "Vec::is_empty")]
    pub sort_expressions: Vec<SortExpression>,
    #[serde(rename = "statusCode", skip_serializing_if = "Vec::is_empty")]
    pub status_codes: Vec<String>,
    #[serde(rename = "statusGroupId", skip_serializing_if = "Option::is_none")]
    pub status_group_id: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key, value);
        self
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(mut self, expression: SortExpression) -> Self {
        self.sort_expressions.push(expression);
        self
    }

    pub fn in_statuses<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn status_group(mut self, group_id: &str) -> Self {
        self.status_group_id = Some(group_id.to_string());
        self
    }
}

/// Constructors for the typed field filters.
pub struct Field;

impl Field {
    /// Filter for "Category" fields.
    pub fn category(code: &str) -> Category {
        Category(code.to_string())
    }

    /// Filter for "App" (cross-reference) fields.
    pub fn app(id: &str) -> AppRef {
        AppRef(id.to_string())
    }

    /// Unbounded filter for "Number" fields.
    pub fn number() -> NumberFilter {
        NumberFilter::default()
    }

    /// Unbounded filter for "Date" fields.
    pub fn date_time() -> DateFilter {
        DateFilter::default()
    }
}

/// Category code, encoded as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Category(pub String);

/// Reference to a record of another app, encoded as `[id]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRef(pub String);

impl Serialize for AppRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [&self.0].serialize(serializer)
    }
}

/// Lower bound of an unconstrained number filter, -2^63.
pub const NUMBER_MIN: f64 = i64::MIN as f64;
/// Upper bound of an unconstrained number filter, 2^63.
pub const NUMBER_MAX: f64 = -(i64::MIN as f64);

/// Inclusive `[min, max]` range over a "Number" field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberFilter {
    pub min: f64,
    pub max: f64,
}

impl Default for NumberFilter {
    fn default() -> Self {
        Self {
            min: NUMBER_MIN,
            max: NUMBER_MAX,
        }
    }
}

impl NumberFilter {
    pub fn from(mut self, value: f64) -> Self {
        self.min = value;
        self
    }

    pub fn to(mut self, value: f64) -> Self {
        self.max = value;
        self
    }

    pub fn equal(self, value: f64) -> Self {
        self.from(value).to(value)
    }
}

const DATE_MIN: &str = "1970-01-01";
const DATE_MAX: &str = "3000-01-01";

/// `[min, max]` range over a "Date" field, bounds encoded as RFC 3339 UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFilter {
    pub min: String,
    pub max: String,
}

impl Default for DateFilter {
    fn default() -> Self {
        Self {
            min: DATE_MIN.to_string(),
            max: DATE_MAX.to_string(),
        }
    }
}

impl DateFilter {
    pub fn from<Tz: TimeZone>(mut self, date: DateTime<Tz>) -> Self {
        self.min = format_date(date);
        self
    }

    pub fn to<Tz: TimeZone>(mut self, date: DateTime<Tz>) -> Self {
        self.max = format_date(date);
        self
    }

    /// Match the whole UTC day containing `date`: `[00:00, 00:00 next day)`.
    pub fn equal_date<Tz: TimeZone>(self, date: DateTime<Tz>) -> Self {
        let day = date.with_timezone(&Utc).date_naive();
        let start = Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN));
        let end = start + Duration::days(1);
        self.from(start).to(end)
    }
}

fn format_date<Tz: TimeZone>(date: DateTime<Tz>) -> String {
    date.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn range(min: Value, max: Value) -> Value {
    let mut bounds = Map::new();
    bounds.insert("min".to_string(), min);
    bounds.insert("max".to_string(), max);
    Value::Object(bounds)
}

impl From<Category> for Value {
    fn from(filter: Category) -> Value {
        Value::String(filter.0)
    }
}

impl From<AppRef> for Value {
    fn from(filter: AppRef) -> Value {
        Value::Array(vec![Value::String(filter.0)])
    }
}

impl From<NumberFilter> for Value {
    fn from(filter: NumberFilter) -> Value {
        range(Value::from(filter.min), Value::from(filter.max))
    }
}

impl From<DateFilter> for Value {
    fn from(filter: DateFilter) -> Value {
        range(Value::String(filter.min), Value::String(filter.max))
    }
}
