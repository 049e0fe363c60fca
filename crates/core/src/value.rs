use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// String-keyed map of values used for node inputs, outputs and options.
pub type ValueMap = BTreeMap<String, Value>;

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Dynamic value flowing between stages.
///
/// The same enum carries both native values (what a node computes with) and
/// wrapped values (the canonical shape a [`WrappedType`](crate::WrappedType)
/// produces). Dates serialize as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit floating-point number.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// A point in time.
    Date(DateTime<Utc>),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values.
    Map(ValueMap),
}

impl Value {
    /// Convert a `serde_json::Value` into a runtime `Value`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => {
                Self::List(arr.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(obj) => Self::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert this value into a `serde_json::Value`.
    ///
    /// Integral numbers are emitted as JSON integers; non-finite numbers
    /// become `null`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
            }
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::List(v) => serde_json::Value::Array(v.iter().map(Self::to_json).collect()),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Returns `true` if this value is considered truthy.
    ///
    /// - `Null` is falsy.
    /// - `Bool` is its own truthiness.
    /// - `Number(0.0)` and `NaN` are falsy.
    /// - Empty strings, lists, and maps are falsy.
    /// - Dates are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Date(_) => true,
            Self::List(v) => !v.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns a string representation of the value type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Returns a human-readable display string for the value.
    pub fn display_string(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::List(_) | Self::Map(_) => self.to_json().to_string(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Access a field by name on a map value.
    pub fn field(&self, name: &str) -> Option<&Self> {
        self.as_map().and_then(|m| m.get(name))
    }

    /// Resolve a dotted path (`"date.years.value"`) through nested maps.
    ///
    /// Numeric segments index into lists. Returns `None` as soon as a
    /// segment cannot be resolved.
    pub fn get_path(&self, path: &str) -> Option<&Self> {
        path.split('.').try_fold(self, |current, segment| match current {
            Self::Map(m) => m.get(segment),
            Self::List(v) => segment.parse::<usize>().ok().and_then(|i| v.get(i)),
            _ => None,
        })
    }
}

/// Resolve a dotted path inside a value map.
///
/// The first segment selects the map entry; the remainder is resolved with
/// [`Value::get_path`].
pub fn lookup_path<'a>(map: &'a ValueMap, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        Some((head, rest)) => map.get(head).and_then(|v| v.get_path(rest)),
        None => map.get(path),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<ValueMap> for Value {
    fn from(m: ValueMap) -> Self {
        Self::Map(m)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_conversion_preserves_shape() {
        let json = json!({"a": 1, "b": [true, null, "x"], "c": {"d": 1.5}});
        let value = Value::from_json(json.clone());
        assert_eq!(value.field("a"), Some(&Value::Number(1.0)));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        assert_eq!(Value::Number(42.0).to_json(), json!(42));
        assert_eq!(Value::Number(0.25).to_json(), json!(0.25));
        assert_eq!(Value::Number(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn dates_serialize_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            Value::Date(date).to_json(),
            json!("2024-03-09T14:05:07.000Z")
        );
    }

    #[test]
    fn serde_goes_through_json() {
        let value: Value = serde_json::from_str(r#"{"value": 3}"#).unwrap();
        assert_eq!(value.field("value"), Some(&Value::Number(3.0)));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"value":3}"#);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(!Value::Map(ValueMap::new()).is_truthy());
    }

    #[test]
    fn dotted_paths() {
        let value = Value::from_json(json!({
            "date": {"years": {"value": 2024}},
            "list": [{"value": "first"}]
        }));
        assert_eq!(
            value.get_path("date.years.value"),
            Some(&Value::Number(2024.0))
        );
        assert_eq!(
            value.get_path("list.0.value"),
            Some(&Value::String("first".into()))
        );
        assert_eq!(value.get_path("date.months"), None);
        assert_eq!(value.get_path("date.years.value.deeper"), None);
    }

    #[test]
    fn lookup_path_in_map() {
        let mut map = ValueMap::new();
        map.insert(
            "result".into(),
            Value::from_json(json!({"value": true})),
        );
        assert_eq!(
            lookup_path(&map, "result.value"),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            lookup_path(&map, "result"),
            Some(&Value::from_json(json!({"value": true})))
        );
        assert_eq!(lookup_path(&map, "missing"), None);
    }
}
