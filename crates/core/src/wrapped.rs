use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::validation::{FieldFailure, Validation, ValidationFailure, collect_failures};
use crate::value::{Value, ValueMap};

/// Shared handle to a wrapped type contract.
pub type TypeRef = Arc<dyn WrappedType>;

/// Primitive field tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Primitive {
    String,
    Number,
    Boolean,
}

impl Primitive {
    /// Every primitive, in declaration order.
    pub const ALL: [Self; 3] = [Self::String, Self::Number, Self::Boolean];

    /// Canonical identifier (`"STRING"`, `"NUMBER"`, `"BOOLEAN"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
        }
    }

    fn native_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Returns `true` if `value` is a native value of this primitive.
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_))
                | (Self::Number, Value::Number(_))
                | (Self::Boolean, Value::Bool(_))
        )
    }

    /// The wrapped type boxing this primitive.
    pub fn wrapped(self) -> TypeRef {
        match self {
            Self::String => string(),
            Self::Number => number(),
            Self::Boolean => boolean(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Primitive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown primitive type: {s}"))
    }
}

/// Type of a single field inside a wrapped value.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// A raw primitive slot (used by the primitive boxes themselves).
    Primitive(Primitive),
    /// A nested wrapped value.
    Wrapped(TypeRef),
}

/// Contract pairing a native value shape with its canonical wrapped form.
///
/// Implementations must uphold two properties:
/// - `validate(wrap(x))` succeeds for every in-domain native `x`;
/// - `wrap(unwrap(c))` equals `c` for every valid `c`, except for composite
///   types whose derived fields are recomputed from one authoritative field.
///
/// `wrap` and `validate` never mutate their argument, and `unwrap` never
/// fails on a value that passed `validate`.
pub trait WrappedType: Send + Sync + fmt::Debug {
    /// Stable identifier (`"NUMBER"`, `"DATE"`, ...).
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Field map of the wrapped representation.
    fn fields(&self) -> Vec<(&'static str, FieldType)>;

    /// Whether a null native value is accepted as-is.
    fn is_nullable(&self) -> bool {
        false
    }

    /// Check that a wrapped value has this type's canonical shape.
    fn validate(&self, custom: &Value) -> Validation;

    /// Convert a native value into its wrapped form.
    fn wrap(&self, native: &Value) -> Result<Value, TypeError>;

    /// Convert a wrapped value back into a native value.
    fn unwrap(&self, custom: &Value) -> Result<Value, TypeError>;
}

/// Returns `true` if both handles describe the same contract.
pub fn same_type(a: &dyn WrappedType, b: &dyn WrappedType) -> bool {
    a.id() == b.id() && a.is_nullable() == b.is_nullable()
}

fn boxed(value: Value) -> Value {
    let mut map = ValueMap::new();
    map.insert("value".to_owned(), value);
    Value::Map(map)
}

fn not_wrapped(expected: &str, actual: &Value) -> ValidationFailure {
    ValidationFailure::new(format!(
        "expected a wrapped {expected} value, got {}",
        actual.type_name()
    ))
}

/// Validate every declared field of a composite wrapped value.
fn validate_composite(ty: &dyn WrappedType, custom: &Value) -> Result<(), Vec<FieldFailure>> {
    let Some(map) = custom.as_map() else {
        return Err(vec![FieldFailure::invalid(
            ty.id(),
            not_wrapped(ty.id(), custom).reason,
        )]);
    };

    let mut failures = Vec::new();
    for (name, field) in ty.fields() {
        let result = match (map.get(name), &field) {
            (None, _) => Err(FieldFailure::missing(name)),
            (Some(v), FieldType::Primitive(p)) if p.matches(v) => Ok(()),
            (Some(v), FieldType::Primitive(p)) => Err(FieldFailure::invalid(
                name,
                format!("`{}` is not a {}", v.to_json(), p.native_name()),
            )),
            (Some(v), FieldType::Wrapped(nested)) => nested
                .validate(v)
                .map_err(|f| FieldFailure::invalid(name, f.reason)),
        };
        if let Err(failure) = result {
            failures.push(failure);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

/// A boxed primitive: `{ "value": <primitive> }`.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveType(pub Primitive);

impl WrappedType for PrimitiveType {
    fn id(&self) -> &str {
        self.0.as_str()
    }

    fn name(&self) -> &str {
        self.0.name()
    }

    fn fields(&self) -> Vec<(&'static str, FieldType)> {
        vec![("value", FieldType::Primitive(self.0))]
    }

    fn validate(&self, custom: &Value) -> Validation {
        let Some(map) = custom.as_map() else {
            return Err(not_wrapped(self.id(), custom));
        };
        match map.get("value") {
            Some(value) if self.0.matches(value) => Ok(()),
            Some(value) => Err(ValidationFailure::new(format!(
                "`{}` is not a {}",
                value.to_json(),
                self.0.native_name()
            ))),
            None => Err(ValidationFailure::from_fields(
                &format!("invalid {}", self.0.native_name()),
                vec![FieldFailure::missing("value")],
            )),
        }
    }

    fn wrap(&self, native: &Value) -> Result<Value, TypeError> {
        Ok(boxed(native.clone()))
    }

    fn unwrap(&self, custom: &Value) -> Result<Value, TypeError> {
        let inner = custom.field("value").ok_or_else(|| TypeError::NotWrapped {
            expected: self.id().to_owned(),
            actual: custom.type_name(),
        })?;
        coerce(inner, self.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn coerce(value: &Value, target: Primitive) -> Result<Value, TypeError> {
    let coercion_error = || TypeError::Coercion {
        value: value.display_string(),
        target: target.native_name(),
    };

    match target {
        Primitive::String => Ok(Value::String(value.display_string())),
        Primitive::Boolean => Ok(Value::Bool(value.is_truthy())),
        Primitive::Number => match value {
            Value::Number(n) => Ok(Value::Number(*n)),
            Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| coercion_error()),
            Value::Date(d) => Ok(Value::Number(d.timestamp_millis() as f64)),
            Value::Null | Value::List(_) | Value::Map(_) => Err(coercion_error()),
        },
    }
}

/// Numeric components carried by a wrapped date, in field order.
const DATE_NUMBER_FIELDS: [&str; 7] = [
    "milliseconds",
    "seconds",
    "minutes",
    "hours",
    "days",
    "months",
    "years",
];

/// Composite date: numeric components plus an authoritative ISO-8601
/// `timestamp`. Components are computed in UTC.
#[derive(Debug, Clone, Copy)]
pub struct DateType;

impl DateType {
    /// Years representable as a plain four-digit RFC 3339 timestamp.
    const YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

    fn to_datetime(native: &Value) -> Result<DateTime<Utc>, TypeError> {
        let date = Self::parse_native(native)?;
        if Self::YEARS.contains(&date.year()) {
            Ok(date)
        } else {
            Err(TypeError::InvalidDate(
                date.to_rfc3339_opts(SecondsFormat::Millis, true),
            ))
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn parse_native(native: &Value) -> Result<DateTime<Utc>, TypeError> {
        match native {
            Value::Date(d) => Ok(*d),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| TypeError::InvalidDate(s.clone())),
            Value::Number(ms) if ms.is_finite() => Utc
                .timestamp_millis_opt(*ms as i64)
                .single()
                .ok_or_else(|| TypeError::InvalidDate(ms.to_string())),
            other => Err(TypeError::InvalidDate(other.display_string())),
        }
    }
}

impl WrappedType for DateType {
    fn id(&self) -> &str {
        "DATE"
    }

    fn name(&self) -> &str {
        "Date"
    }

    fn fields(&self) -> Vec<(&'static str, FieldType)> {
        DATE_NUMBER_FIELDS
            .into_iter()
            .map(|name| (name, FieldType::Wrapped(number())))
            .chain(std::iter::once(("timestamp", FieldType::Wrapped(string()))))
            .collect()
    }

    fn validate(&self, custom: &Value) -> Validation {
        let mut failures = match validate_composite(self, custom) {
            Ok(()) => Vec::new(),
            Err(failures) => failures,
        };

        // The timestamp is the only authoritative field, so it must parse.
        if failures.is_empty()
            && let Some(Value::String(ts)) = custom.get_path("timestamp.value")
            && DateTime::parse_from_rfc3339(ts).is_err()
        {
            failures.push(FieldFailure::invalid(
                "timestamp",
                format!("`{ts}` is not an ISO-8601 timestamp"),
            ));
        }

        collect_failures("invalid date", failures)
    }

    fn wrap(&self, native: &Value) -> Result<Value, TypeError> {
        let date = Self::to_datetime(native)?;

        let components = [
            date.timestamp_subsec_millis(),
            date.second(),
            date.minute(),
            date.hour(),
            date.day(),
            date.month(),
        ];
        let mut map: ValueMap = DATE_NUMBER_FIELDS
            .into_iter()
            .zip(components)
            .map(|(name, n)| (name.to_owned(), boxed(Value::from(n))))
            .collect();
        map.insert("years".to_owned(), boxed(Value::from(date.year())));
        map.insert(
            "timestamp".to_owned(),
            boxed(Value::String(
                date.to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
        );

        Ok(Value::Map(map))
    }

    fn unwrap(&self, custom: &Value) -> Result<Value, TypeError> {
        let timestamp = custom
            .field("timestamp")
            .ok_or_else(|| TypeError::NotWrapped {
                expected: self.id().to_owned(),
                actual: custom.type_name(),
            })?;
        let native = string().unwrap(timestamp)?;
        Self::to_datetime(&native).map(Value::Date)
    }
}

/// Wrapper accepting a null native value in addition to the inner type.
#[derive(Debug)]
pub struct Nullable(TypeRef);

impl WrappedType for Nullable {
    fn id(&self) -> &str {
        self.0.id()
    }

    fn name(&self) -> &str {
        self.0.name()
    }

    fn fields(&self) -> Vec<(&'static str, FieldType)> {
        self.0.fields()
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn validate(&self, custom: &Value) -> Validation {
        if custom.is_null() {
            return Ok(());
        }
        self.0.validate(custom)
    }

    fn wrap(&self, native: &Value) -> Result<Value, TypeError> {
        if native.is_null() {
            return Ok(Value::Null);
        }
        self.0.wrap(native)
    }

    fn unwrap(&self, custom: &Value) -> Result<Value, TypeError> {
        if custom.is_null() {
            return Ok(Value::Null);
        }
        self.0.unwrap(custom)
    }
}

static STRING: LazyLock<TypeRef> = LazyLock::new(|| Arc::new(PrimitiveType(Primitive::String)));
static NUMBER: LazyLock<TypeRef> = LazyLock::new(|| Arc::new(PrimitiveType(Primitive::Number)));
static BOOLEAN: LazyLock<TypeRef> =
    LazyLock::new(|| Arc::new(PrimitiveType(Primitive::Boolean)));
static DATE: LazyLock<TypeRef> = LazyLock::new(|| Arc::new(DateType));

/// The STRING wrapped type.
pub fn string() -> TypeRef {
    Arc::clone(&STRING)
}

/// The NUMBER wrapped type.
pub fn number() -> TypeRef {
    Arc::clone(&NUMBER)
}

/// The BOOLEAN wrapped type.
pub fn boolean() -> TypeRef {
    Arc::clone(&BOOLEAN)
}

/// The composite DATE wrapped type.
pub fn date() -> TypeRef {
    Arc::clone(&DATE)
}

/// Mark a type as nullable. Already-nullable types are returned unchanged.
pub fn nullable(inner: TypeRef) -> TypeRef {
    if inner.is_nullable() {
        inner
    } else {
        Arc::new(Nullable(inner))
    }
}

/// Look up a built-in wrapped type by identifier.
pub fn by_id(id: &str) -> Option<TypeRef> {
    match id {
        "STRING" => Some(string()),
        "NUMBER" => Some(number()),
        "BOOLEAN" => Some(boolean()),
        "DATE" => Some(date()),
        _ => None,
    }
}
