use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", content = "reason", rename_all = "snake_case")]
pub enum FieldIssue {
    /// The field was required but absent (or null for a non-nullable type).
    Missing,
    /// The field was present but did not satisfy its type.
    Invalid(String),
}

/// A validation failure attributed to one named field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Field, input, option or stage identifier.
    pub field: String,
    /// What was wrong with it.
    #[serde(flatten)]
    pub issue: FieldIssue,
}

impl FieldFailure {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            issue: FieldIssue::Missing,
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            issue: FieldIssue::Invalid(reason.into()),
        }
    }

    /// Returns `true` if the field was missing rather than malformed.
    pub fn is_missing(&self) -> bool {
        matches!(self.issue, FieldIssue::Missing)
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issue {
            FieldIssue::Missing => write!(f, "{} (missing)", self.field),
            FieldIssue::Invalid(reason) => write!(f, "{} (invalid: {reason})", self.field),
        }
    }
}

/// Structured description of rejected input, context or wrapped value.
///
/// Validation failures are data: they are returned to the caller for
/// inspection and never abort the process.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{reason}")]
pub struct ValidationFailure {
    /// Combined human-readable reason.
    pub reason: String,
    /// Per-field failures; empty when the failure is not field-specific.
    #[serde(default)]
    pub fields: Vec<FieldFailure>,
}

/// Outcome of a validation check.
pub type Validation = Result<(), ValidationFailure>;

impl ValidationFailure {
    /// A failure with a single reason and no field breakdown.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fields: Vec::new(),
        }
    }

    /// Aggregate field failures under a common prefix.
    ///
    /// The reason reads `"{prefix}: a (missing), b (invalid: ...)"`.
    pub fn from_fields(prefix: &str, fields: Vec<FieldFailure>) -> Self {
        let details = fields
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            reason: format!("{prefix}: {details}"),
            fields,
        }
    }

    /// Look up the failure recorded for a field.
    pub fn field(&self, field: &str) -> Option<&FieldFailure> {
        self.fields.iter().find(|f| f.field == field)
    }
}

/// Turn a list of field failures into a [`Validation`].
///
/// An empty list means success.
pub fn collect_failures(prefix: &str, fields: Vec<FieldFailure>) -> Validation {
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure::from_fields(prefix, fields))
    }
}
