use thiserror::Error;

/// Errors raised while wrapping or unwrapping values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A wrapped value did not have the canonical shape of its type.
    #[error("expected a wrapped {expected} value, got {actual}")]
    NotWrapped {
        /// Type identifier that was expected.
        expected: String,
        /// Runtime type name of the value that was supplied.
        actual: &'static str,
    },

    /// A value could not be coerced into the requested native type.
    #[error("cannot coerce `{value}` to {target}")]
    Coercion {
        /// Display form of the offending value.
        value: String,
        /// Native type name that was requested.
        target: &'static str,
    },

    /// A value could not be interpreted as a point in time.
    #[error("`{0}` is not a valid date")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = TypeError::NotWrapped {
            expected: "NUMBER".into(),
            actual: "string",
        };
        assert_eq!(err.to_string(), "expected a wrapped NUMBER value, got string");

        let err = TypeError::Coercion {
            value: "abc".into(),
            target: "number",
        };
        assert_eq!(err.to_string(), "cannot coerce `abc` to number");

        let err = TypeError::InvalidDate("yesterday".into());
        assert_eq!(err.to_string(), "`yesterday` is not a valid date");
    }
}
