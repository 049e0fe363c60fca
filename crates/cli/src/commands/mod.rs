pub mod config;
pub mod nodes;
pub mod run;
pub mod validate;

use anyhow::Context;
use tripwire_core::{Value, ValueMap};

/// Parse a JSON object given inline or as an `@file` path.
pub fn read_object(arg: &str) -> anyhow::Result<ValueMap> {
    let json: serde_json::Value = if let Some(path) = arg.strip_prefix('@') {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        serde_json::from_str(&content)?
    } else {
        serde_json::from_str(arg)?
    };
    match Value::from_json(json) {
        Value::Map(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, got {}", other.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_inline_objects() {
        let map = read_object(r#"{"amount": 5, "country": "US"}"#).unwrap();
        assert_eq!(map["amount"], Value::Number(5.0));
        assert_eq!(map["country"], Value::from("US"));
    }

    #[test]
    fn reads_objects_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputs.json");
        std::fs::write(&path, r#"{"flag": true}"#).unwrap();

        let map = read_object(&format!("@{}", path.display())).unwrap();
        assert_eq!(map["flag"], Value::Bool(true));
    }

    #[test]
    fn rejects_non_objects() {
        let err = read_object("[1, 2]").unwrap_err();
        assert!(err.to_string().starts_with("expected a JSON object"));
    }
}
