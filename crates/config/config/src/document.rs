use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tripwire_core::ValueMap;
use tripwire_rules::{RuleSetEntry, StageInput};

use crate::error::ConfigError;

/// Opaque, totally ordered configuration revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The revision following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A wire from an upstream stage output to an input of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInputConfig {
    pub rule_stage_id: String,
    pub output_id: String,
    pub input_id: String,
}

impl From<&StageInputConfig> for StageInput {
    fn from(input: &StageInputConfig) -> Self {
        StageInput::new(&input.rule_stage_id, &input.output_id, &input.input_id)
    }
}

impl From<&StageInput> for StageInputConfig {
    fn from(input: &StageInput) -> Self {
        Self {
            rule_stage_id: input.source_stage_id.clone(),
            output_id: input.output_key.clone(),
            input_id: input.input_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    pub id: String,
    pub node_id: String,
    #[serde(default)]
    pub node_options: ValueMap,
    #[serde(default)]
    pub inputs: Vec<StageInputConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entries: Vec<RuleSetEntry>,
}

/// A complete, versioned rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    pub revision: Revision,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub rule_sets: Vec<RuleSetConfig>,
}

impl ConfigDocument {
    /// An empty document at the given revision.
    pub fn empty(revision: Revision) -> Self {
        Self {
            revision,
            rules: Vec::new(),
            rule_sets: Vec::new(),
        }
    }
}

/// On-disk encodings of a [`ConfigDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub const ALL: [Self; 2] = [Self::Json, Self::Yaml];

    /// File extensions handled by this format.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Json => &["json"],
            Self::Yaml => &["yaml", "yml"],
        }
    }

    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn decode(self, content: &str) -> Result<ConfigDocument, ConfigError> {
        match self {
            Self::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::Serialization(format!("JSON parse error: {e}"))),
            Self::Yaml => serde_yaml_ng::from_str(content)
                .map_err(|e| ConfigError::Serialization(format!("YAML parse error: {e}"))),
        }
    }

    pub fn encode(self, document: &ConfigDocument) -> Result<String, ConfigError> {
        match self {
            Self::Json => serde_json::to_string_pretty(document)
                .map_err(|e| ConfigError::Serialization(e.to_string())),
            Self::Yaml => serde_yaml_ng::to_string(document)
                .map_err(|e| ConfigError::Serialization(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tripwire_core::{Severity, Value};

    use super::*;

    fn sample_json() -> serde_json::Value {
        json!({
            "revision": 3,
            "rules": [{
                "id": "large-amount",
                "name": "Large amount",
                "stages": [
                    {"id": "inputs", "nodeId": "ruleInputs", "nodeOptions": {"fields": "amount:NUMBER"}},
                    {
                        "id": "exit",
                        "nodeId": "exit",
                        "inputs": [{"ruleStageId": "inputs", "outputId": "amount", "inputId": "result"}]
                    }
                ]
            }],
            "ruleSets": [{
                "id": "payments",
                "name": "Payments",
                "entries": [{"ruleId": "large-amount", "severity": "HIGH"}]
            }]
        })
    }

    #[test]
    fn decodes_camel_case_json() {
        let doc = ConfigFormat::Json
            .decode(&sample_json().to_string())
            .unwrap();
        assert_eq!(doc.revision, Revision::new(3));
        let stages = &doc.rules[0].stages;
        assert_eq!(stages[0].node_options["fields"], Value::from("amount:NUMBER"));
        assert!(stages[0].inputs.is_empty());
        assert_eq!(stages[1].inputs[0].rule_stage_id, "inputs");
        assert_eq!(doc.rule_sets[0].entries[0].severity, Severity::High);
    }

    #[test]
    fn yaml_and_json_agree() {
        let doc = ConfigFormat::Json
            .decode(&sample_json().to_string())
            .unwrap();
        let yaml = ConfigFormat::Yaml.encode(&doc).unwrap();
        assert!(yaml.contains("nodeId: ruleInputs"));
        assert_eq!(ConfigFormat::Yaml.decode(&yaml).unwrap(), doc);
    }

    #[test]
    fn decode_errors_are_serialization_errors() {
        let err = ConfigFormat::Json.decode("{").unwrap_err();
        assert!(matches!(err, ConfigError::Serialization(ref m) if m.starts_with("JSON parse error")));
        let err = ConfigFormat::Yaml.decode("rules: [").unwrap_err();
        assert!(matches!(err, ConfigError::Serialization(_)));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("1.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("1.YML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("1.toml")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn revisions_order_and_parse() {
        assert!(Revision::new(2) > Revision::new(1));
        assert_eq!(Revision::new(1).next(), Revision::new(2));
        assert_eq!("42".parse::<Revision>().unwrap(), Revision::new(42));
        assert_eq!(serde_json::to_value(Revision::new(5)).unwrap(), json!(5));
    }
}
