use tripwire_core::{Severity, Value, ValueMap};
use tripwire_rules::RuleSetEntry;

use crate::document::{ConfigDocument, Revision, RuleConfig, RuleSetConfig, StageConfig};
use crate::error::ConfigError;
use crate::provider::ConfigProvider;

fn sample_document(revision: u64) -> ConfigDocument {
    let mut node_options = ValueMap::new();
    node_options.insert("valueType".into(), Value::from("BOOLEAN"));
    node_options.insert("value".into(), Value::from(true));

    ConfigDocument {
        revision: Revision::new(revision),
        rules: vec![RuleConfig {
            id: format!("rule-{revision}"),
            name: "Always".into(),
            stages: vec![StageConfig {
                id: "value".into(),
                node_id: "staticValue".into(),
                node_options,
                inputs: Vec::new(),
            }],
        }],
        rule_sets: vec![RuleSetConfig {
            id: "set".into(),
            name: "Set".into(),
            entries: vec![RuleSetEntry::new(format!("rule-{revision}"), Severity::Medium)],
        }],
    }
}

/// Run the full configuration provider conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty provider.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_provider_conformance_tests(
    provider: &dyn ConfigProvider,
) -> Result<(), ConfigError> {
    test_empty(provider).await?;
    test_save_and_load(provider).await?;
    test_latest_is_highest(provider).await?;
    test_save_replaces(provider).await?;
    test_load_missing(provider).await?;
    Ok(())
}

async fn test_empty(provider: &dyn ConfigProvider) -> Result<(), ConfigError> {
    let latest = provider.latest_revision().await?;
    assert!(latest.is_none(), "a fresh provider should hold no revision");
    let err = provider.load_latest().await;
    assert!(
        matches!(err, Err(ConfigError::NoRevisions)),
        "load_latest on an empty provider should fail with NoRevisions"
    );
    Ok(())
}

async fn test_save_and_load(provider: &dyn ConfigProvider) -> Result<(), ConfigError> {
    let doc = sample_document(1);
    provider.save(&doc).await?;
    let loaded = provider.load(Revision::new(1)).await?;
    assert_eq!(loaded, doc, "a saved document should load back unchanged");
    Ok(())
}

async fn test_latest_is_highest(provider: &dyn ConfigProvider) -> Result<(), ConfigError> {
    provider.save(&sample_document(10)).await?;
    provider.save(&sample_document(2)).await?;
    let latest = provider.latest_revision().await?;
    assert_eq!(latest, Some(Revision::new(10)));
    let loaded = provider.load_latest().await?;
    assert_eq!(loaded.revision, Revision::new(10));
    Ok(())
}

async fn test_save_replaces(provider: &dyn ConfigProvider) -> Result<(), ConfigError> {
    let mut doc = sample_document(2);
    doc.rules[0].name = "Replaced".into();
    provider.save(&doc).await?;
    let loaded = provider.load(Revision::new(2)).await?;
    assert_eq!(loaded.rules[0].name, "Replaced");
    Ok(())
}

async fn test_load_missing(provider: &dyn ConfigProvider) -> Result<(), ConfigError> {
    let result = provider.load(Revision::new(999)).await;
    assert!(
        matches!(result, Err(ConfigError::RevisionNotFound(r)) if r == Revision::new(999)),
        "loading an unknown revision should fail with RevisionNotFound"
    );
    Ok(())
}
