use std::collections::HashSet;

use tracing::debug;
use tripwire_rules::{
    ConstructionError, NodeRegistry, Rule, RuleGraph, RuleSet, RuleStage, StageInput,
};

use crate::document::{
    ConfigDocument, Revision, RuleConfig, RuleSetConfig, StageConfig, StageInputConfig,
};

/// Converts between configuration documents and executable rule graphs.
pub struct ConfigParser;

impl ConfigParser {
    /// Build an executable graph from a document.
    ///
    /// Every stage's node id is resolved against `registry`. Stage wiring
    /// and declaration order are preserved verbatim. Nothing is partially
    /// applied: either the whole document parses or an error is returned.
    pub fn parse(
        document: &ConfigDocument,
        registry: &NodeRegistry,
    ) -> Result<RuleGraph, ConstructionError> {
        let rules = document
            .rules
            .iter()
            .map(|rule| Self::parse_rule(rule, registry))
            .collect::<Result<Vec<_>, _>>()?;

        let rule_ids: HashSet<&str> = document.rules.iter().map(|r| r.id.as_str()).collect();
        let mut rule_sets = Vec::with_capacity(document.rule_sets.len());
        for set in &document.rule_sets {
            if let Some(entry) = set
                .entries
                .iter()
                .find(|e| !rule_ids.contains(e.rule_id.as_str()))
            {
                return Err(ConstructionError::UndefinedRule {
                    rule_set_id: set.id.clone(),
                    rule_id: entry.rule_id.clone(),
                });
            }
            rule_sets.push(RuleSet::new(&set.id, &set.name, set.entries.clone()));
        }

        let graph = RuleGraph::new(rules, rule_sets)?;
        debug!(
            revision = %document.revision,
            rules = graph.rules().len(),
            rule_sets = graph.rule_sets().len(),
            "configuration parsed"
        );
        Ok(graph)
    }

    fn parse_rule(rule: &RuleConfig, registry: &NodeRegistry) -> Result<Rule, ConstructionError> {
        let stages = rule
            .stages
            .iter()
            .map(|stage| {
                let node = registry.get(&stage.node_id).cloned().ok_or_else(|| {
                    ConstructionError::UnknownNode {
                        rule_id: rule.id.clone(),
                        stage_id: stage.id.clone(),
                        node_id: stage.node_id.clone(),
                    }
                })?;
                Ok(RuleStage::new(
                    &stage.id,
                    node,
                    stage.node_options.clone(),
                    stage.inputs.iter().map(StageInput::from).collect(),
                ))
            })
            .collect::<Result<Vec<_>, ConstructionError>>()?;
        Rule::new(&rule.id, &rule.name, stages)
    }

    /// Describe a graph as a document at the given revision.
    pub fn export(revision: Revision, graph: &RuleGraph) -> ConfigDocument {
        ConfigDocument {
            revision,
            rules: graph
                .rules()
                .iter()
                .map(|rule| RuleConfig {
                    id: rule.id().to_owned(),
                    name: rule.name().to_owned(),
                    stages: rule
                        .stages()
                        .iter()
                        .map(|stage| StageConfig {
                            id: stage.id().to_owned(),
                            node_id: stage.node().id().to_owned(),
                            node_options: stage.node_options().clone(),
                            inputs: stage.inputs().iter().map(StageInputConfig::from).collect(),
                        })
                        .collect(),
                })
                .collect(),
            rule_sets: graph
                .rule_sets()
                .iter()
                .map(|set| RuleSetConfig {
                    id: set.id().to_owned(),
                    name: set.name().to_owned(),
                    entries: set.entries().to_vec(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tripwire_core::Severity;

    use super::*;
    use crate::document::ConfigFormat;

    fn document() -> ConfigDocument {
        let json = json!({
            "revision": 1,
            "rules": [{
                "id": "large-amount",
                "name": "Large amount",
                "stages": [
                    {"id": "inputs", "nodeId": "ruleInputs", "nodeOptions": {"fields": "amount:NUMBER"}},
                    {"id": "threshold", "nodeId": "staticValue", "nodeOptions": {"valueType": "NUMBER", "value": 1000}},
                    {
                        "id": "compare",
                        "nodeId": "compareNumbers",
                        "nodeOptions": {"operator": "GT"},
                        "inputs": [
                            {"ruleStageId": "inputs", "outputId": "amount", "inputId": "a"},
                            {"ruleStageId": "threshold", "outputId": "value", "inputId": "b"}
                        ]
                    },
                    {
                        "id": "exit",
                        "nodeId": "exit",
                        "inputs": [{"ruleStageId": "compare", "outputId": "result", "inputId": "result"}]
                    }
                ]
            }],
            "ruleSets": [{
                "id": "payments",
                "name": "Payments",
                "entries": [{"ruleId": "large-amount", "severity": "HIGH"}]
            }]
        });
        ConfigFormat::Json.decode(&json.to_string()).unwrap()
    }

    #[test]
    fn parses_rules_and_rule_sets() {
        let graph = ConfigParser::parse(&document(), &NodeRegistry::with_builtins()).unwrap();
        let rule = graph.rule("large-amount").unwrap();
        assert_eq!(rule.levels().len(), 3);
        assert_eq!(rule.entry_stage().unwrap().id(), "inputs");
        assert_eq!(rule.exit_stage().unwrap().id(), "exit");
        let set = graph.rule_set("payments").unwrap();
        assert_eq!(set.entries()[0].severity, Severity::High);
    }

    #[test]
    fn export_is_the_inverse_of_parse() {
        let doc = document();
        let graph = ConfigParser::parse(&doc, &NodeRegistry::with_builtins()).unwrap();
        assert_eq!(ConfigParser::export(doc.revision, &graph), doc);
    }

    #[test]
    fn unknown_node_is_rejected() {
        let mut doc = document();
        doc.rules[0].stages[1].node_id = "teleport".into();
        let err = ConfigParser::parse(&doc, &NodeRegistry::with_builtins()).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::UnknownNode {
                rule_id: "large-amount".into(),
                stage_id: "threshold".into(),
                node_id: "teleport".into(),
            }
        );
    }

    #[test]
    fn undefined_rule_in_rule_set_is_rejected() {
        let mut doc = document();
        doc.rule_sets[0].entries[0].rule_id = "ghost".into();
        let err = ConfigParser::parse(&doc, &NodeRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, ConstructionError::UndefinedRule { ref rule_id, .. } if rule_id == "ghost"));
    }

    #[test]
    fn duplicate_rules_are_rejected() {
        let mut doc = document();
        let copy = doc.rules[0].clone();
        doc.rules.push(copy);
        let err = ConfigParser::parse(&doc, &NodeRegistry::with_builtins()).unwrap_err();
        assert_eq!(err, ConstructionError::DuplicateRule("large-amount".into()));
    }

    #[test]
    fn rule_construction_errors_propagate() {
        let mut doc = document();
        doc.rules[0].stages[3].inputs[0].rule_stage_id = "exit".into();
        let err = ConfigParser::parse(&doc, &NodeRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, ConstructionError::InvalidDependencies { .. }));
    }
}
