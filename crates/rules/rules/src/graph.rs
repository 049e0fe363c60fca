use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConstructionError;
use crate::rule::Rule;
use crate::rule_set::RuleSet;

/// The executable rule graph: every rule and rule set of one configuration.
///
/// A graph is immutable once built. Reloading configuration builds a new
/// graph and swaps it in, so executions holding the old one are unaffected.
#[derive(Debug, Default)]
pub struct RuleGraph {
    rules: Vec<Arc<Rule>>,
    rule_sets: Vec<Arc<RuleSet>>,
    rule_index: HashMap<String, usize>,
    rule_set_index: HashMap<String, usize>,
}

impl RuleGraph {
    /// Build a graph, rejecting duplicate rule or rule-set ids.
    ///
    /// Rule-set references are resolved at execution time, not here.
    pub fn new(rules: Vec<Rule>, rule_sets: Vec<RuleSet>) -> Result<Self, ConstructionError> {
        let mut graph = Self::default();
        for rule in rules {
            if graph.rule_index.contains_key(rule.id()) {
                return Err(ConstructionError::DuplicateRule(rule.id().to_owned()));
            }
            graph.rule_index.insert(rule.id().to_owned(), graph.rules.len());
            graph.rules.push(Arc::new(rule));
        }
        for set in rule_sets {
            if graph.rule_set_index.contains_key(set.id()) {
                return Err(ConstructionError::DuplicateRuleSet(set.id().to_owned()));
            }
            graph
                .rule_set_index
                .insert(set.id().to_owned(), graph.rule_sets.len());
            graph.rule_sets.push(Arc::new(set));
        }
        Ok(graph)
    }

    pub fn rule(&self, id: &str) -> Option<&Arc<Rule>> {
        self.rule_index.get(id).map(|&i| &self.rules[i])
    }

    pub fn rule_set(&self, id: &str) -> Option<&Arc<RuleSet>> {
        self.rule_set_index.get(id).map(|&i| &self.rule_sets[i])
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Rule sets in declaration order.
    pub fn rule_sets(&self) -> &[Arc<RuleSet>] {
        &self.rule_sets
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.rule_sets.is_empty()
    }
}
