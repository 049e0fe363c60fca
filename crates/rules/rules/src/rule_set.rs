use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span, instrument};
use tripwire_core::{Severity, ValueMap};

use crate::context::ExecutionContext;
use crate::error::{ExecutorError, LookupError};
use crate::executor::{Executable, ExecutorKind, ExecutorResult, run};
use crate::rule::{Rule, RuleOutcome};

/// A rule referenced from a rule set, with the severity it carries there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetEntry {
    pub rule_id: String,
    pub severity: Severity,
}

impl RuleSetEntry {
    pub fn new(rule_id: impl Into<String>, severity: Severity) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
        }
    }
}

/// Result of one rule run as part of a rule set.
pub type RuleResult = ExecutorResult<ValueMap, RuleOutcome>;

/// One entry's result, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetEntryResult {
    pub rule_id: String,
    pub severity: Severity,
    pub result: RuleResult,
}

impl RuleSetEntryResult {
    pub fn triggered(&self) -> bool {
        self.result.outputs.triggered
    }
}

/// Aggregated outcome of a rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetOutcome {
    /// Highest severity among triggered entries, absent when none triggered.
    pub severity: Option<Severity>,
    /// Whether any entry triggered.
    pub triggered: bool,
    /// Rule id of the entry that determined `severity`.
    pub matched_rule_id: Option<String>,
    pub rule_results: Vec<RuleSetEntryResult>,
}

impl RuleSetOutcome {
    /// Aggregate entry results.
    ///
    /// The triggered entry with the highest severity wins; among entries of
    /// equal severity the first declared wins.
    pub fn aggregate(rule_results: Vec<RuleSetEntryResult>) -> Self {
        let mut winner: Option<&RuleSetEntryResult> = None;
        for result in rule_results.iter().filter(|r| r.triggered()) {
            if winner.is_none_or(|w| result.severity > w.severity) {
                winner = Some(result);
            }
        }
        let severity = winner.map(|w| w.severity);
        let matched_rule_id = winner.map(|w| w.rule_id.clone());
        Self {
            severity,
            triggered: severity.is_some(),
            matched_rule_id,
            rule_results,
        }
    }

    /// Look up the result of one entry by rule id.
    pub fn rule_result(&self, rule_id: &str) -> Option<&RuleSetEntryResult> {
        self.rule_results.iter().find(|r| r.rule_id == rule_id)
    }
}

/// A named list of rule references, each with a severity.
///
/// Every entry runs concurrently against the same inputs.
#[derive(Debug, Clone)]
pub struct RuleSet {
    id: String,
    name: String,
    entries: Vec<RuleSetEntry>,
}

impl RuleSet {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entries: Vec<RuleSetEntry>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entries,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[RuleSetEntry] {
        &self.entries
    }

    fn resolve(&self, ctx: &ExecutionContext) -> Result<Vec<Arc<Rule>>, LookupError> {
        self.entries
            .iter()
            .map(|entry| {
                ctx.graph
                    .rule(&entry.rule_id)
                    .cloned()
                    .ok_or_else(|| LookupError::UnknownRule {
                        rule_set_id: self.id.clone(),
                        rule_id: entry.rule_id.clone(),
                    })
            })
            .collect()
    }

    #[instrument(skip_all, fields(rule_set.id = %self.id, execution.id = %ctx.execution_id))]
    async fn execute_entries(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<RuleSetOutcome, ExecutorError> {
        let rules = self.resolve(ctx)?;
        debug!(entries = rules.len(), "executing rule set");

        let outcomes = join_all(self.entries.iter().zip(&rules).map(|(entry, rule)| {
            let rule_ctx = ctx.child(ExecutorKind::Rule, &entry.rule_id);
            let span = info_span!("rule", rule.id = %entry.rule_id, severity = %entry.severity);
            let inputs = inputs.clone();
            async move { run(rule.as_ref(), inputs, &rule_ctx).await }.instrument(span)
        }))
        .await;

        let mut rule_results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (entry, outcome) in self.entries.iter().zip(outcomes) {
            match outcome {
                Ok(result) => rule_results.push(RuleSetEntryResult {
                    rule_id: entry.rule_id.clone(),
                    severity: entry.severity,
                    result,
                }),
                Err(e) => failures.push(e),
            }
        }
        if !failures.is_empty() {
            return Err(ExecutorError::aggregate(
                ExecutorKind::RuleSet,
                &self.id,
                failures,
            ));
        }

        let outcome = RuleSetOutcome::aggregate(rule_results);
        info!(
            severity = outcome.severity.map(Severity::as_str),
            matched_rule = outcome.matched_rule_id.as_deref(),
            "rule set executed"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl Executable for RuleSet {
    type Inputs = ValueMap;
    type Outputs = RuleSetOutcome;

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::RuleSet
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<RuleSetOutcome, ExecutorError> {
        self.execute_entries(inputs, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RuleGraph;
    use crate::node::NodeRef;
    use crate::nodes::{ExitNode, RuleInputsNode, StaticValueNode};
    use crate::stage::{RuleStage, StageInput};
    use crate::testing::{FailingNode, map};

    /// A rule whose exit reports the given constant.
    fn constant_rule(id: &str, triggered: bool) -> Rule {
        let value: NodeRef = Arc::new(StaticValueNode);
        Rule::new(
            id,
            id,
            vec![
                RuleStage::new(
                    "value",
                    value,
                    map(&[("valueType", "BOOLEAN".into()), ("value", triggered.into())]),
                    Vec::new(),
                ),
                RuleStage::new(
                    "exit",
                    Arc::new(ExitNode),
                    ValueMap::new(),
                    vec![StageInput::new("value", "value", "result")],
                ),
            ],
        )
        .unwrap()
    }

    fn failing_rule(id: &str) -> Rule {
        Rule::new(
            id,
            id,
            vec![RuleStage::new("boom", Arc::new(FailingNode), ValueMap::new(), Vec::new())],
        )
        .unwrap()
    }

    fn ctx_with(rules: Vec<Rule>) -> ExecutionContext {
        ExecutionContext::new(Arc::new(RuleGraph::new(rules, Vec::new()).unwrap()))
    }

    fn result(rule_id: &str, severity: Severity, triggered: bool) -> RuleSetEntryResult {
        RuleSetEntryResult {
            rule_id: rule_id.into(),
            severity,
            result: ExecutorResult {
                execution_time_ms: 0.0,
                inputs: ValueMap::new(),
                outputs: RuleOutcome {
                    triggered,
                    stage_results: Default::default(),
                },
            },
        }
    }

    #[test]
    fn aggregate_picks_highest_triggered_severity() {
        let outcome = RuleSetOutcome::aggregate(vec![
            result("low", Severity::Low, true),
            result("critical", Severity::Critical, false),
            result("high", Severity::High, true),
        ]);
        assert_eq!(outcome.severity, Some(Severity::High));
        assert_eq!(outcome.matched_rule_id.as_deref(), Some("high"));
        assert_eq!(outcome.rule_results.len(), 3);
    }

    #[test]
    fn aggregate_ties_go_to_first_declared() {
        let outcome = RuleSetOutcome::aggregate(vec![
            result("a", Severity::Medium, true),
            result("b", Severity::Medium, true),
        ]);
        assert_eq!(outcome.matched_rule_id.as_deref(), Some("a"));
    }

    #[test]
    fn aggregate_without_triggers_has_no_severity() {
        let outcome = RuleSetOutcome::aggregate(vec![result("a", Severity::Critical, false)]);
        assert_eq!(outcome.severity, None);
        assert!(!outcome.triggered);
        assert!(RuleSetOutcome::aggregate(Vec::new()).severity.is_none());
    }

    #[tokio::test]
    async fn executes_every_entry() {
        let ctx = ctx_with(vec![constant_rule("yes", true), constant_rule("no", false)]);
        let set = RuleSet::new(
            "checks",
            "Checks",
            vec![
                RuleSetEntry::new("no", Severity::Critical),
                RuleSetEntry::new("yes", Severity::Low),
            ],
        );
        let outcome = run(&set, ValueMap::new(), &ctx).await.unwrap().outputs;
        assert_eq!(outcome.severity, Some(Severity::Low));
        assert_eq!(outcome.rule_results.len(), 2);
        assert_eq!(outcome.rule_results[0].rule_id, "no");
        assert!(!outcome.rule_result("no").unwrap().triggered());
    }

    #[tokio::test]
    async fn unknown_rule_is_a_lookup_failure() {
        let ctx = ctx_with(vec![constant_rule("yes", true)]);
        let set = RuleSet::new(
            "checks",
            "Checks",
            vec![
                RuleSetEntry::new("yes", Severity::Low),
                RuleSetEntry::new("ghost", Severity::High),
            ],
        );
        let err = run(&set, ValueMap::new(), &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::Lookup(LookupError::UnknownRule { ref rule_id, .. }) if rule_id == "ghost"
        ));
    }

    #[tokio::test]
    async fn failing_entry_fails_the_set() {
        let ctx = ctx_with(vec![constant_rule("yes", true), failing_rule("bad")]);
        let set = RuleSet::new(
            "checks",
            "Checks",
            vec![
                RuleSetEntry::new("yes", Severity::Low),
                RuleSetEntry::new("bad", Severity::High),
            ],
        );
        let err = run(&set, ValueMap::new(), &ctx).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Node { ref stage_id, .. } if stage_id == "boom"));
    }

    #[tokio::test]
    async fn entry_inputs_are_shared() {
        let rule = Rule::new(
            "needs-amount",
            "Needs amount",
            vec![RuleStage::new(
                "inputs",
                Arc::new(RuleInputsNode),
                map(&[("fields", "amount:NUMBER".into())]),
                Vec::new(),
            )],
        )
        .unwrap();
        let ctx = ctx_with(vec![rule]);
        let set = RuleSet::new(
            "checks",
            "Checks",
            vec![RuleSetEntry::new("needs-amount", Severity::Info)],
        );

        let err = run(&set, ValueMap::new(), &ctx).await.unwrap_err();
        assert!(err.is_validation());

        let outcome = run(&set, map(&[("amount", 5.into())]), &ctx).await.unwrap();
        assert_eq!(outcome.outputs.rule_results[0].result.inputs, map(&[("amount", 5.into())]));
    }
}
