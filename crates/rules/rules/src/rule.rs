use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use tripwire_core::{FieldFailure, Validation, Value, ValueMap, collect_failures};

use crate::context::ExecutionContext;
use crate::error::{ConstructionError, ExecutorError};
use crate::executor::{Executable, ExecutorKind, ExecutorResult, run};
use crate::node::NodeKind;
use crate::stage::{
    ENTRY_STAGE_ID, EXIT_STAGE_ID, RuleStage, StageResult, StageResults, is_reserved_stage_id,
};

/// Outputs of one rule execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    /// Whether the exit stage produced `true`. Always `false` for a rule
    /// without an exit stage.
    pub triggered: bool,
    /// Results keyed by stage id, including the `$entry` and `$exit`
    /// pseudo-stages when present.
    pub stage_results: StageResults,
}

/// A DAG of stages with at most one entry and at most one exit stage.
///
/// Construction computes the execution levels: every stage on level `k`
/// depends only on stages of levels below `k` (or on `$entry`). Stages of
/// one level run concurrently.
pub struct Rule {
    id: String,
    name: String,
    stages: Vec<RuleStage>,
    levels: Vec<Vec<usize>>,
    entry: Option<usize>,
    exit: Option<usize>,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        stages: Vec<RuleStage>,
    ) -> Result<Self, ConstructionError> {
        let id = id.into();

        let mut seen = HashSet::new();
        for stage in &stages {
            if is_reserved_stage_id(stage.id()) {
                return Err(ConstructionError::ReservedStageId {
                    rule_id: id,
                    stage_id: stage.id().to_owned(),
                });
            }
            if !seen.insert(stage.id()) {
                return Err(ConstructionError::DuplicateStage {
                    rule_id: id,
                    stage_id: stage.id().to_owned(),
                });
            }
        }

        let of_kind = |kind: NodeKind| -> Vec<usize> {
            stages
                .iter()
                .enumerate()
                .filter(|(_, s)| s.node_kind() == kind)
                .map(|(i, _)| i)
                .collect()
        };
        let entries = of_kind(NodeKind::Entry);
        let exits = of_kind(NodeKind::Exit);
        if entries.len() > 1 {
            return Err(ConstructionError::TooManyEntryStages {
                rule_id: id,
                count: entries.len(),
            });
        }
        if exits.len() > 1 {
            return Err(ConstructionError::TooManyExitStages {
                rule_id: id,
                count: exits.len(),
            });
        }

        let levels = compute_levels(&id, &stages, !entries.is_empty())?;
        debug!(rule.id = %id, stages = stages.len(), levels = levels.len(), "rule built");

        Ok(Self {
            id,
            name: name.into(),
            stages,
            levels,
            entry: entries.first().copied(),
            exit: exits.first().copied(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[RuleStage] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&RuleStage> {
        self.stages.iter().find(|s| s.id() == id)
    }

    pub fn entry_stage(&self) -> Option<&RuleStage> {
        self.entry.map(|i| &self.stages[i])
    }

    pub fn exit_stage(&self) -> Option<&RuleStage> {
        self.exit.map(|i| &self.stages[i])
    }

    /// Stage ids grouped by execution level.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&i| self.stages[i].id()).collect())
            .collect()
    }

    /// Wrap native rule inputs according to the entry stage's inputs.
    fn wrap_inputs(
        entry: &RuleStage,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutorError> {
        let mut wrapped = ValueMap::new();
        for port in entry.metadata(Some(ctx)).inputs {
            let native = inputs.get(&port.id).unwrap_or(&Value::Null);
            let value = port.ty.wrap(native).map_err(|source| ExecutorError::Type {
                stage_id: ENTRY_STAGE_ID.to_owned(),
                port: port.id.clone(),
                source,
            })?;
            wrapped.insert(port.id, value);
        }
        Ok(wrapped)
    }

    async fn run_stage(
        &self,
        stage: &RuleStage,
        results: &StageResults,
        ctx: &ExecutionContext,
    ) -> Result<StageResult, ExecutorError> {
        let inputs = stage.gather_inputs(results)?;
        let stage_ctx = ctx.child(ExecutorKind::RuleStage, stage.id());
        run(stage, inputs, &stage_ctx).await
    }

    #[instrument(skip_all, fields(rule.id = %self.id, execution.id = %ctx.execution_id))]
    async fn execute_stages(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<RuleOutcome, ExecutorError> {
        let mut results = StageResults::new();
        if let Some(entry) = self.entry_stage() {
            let wrapped = Self::wrap_inputs(entry, inputs, ctx)?;
            results.insert(
                ENTRY_STAGE_ID.to_owned(),
                ExecutorResult {
                    execution_time_ms: 0.0,
                    inputs: wrapped.clone(),
                    outputs: wrapped,
                },
            );
        }

        for (depth, level) in self.levels.iter().enumerate() {
            debug!(level = depth, stages = level.len(), "executing level");
            let outcomes = join_all(
                level
                    .iter()
                    .map(|&i| self.run_stage(&self.stages[i], &results, ctx)),
            )
            .await;

            let mut failures = Vec::new();
            for (&i, outcome) in level.iter().zip(outcomes) {
                match outcome {
                    Ok(result) => {
                        results.insert(self.stages[i].id().to_owned(), result);
                    }
                    Err(e) => failures.push(e),
                }
            }
            if !failures.is_empty() {
                return Err(ExecutorError::aggregate(ExecutorKind::Rule, &self.id, failures));
            }
        }

        let mut triggered = false;
        if let Some(exit) = self.exit_stage()
            && let Some(result) = results.get(exit.id()).cloned()
        {
            triggered = result
                .outputs
                .get("result")
                .and_then(|r| r.field("value"))
                .is_some_and(Value::is_truthy);
            results.insert(EXIT_STAGE_ID.to_owned(), result);
        }

        debug!(triggered, "rule executed");
        Ok(RuleOutcome {
            triggered,
            stage_results: results,
        })
    }
}

/// Group stages into frontier levels.
///
/// A stage is placed on the first level at which all of its dependencies
/// have been placed. If a pass places nothing, the remaining stages form a
/// cycle.
fn compute_levels(
    rule_id: &str,
    stages: &[RuleStage],
    has_entry: bool,
) -> Result<Vec<Vec<usize>>, ConstructionError> {
    let ids: HashSet<&str> = stages.iter().map(RuleStage::id).collect();
    for stage in stages {
        for dep in stage.depends_on() {
            let resolvable = if dep == ENTRY_STAGE_ID {
                has_entry
            } else {
                ids.contains(dep)
            };
            if !resolvable {
                return Err(ConstructionError::UnknownDependency {
                    rule_id: rule_id.to_owned(),
                    stage_id: stage.id().to_owned(),
                    dependency: dep.to_owned(),
                });
            }
        }
    }

    let mut placed: HashSet<&str> = HashSet::from([ENTRY_STAGE_ID]);
    let mut remaining: Vec<usize> = (0..stages.len()).collect();
    let mut levels = Vec::new();
    while !remaining.is_empty() {
        let (ready, blocked): (Vec<usize>, Vec<usize>) = remaining
            .into_iter()
            .partition(|&i| stages[i].depends_on().iter().all(|d| placed.contains(d)));
        if ready.is_empty() {
            return Err(ConstructionError::InvalidDependencies {
                rule_id: rule_id.to_owned(),
                stages: blocked.iter().map(|&i| stages[i].id().to_owned()).collect(),
            });
        }
        placed.extend(ready.iter().map(|&i| stages[i].id()));
        levels.push(ready);
        remaining = blocked;
    }
    Ok(levels)
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("levels", &self.levels())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Executable for Rule {
    type Inputs = ValueMap;
    type Outputs = RuleOutcome;

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Rule
    }

    fn id(&self) -> &str {
        &self.id
    }

    /// Every stage must accept the context; failing stages are reported
    /// together.
    fn validate_context(&self, ctx: &ExecutionContext) -> Validation {
        let failures = self
            .stages
            .iter()
            .filter_map(|stage| {
                Executable::validate_context(stage, ctx)
                    .err()
                    .map(|failure| FieldFailure::invalid(stage.id(), failure.reason))
            })
            .collect();
        collect_failures("invalid stages", failures)
    }

    /// Native inputs must wrap and validate against the entry stage's
    /// declared inputs. A rule without an entry stage accepts anything.
    fn validate_inputs(&self, inputs: &ValueMap, ctx: &ExecutionContext) -> Validation {
        let Some(entry) = self.entry_stage() else {
            return Ok(());
        };
        let mut failures = Vec::new();
        for port in entry.metadata(Some(ctx)).inputs {
            match inputs.get(&port.id) {
                None | Some(Value::Null) if port.ty.is_nullable() => {}
                None | Some(Value::Null) => failures.push(FieldFailure::missing(&port.id)),
                Some(native) => {
                    let checked = port
                        .ty
                        .wrap(native)
                        .map_err(|e| e.to_string())
                        .and_then(|w| port.ty.validate(&w).map_err(|f| f.reason));
                    if let Err(reason) = checked {
                        failures.push(FieldFailure::invalid(&port.id, reason));
                    }
                }
            }
        }
        collect_failures("one or more inputs is invalid", failures)
    }

    async fn execute(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<RuleOutcome, ExecutorError> {
        self.execute_stages(inputs, ctx).await
    }
}
