use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use tripwire_core::{FieldFailure, Validation, Value, ValueMap, collect_failures, lookup_path};

use crate::context::ExecutionContext;
use crate::error::{ExecutorError, LookupError};
use crate::executor::{Executable, ExecutorKind, ExecutorResult};
use crate::node::{NodeContext, NodeKind, NodeMetadata, NodeRef, validate_node_options};

/// Pseudo-stage holding a rule's wrapped inputs.
pub const ENTRY_STAGE_ID: &str = "$entry";

/// Pseudo-stage aliasing the result of a rule's exit stage.
pub const EXIT_STAGE_ID: &str = "$exit";

/// Returns `true` for identifiers no declared stage may use.
pub fn is_reserved_stage_id(id: &str) -> bool {
    id == ENTRY_STAGE_ID || id == EXIT_STAGE_ID
}

/// Wire from an upstream stage output to an input of this stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInput {
    /// Stage whose outputs are read. May be [`ENTRY_STAGE_ID`].
    pub source_stage_id: String,
    /// Output id, or a dotted path into a wrapped output
    /// (`"when.hours"`, `"amount.value"`).
    pub output_key: String,
    /// Input id of this stage that receives the value.
    pub input_key: String,
}

impl StageInput {
    pub fn new(
        source_stage_id: impl Into<String>,
        output_key: impl Into<String>,
        input_key: impl Into<String>,
    ) -> Self {
        Self {
            source_stage_id: source_stage_id.into(),
            output_key: output_key.into(),
            input_key: input_key.into(),
        }
    }
}

/// Result of one stage: wrapped inputs and wrapped outputs.
pub type StageResult = ExecutorResult<ValueMap, ValueMap>;

/// Stage results of one rule execution, keyed by stage id.
pub type StageResults = BTreeMap<String, StageResult>;

/// A node placed in a rule, with its option values and input wiring.
///
/// Stages are stateless: the same stage may run any number of times, in any
/// number of concurrent executions.
pub struct RuleStage {
    id: String,
    node: NodeRef,
    node_options: ValueMap,
    inputs: Vec<StageInput>,
}

impl RuleStage {
    pub fn new(
        id: impl Into<String>,
        node: NodeRef,
        node_options: ValueMap,
        inputs: Vec<StageInput>,
    ) -> Self {
        Self {
            id: id.into(),
            node,
            node_options,
            inputs,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn node_kind(&self) -> NodeKind {
        self.node.kind()
    }

    pub fn node_options(&self) -> &ValueMap {
        &self.node_options
    }

    pub fn inputs(&self) -> &[StageInput] {
        &self.inputs
    }

    /// Distinct upstream stage ids, in wiring order.
    pub fn depends_on(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !deps.contains(&input.source_stage_id.as_str()) {
                deps.push(&input.source_stage_id);
            }
        }
        deps
    }

    /// The node context this stage presents to its node.
    pub fn node_context<'a>(&'a self, execution: Option<&'a ExecutionContext>) -> NodeContext<'a> {
        NodeContext {
            node_options: &self.node_options,
            execution,
        }
    }

    /// The node's shape resolved against this stage's options.
    pub fn metadata(&self, execution: Option<&ExecutionContext>) -> NodeMetadata {
        self.node.metadata(&self.node_context(execution))
    }

    /// Assemble this stage's wrapped inputs from upstream results.
    ///
    /// An entry stage receives the rule's wrapped inputs directly. Every
    /// other stage reads each wired output by path; a path that does not
    /// resolve yields null, while an upstream stage without a result is a
    /// lookup failure.
    pub fn gather_inputs(&self, results: &StageResults) -> Result<ValueMap, LookupError> {
        if self.node_kind() == NodeKind::Entry {
            return results
                .get(ENTRY_STAGE_ID)
                .map(|entry| entry.outputs.clone())
                .ok_or_else(|| self.missing_result(ENTRY_STAGE_ID));
        }

        let mut gathered = ValueMap::new();
        for input in &self.inputs {
            let upstream = results
                .get(&input.source_stage_id)
                .ok_or_else(|| self.missing_result(&input.source_stage_id))?;
            let value = lookup_path(&upstream.outputs, &input.output_key)
                .cloned()
                .unwrap_or(Value::Null);
            gathered.insert(input.input_key.clone(), value);
        }
        Ok(gathered)
    }

    fn missing_result(&self, source: &str) -> LookupError {
        LookupError::MissingStageResult {
            stage_id: self.id.clone(),
            source_stage_id: source.to_owned(),
        }
    }

    fn type_error(&self, port: &str, source: tripwire_core::TypeError) -> ExecutorError {
        ExecutorError::Type {
            stage_id: self.id.clone(),
            port: port.to_owned(),
            source,
        }
    }

    #[instrument(skip_all, fields(stage.id = %self.id, node.id = self.node.id()))]
    async fn execute_node(
        &self,
        inputs: &ValueMap,
        ctx: &ExecutionContext,
    ) -> Result<ValueMap, ExecutorError> {
        let node_ctx = self.node_context(Some(ctx));
        let metadata = self.node.metadata(&node_ctx);

        let mut native = ValueMap::new();
        for port in &metadata.inputs {
            let wrapped = inputs.get(&port.id).unwrap_or(&Value::Null);
            let value = port
                .ty
                .unwrap(wrapped)
                .map_err(|e| self.type_error(&port.id, e))?;
            native.insert(port.id.clone(), value);
        }

        let produced = self
            .node
            .execute(native, &node_ctx)
            .await
            .map_err(|source| ExecutorError::Node {
                stage_id: self.id.clone(),
                node_id: self.node.id().to_owned(),
                source,
            })?;

        let mut outputs = ValueMap::new();
        let mut failures = Vec::new();
        for port in &metadata.outputs {
            let native = produced.get(&port.id).unwrap_or(&Value::Null);
            let wrapped = port
                .ty
                .wrap(native)
                .map_err(|e| self.type_error(&port.id, e))?;
            if let Err(failure) = port.ty.validate(&wrapped) {
                failures.push(FieldFailure::invalid(&port.id, failure.reason));
            }
            outputs.insert(port.id.clone(), wrapped);
        }
        collect_failures("one or more outputs is invalid", failures).map_err(|failure| {
            ExecutorError::InvalidOutputs {
                stage_id: self.id.clone(),
                failure,
            }
        })?;
        Ok(outputs)
    }
}

impl fmt::Debug for RuleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleStage")
            .field("id", &self.id)
            .field("node", &self.node.id())
            .field("node_options", &self.node_options)
            .field("inputs", &self.inputs)
            .finish()
    }
}

#[async_trait]
impl Executable for RuleStage {
    type Inputs = ValueMap;
    type Outputs = ValueMap;

    fn kind(&self) -> ExecutorKind {
        ExecutorKind::RuleStage
    }

    fn id(&self) -> &str {
        &self.id
    }

    /// The configured option values must satisfy the node's options.
    fn validate_context(&self, ctx: &ExecutionContext) -> Validation {
        validate_node_options(self.node.as_ref(), &self.node_context(Some(ctx)))
    }

    /// Every declared input must be present (unless nullable) and valid.
    fn validate_inputs(&self, inputs: &ValueMap, ctx: &ExecutionContext) -> Validation {
        let declared = self.node.inputs(&self.node_context(Some(ctx)));
        let mut failures = Vec::new();
        for port in &declared {
            match inputs.get(&port.id) {
                None | Some(Value::Null) if port.ty.is_nullable() => {}
                None | Some(Value::Null) => failures.push(FieldFailure::missing(&port.id)),
                Some(value) => {
                    if let Err(failure) = port.ty.validate(value) {
                        failures.push(FieldFailure::invalid(&port.id, failure.reason));
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
    ) -> Result<ValueMap, ExecutorError> {
        self.execute_node(inputs, ctx).await
    }
}
