use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tripwire_core::Validation;

use crate::context::ExecutionContext;
use crate::error::ExecutorError;

/// Which kind of executor produced a result or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    RuleStage,
    Rule,
    RuleSet,
}

impl ExecutorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuleStage => "rule stage",
            Self::Rule => "rule",
            Self::RuleSet => "rule set",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing, inputs and outputs of one successful execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorResult<I, O> {
    /// Wall-clock duration of `execute`, in milliseconds.
    pub execution_time_ms: f64,
    pub inputs: I,
    pub outputs: O,
}

/// The protocol shared by rule stages, rules and rule sets.
///
/// Callers go through [`run`], which validates the context, then the
/// inputs, and only then executes and measures.
#[async_trait]
pub trait Executable: Send + Sync {
    type Inputs: Send + Sync;
    type Outputs: Send;

    fn kind(&self) -> ExecutorKind;

    fn id(&self) -> &str;

    fn validate_context(&self, _ctx: &ExecutionContext) -> Validation {
        Ok(())
    }

    fn validate_inputs(&self, _inputs: &Self::Inputs, _ctx: &ExecutionContext) -> Validation {
        Ok(())
    }

    async fn execute(
        &self,
        inputs: &Self::Inputs,
        ctx: &ExecutionContext,
    ) -> Result<Self::Outputs, ExecutorError>;
}

/// Run an executor: validate context, validate inputs, execute, time.
///
/// Validation failures are returned as
/// [`ExecutorError::InvalidContext`] / [`ExecutorError::InvalidInputs`]
/// and `execute` is not invoked.
pub async fn run<E>(
    executor: &E,
    inputs: E::Inputs,
    ctx: &ExecutionContext,
) -> Result<ExecutorResult<E::Inputs, E::Outputs>, ExecutorError>
where
    E: Executable + ?Sized,
{
    let kind = executor.kind();
    if let Err(failure) = executor.validate_context(ctx) {
        warn!(%kind, id = executor.id(), reason = %failure, "execution context rejected");
        return Err(ExecutorError::InvalidContext {
            kind,
            id: executor.id().to_owned(),
            failure,
        });
    }
    if let Err(failure) = executor.validate_inputs(&inputs, ctx) {
        warn!(%kind, id = executor.id(), reason = %failure, "inputs rejected");
        return Err(ExecutorError::InvalidInputs {
            kind,
            id: executor.id().to_owned(),
            failure,
        });
    }

    let started = Instant::now();
    let outputs = executor.execute(&inputs, ctx).await?;
    let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    debug!(%kind, id = executor.id(), execution_time_ms, "executed");

    Ok(ExecutorResult {
        execution_time_ms,
        inputs,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tripwire_core::ValidationFailure;

    use super::*;
    use crate::graph::RuleGraph;

    struct Doubler {
        reject_context: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Executable for Doubler {
        type Inputs = i64;
        type Outputs = i64;

        fn kind(&self) -> ExecutorKind {
            ExecutorKind::RuleStage
        }

        fn id(&self) -> &str {
            "doubler"
        }

        fn validate_context(&self, _ctx: &ExecutionContext) -> Validation {
            if self.reject_context {
                Err(ValidationFailure::new("no context"))
            } else {
                Ok(())
            }
        }

        fn validate_inputs(&self, inputs: &i64, _ctx: &ExecutionContext) -> Validation {
            if *inputs < 0 {
                Err(ValidationFailure::new("negative"))
            } else {
                Ok(())
            }
        }

        async fn execute(&self, inputs: &i64, _ctx: &ExecutionContext) -> Result<i64, ExecutorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs * 2)
        }
    }

    fn doubler(reject_context: bool) -> Doubler {
        Doubler {
            reject_context,
            calls: AtomicUsize::new(0),
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(Arc::new(RuleGraph::default()))
    }

    #[tokio::test]
    async fn run_returns_inputs_outputs_and_timing() {
        let exec = doubler(false);
        let result = run(&exec, 21, &ctx()).await.unwrap();
        assert_eq!(result.inputs, 21);
        assert_eq!(result.outputs, 42);
        assert!(result.execution_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn invalid_inputs_skip_execute() {
        let exec = doubler(false);
        let err = run(&exec, -1, &ctx()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidInputs { ref failure, .. } if failure.reason == "negative"));
        assert_eq!(exec.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn context_is_validated_before_inputs() {
        let exec = doubler(true);
        let err = run(&exec, -1, &ctx()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidContext { kind: ExecutorKind::RuleStage, .. }));
        assert_eq!(exec.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = ExecutorResult {
            execution_time_ms: 1.5,
            inputs: 1,
            outputs: 2,
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"executionTimeMs": 1.5, "inputs": 1, "outputs": 2})
        );
    }
}
