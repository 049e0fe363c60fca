use thiserror::Error;
use tripwire_core::{TypeError, ValidationFailure};

use crate::executor::ExecutorKind;

/// Errors raised while building nodes, rules, rule sets or graphs.
///
/// These are returned from constructors and from configuration parsing;
/// nothing is executed once one of them has been produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("rule `{rule_id}` declares stage `{stage_id}` more than once")]
    DuplicateStage { rule_id: String, stage_id: String },

    #[error("rule `{rule_id}` uses reserved stage id `{stage_id}`")]
    ReservedStageId { rule_id: String, stage_id: String },

    #[error("rule `{rule_id}` has {count} entry stages, at most one is allowed")]
    TooManyEntryStages { rule_id: String, count: usize },

    #[error("rule `{rule_id}` has {count} exit stages, at most one is allowed")]
    TooManyExitStages { rule_id: String, count: usize },

    #[error("stage `{stage_id}` in rule `{rule_id}` depends on unknown stage `{dependency}`")]
    UnknownDependency {
        rule_id: String,
        stage_id: String,
        dependency: String,
    },

    /// Raised when the remaining stages cannot be placed on any level,
    /// i.e. they form a cycle.
    #[error("invalid rule stage dependencies detected in rule `{rule_id}`: {}", .stages.join(", "))]
    InvalidDependencies { rule_id: String, stages: Vec<String> },

    #[error("stage `{stage_id}` in rule `{rule_id}` references unknown node `{node_id}`")]
    UnknownNode {
        rule_id: String,
        stage_id: String,
        node_id: String,
    },

    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),

    #[error("duplicate rule id `{0}`")]
    DuplicateRule(String),

    #[error("duplicate rule set id `{0}`")]
    DuplicateRuleSet(String),

    #[error("rule set `{rule_set_id}` references undefined rule `{rule_id}`")]
    UndefinedRule { rule_set_id: String, rule_id: String },
}

/// A referenced entity could not be resolved at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("rule set `{rule_set_id}` references unknown rule `{rule_id}`")]
    UnknownRule { rule_set_id: String, rule_id: String },

    #[error("unknown rule `{0}`")]
    Rule(String),

    #[error("unknown rule set `{0}`")]
    RuleSet(String),

    #[error("stage `{stage_id}` reads from stage `{source_stage_id}` which has no result")]
    MissingStageResult {
        stage_id: String,
        source_stage_id: String,
    },
}

/// Failure reported by a node's own `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("missing input `{0}`")]
    MissingInput(String),

    #[error("invalid option `{option}`: {reason}")]
    InvalidOption { option: String, reason: String },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("{0}")]
    Failed(String),
}

/// Errors raised while running an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// `validate_context` rejected the execution context.
    #[error("{kind} `{id}` rejected its context: {failure}")]
    InvalidContext {
        kind: ExecutorKind,
        id: String,
        failure: ValidationFailure,
    },

    /// `validate_inputs` rejected the inputs.
    #[error("{kind} `{id}` rejected its inputs: {failure}")]
    InvalidInputs {
        kind: ExecutorKind,
        id: String,
        failure: ValidationFailure,
    },

    /// A node produced outputs that do not satisfy its declared output types.
    #[error("stage `{stage_id}` produced invalid outputs: {failure}")]
    InvalidOutputs {
        stage_id: String,
        failure: ValidationFailure,
    },

    #[error("node `{node_id}` failed in stage `{stage_id}`: {source}")]
    Node {
        stage_id: String,
        node_id: String,
        #[source]
        source: NodeError,
    },

    #[error("stage `{stage_id}` could not convert `{port}`: {source}")]
    Type {
        stage_id: String,
        port: String,
        #[source]
        source: TypeError,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// One or more concurrently executed participants failed. Every
    /// failure of the level is reported, in declaration order.
    #[error("{kind} `{id}` failed: {}", join(.failures))]
    Aggregate {
        kind: ExecutorKind,
        id: String,
        failures: Vec<ExecutorError>,
    },
}

impl ExecutorError {
    /// Wrap sibling failures, unwrapping the single-failure case.
    pub fn aggregate(kind: ExecutorKind, id: &str, mut failures: Vec<Self>) -> Self {
        if failures.len() == 1
            && let Some(only) = failures.pop()
        {
            return only;
        }
        Self::Aggregate {
            kind,
            id: id.to_owned(),
            failures,
        }
    }

    /// The validation failure carried by this error, if it is one.
    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::InvalidContext { failure, .. }
            | Self::InvalidInputs { failure, .. }
            | Self::InvalidOutputs { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Returns `true` for failures caused by rejected inputs or context,
    /// as opposed to failures raised while running.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Aggregate { failures, .. } => failures.iter().all(Self::is_validation),
            other => matches!(
                other,
                Self::InvalidContext { .. } | Self::InvalidInputs { .. }
            ),
        }
    }
}

fn join(failures: &[ExecutorError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
