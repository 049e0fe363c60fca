pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod registry;
pub mod rule;
pub mod rule_set;
pub mod serializer;
pub mod stage;

#[cfg(test)]
mod testing;

pub use context::{CallFrame, ExecutionContext};
pub use error::{ConstructionError, ExecutorError, LookupError, NodeError};
pub use executor::{Executable, ExecutorKind, ExecutorResult, run};
pub use graph::RuleGraph;
pub use node::{
    DropDownChoice, Node, NodeContext, NodeKind, NodeMetadata, NodeOption, NodeRef, OptionKind,
    PortSpec, validate_node_options,
};
pub use registry::NodeRegistry;
pub use rule::{Rule, RuleOutcome};
pub use rule_set::{RuleResult, RuleSet, RuleSetEntry, RuleSetEntryResult, RuleSetOutcome};
pub use serializer::{
    SerializationContext, SerializedField, SerializedNode, SerializedOption, SerializedPort,
    SerializedType, serialize_node, serialize_type,
};
pub use stage::{ENTRY_STAGE_ID, EXIT_STAGE_ID, RuleStage, StageInput, StageResult, StageResults};
