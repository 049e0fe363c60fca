//! Built-in nodes available to every registry created with
//! [`NodeRegistry::with_builtins`](crate::NodeRegistry::with_builtins).

mod compare;
mod exit;
mod rule_inputs;
mod static_value;

use std::sync::Arc;

pub use compare::{CompareNode, CompareOperator};
pub use exit::ExitNode;
pub use rule_inputs::RuleInputsNode;
pub use static_value::StaticValueNode;

use crate::node::NodeRef;

/// Every built-in node, in registration order.
pub fn builtins() -> Vec<NodeRef> {
    vec![
        Arc::new(RuleInputsNode),
        Arc::new(ExitNode),
        Arc::new(StaticValueNode),
        Arc::new(CompareNode::numbers()),
        Arc::new(CompareNode::strings()),
        Arc::new(CompareNode::booleans()),
    ]
}
