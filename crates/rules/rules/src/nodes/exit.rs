use async_trait::async_trait;
use tripwire_core::{Value, ValueMap, wrapped};

use crate::error::NodeError;
use crate::node::{Node, NodeContext, NodeKind, PortSpec};

/// Terminal node of a rule. A null or absent input is `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitNode;

#[async_trait]
impl Node for ExitNode {
    fn id(&self) -> &str {
        "exit"
    }

    fn name(&self) -> &str {
        "Rule Result"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Exit
    }

    fn description(&self) -> Option<&str> {
        Some("Return the final rule result")
    }

    fn inputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        vec![PortSpec::new(
            "result",
            "Rule Result",
            wrapped::nullable(wrapped::boolean()),
        )]
    }

    fn outputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        vec![PortSpec::new("result", "Rule Result", wrapped::boolean())]
    }

    async fn execute(&self, inputs: ValueMap, _ctx: &NodeContext<'_>) -> Result<ValueMap, NodeError> {
        let result = inputs.get("result").is_some_and(Value::is_truthy);
        Ok(ValueMap::from([("result".to_owned(), Value::Bool(result))]))
    }
}
