use async_trait::async_trait;
use tripwire_core::{Primitive, ValueMap};

use crate::error::NodeError;
use crate::node::{Node, NodeContext, NodeOption, PortSpec};

/// Emit a constant configured on the stage.
///
/// The `valueType` option selects the primitive type (default `STRING`) and
/// shapes both the `value` option and the output port.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticValueNode;

impl StaticValueNode {
    fn value_type(ctx: &NodeContext<'_>) -> Result<Primitive, NodeError> {
        match ctx.option("valueType") {
            None => Ok(Primitive::String),
            Some(value) => value
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| NodeError::InvalidOption {
                    option: "valueType".to_owned(),
                    reason: format!("invalid valueType specified: `{value}`"),
                }),
        }
    }

    fn resolved_type(ctx: &NodeContext<'_>) -> Primitive {
        Self::value_type(ctx).unwrap_or(Primitive::String)
    }
}

#[async_trait]
impl Node for StaticValueNode {
    fn id(&self) -> &str {
        "staticValue"
    }

    fn name(&self) -> &str {
        "Static Value"
    }

    fn description(&self) -> Option<&str> {
        Some("Output a constant value")
    }

    fn options(&self, ctx: &NodeContext<'_>) -> Vec<NodeOption> {
        let types = Primitive::ALL.iter().map(|p| (p.as_str(), p.name()));
        vec![
            NodeOption::drop_down("valueType", "Value Type", types),
            NodeOption::input("value", "Value", Self::resolved_type(ctx)),
        ]
    }

    fn inputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        Vec::new()
    }

    fn outputs(&self, ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        vec![PortSpec::new(
            "value",
            "Value",
            Self::resolved_type(ctx).wrapped(),
        )]
    }

    async fn execute(&self, _inputs: ValueMap, ctx: &NodeContext<'_>) -> Result<ValueMap, NodeError> {
        let value_type = Self::value_type(ctx)?;
        let value = ctx.option("value").ok_or_else(|| NodeError::InvalidOption {
            option: "value".to_owned(),
            reason: "no value configured".to_owned(),
        })?;
        if !value_type.matches(value) {
            return Err(NodeError::InvalidOption {
                option: "value".to_owned(),
                reason: format!("`{value}` is not a {value_type}"),
            });
        }
        Ok(ValueMap::from([("value".to_owned(), value.clone())]))
    }
}

#[cfg(test)]
mod tests {
    use tripwire_core::Value;

    use super::*;
    use crate::testing::map;

    #[test]
    fn shape_follows_value_type() {
        let options = map(&[("valueType", "BOOLEAN".into())]);
        let ctx = NodeContext::new(&options);
        let outputs = StaticValueNode.outputs(&ctx);
        assert_eq!(outputs[0].ty.id(), "BOOLEAN");

        let declared = StaticValueNode.options(&ctx);
        assert!(declared[1].check(Some(&true.into())).is_ok());
        assert!(declared[1].check(Some(&"yes".into())).is_err());
    }

    #[test]
    fn defaults_to_string() {
        let outputs = StaticValueNode.outputs(&NodeContext::empty());
        assert_eq!(outputs[0].ty.id(), "STRING");
    }

    #[tokio::test]
    async fn emits_the_configured_value() {
        let options = map(&[("valueType", "NUMBER".into()), ("value", 42.into())]);
        let out = StaticValueNode
            .execute(ValueMap::new(), &NodeContext::new(&options))
            .await
            .unwrap();
        assert_eq!(out["value"], Value::from(42));
    }

    #[tokio::test]
    async fn rejects_unknown_value_type() {
        let options = map(&[("valueType", "DECIMAL".into()), ("value", 1.into())]);
        let err = StaticValueNode
            .execute(ValueMap::new(), &NodeContext::new(&options))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidOption { ref option, .. } if option == "valueType"));
    }
}
