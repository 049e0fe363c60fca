use async_trait::async_trait;
use tripwire_core::{FieldFailure, Primitive, TypeRef, Value, ValueMap, wrapped};

use crate::error::NodeError;
use crate::node::{Node, NodeContext, NodeKind, NodeOption, PortSpec};

/// Entry node declaring the rule's inputs.
///
/// The `fields` option lists `name:TYPE` pairs separated by commas, e.g.
/// `"amount:NUMBER, country:STRING, when:DATE"`. Each field becomes both an
/// input and an output of the same type; values pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleInputsNode;

/// Parse a `fields` declaration into `(name, type)` pairs.
pub(crate) fn parse_fields(spec: &str) -> Result<Vec<(String, TypeRef)>, String> {
    let mut fields: Vec<(String, TypeRef)> = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, ty) = entry
            .split_once(':')
            .ok_or_else(|| format!("`{entry}` is not a name:TYPE pair"))?;
        let (name, ty) = (name.trim(), ty.trim());
        if name.is_empty() {
            return Err(format!("`{entry}` has an empty field name"));
        }
        if fields.iter().any(|(existing, _)| existing == name) {
            return Err(format!("field `{name}` is declared more than once"));
        }
        let ty = wrapped::by_id(ty).ok_or_else(|| format!("`{ty}` is not a known type"))?;
        fields.push((name.to_owned(), ty));
    }
    Ok(fields)
}

impl RuleInputsNode {
    fn fields(ctx: &NodeContext<'_>) -> Result<Vec<(String, TypeRef)>, NodeError> {
        let Some(value) = ctx.option("fields") else {
            return Ok(Vec::new());
        };
        let invalid = |reason: String| NodeError::InvalidOption {
            option: "fields".to_owned(),
            reason,
        };
        let spec = value
            .as_str()
            .ok_or_else(|| invalid(format!("`{value}` is not a string")))?;
        parse_fields(spec).map_err(invalid)
    }

    fn ports(ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        Self::fields(ctx)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, ty)| PortSpec::new(name.clone(), name, ty))
            .collect()
    }
}

#[async_trait]
impl Node for RuleInputsNode {
    fn id(&self) -> &str {
        "ruleInputs"
    }

    fn name(&self) -> &str {
        "Rule Inputs"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Entry
    }

    fn description(&self) -> Option<&str> {
        Some("Declare the inputs a rule expects")
    }

    fn options(&self, _ctx: &NodeContext<'_>) -> Vec<NodeOption> {
        vec![NodeOption::input("fields", "Fields", Primitive::String)]
    }

    fn check_options(&self, ctx: &NodeContext<'_>) -> Vec<FieldFailure> {
        match Self::fields(ctx) {
            Err(NodeError::InvalidOption { option, reason }) => {
                vec![FieldFailure::invalid(option, reason)]
            }
            _ => Vec::new(),
        }
    }

    fn inputs(&self, ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        Self::ports(ctx)
    }

    fn outputs(&self, ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        Self::ports(ctx)
    }

    async fn execute(&self, inputs: ValueMap, ctx: &NodeContext<'_>) -> Result<ValueMap, NodeError> {
        let fields = Self::fields(ctx)?;
        Ok(fields
            .into_iter()
            .map(|(name, _)| {
                let value = inputs.get(&name).cloned().unwrap_or(Value::Null);
                (name, value)
            })
            .collect())
    }
}
