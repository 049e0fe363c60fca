use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tripwire_core::{Primitive, Value, ValueMap, wrapped};

use crate::error::NodeError;
use crate::node::{Node, NodeContext, NodeOption, PortSpec, required_input};

/// Comparison applied by a [`CompareNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOperator {
    pub const ALL: [Self; 9] = [
        Self::Eq,
        Self::Neq,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Contains => "CONTAINS",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Eq => "Equal to",
            Self::Neq => "Not equal to",
            Self::Lt => "Less than",
            Self::Lte => "Less than or equal to",
            Self::Gt => "Greater than",
            Self::Gte => "Greater than or equal to",
            Self::Contains => "Contains",
            Self::StartsWith => "Starts with",
            Self::EndsWith => "Ends with",
        }
    }

    /// Operators meaningful for operands of the given primitive.
    pub fn for_operand(operand: Primitive) -> &'static [Self] {
        match operand {
            Primitive::Number => &Self::ALL[..6],
            Primitive::String => &[
                Self::Eq,
                Self::Neq,
                Self::Contains,
                Self::StartsWith,
                Self::EndsWith,
            ],
            Primitive::Boolean => &Self::ALL[..2],
        }
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator: {s}"))
    }
}

/// Compare two operands of one primitive type and produce a boolean.
///
/// The `operator` option defaults to `EQ`.
#[derive(Debug, Clone)]
pub struct CompareNode {
    id: &'static str,
    name: &'static str,
    operand: Primitive,
}

impl CompareNode {
    pub fn numbers() -> Self {
        Self {
            id: "compareNumbers",
            name: "Compare Numbers",
            operand: Primitive::Number,
        }
    }

    pub fn strings() -> Self {
        Self {
            id: "compareStrings",
            name: "Compare Strings",
            operand: Primitive::String,
        }
    }

    pub fn booleans() -> Self {
        Self {
            id: "compareBooleans",
            name: "Compare Booleans",
            operand: Primitive::Boolean,
        }
    }

    pub fn operand(&self) -> Primitive {
        self.operand
    }

    fn operator(&self, ctx: &NodeContext<'_>) -> Result<CompareOperator, NodeError> {
        let Some(value) = ctx.option("operator") else {
            return Ok(CompareOperator::Eq);
        };
        let invalid = |reason: String| NodeError::InvalidOption {
            option: "operator".to_owned(),
            reason,
        };
        let op = value
            .as_str()
            .ok_or_else(|| invalid(format!("`{value}` is not a string")))?
            .parse::<CompareOperator>()
            .map_err(invalid)?;
        if CompareOperator::for_operand(self.operand).contains(&op) {
            Ok(op)
        } else {
            Err(invalid(format!("{op} cannot compare {} values", self.operand)))
        }
    }
}

#[allow(clippy::float_cmp)]
fn ordering(op: CompareOperator, a: f64, b: f64) -> bool {
    match op {
        CompareOperator::Eq => a == b,
        CompareOperator::Neq => a != b,
        CompareOperator::Lt => a < b,
        CompareOperator::Lte => a <= b,
        CompareOperator::Gt => a > b,
        CompareOperator::Gte => a >= b,
        CompareOperator::Contains | CompareOperator::StartsWith | CompareOperator::EndsWith => {
            false
        }
    }
}

fn text(op: CompareOperator, a: &str, b: &str) -> bool {
    match op {
        CompareOperator::Eq => a == b,
        CompareOperator::Neq => a != b,
        CompareOperator::Contains => a.contains(b),
        CompareOperator::StartsWith => a.starts_with(b),
        CompareOperator::EndsWith => a.ends_with(b),
        CompareOperator::Lt => a < b,
        CompareOperator::Lte => a <= b,
        CompareOperator::Gt => a > b,
        CompareOperator::Gte => a >= b,
    }
}

#[async_trait]
impl Node for CompareNode {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> Option<&str> {
        Some("Compare two values and output whether the comparison holds")
    }

    fn options(&self, _ctx: &NodeContext<'_>) -> Vec<NodeOption> {
        let choices = CompareOperator::for_operand(self.operand)
            .iter()
            .map(|op| (op.as_str(), op.label()));
        vec![NodeOption::drop_down("operator", "Operator", choices).optional()]
    }

    fn inputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        let ty = self.operand.wrapped();
        vec![
            PortSpec::new("a", "A", ty.clone()),
            PortSpec::new("b", "B", ty),
        ]
    }

    fn outputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        vec![PortSpec::new("result", "Result", wrapped::boolean())]
    }

    async fn execute(&self, inputs: ValueMap, ctx: &NodeContext<'_>) -> Result<ValueMap, NodeError> {
        let op = self.operator(ctx)?;
        let a = required_input(&inputs, "a")?;
        let b = required_input(&inputs, "b")?;

        let mismatch = || {
            NodeError::Failed(format!(
                "{} expects {} operands, got {} and {}",
                self.id,
                self.operand,
                a.type_name(),
                b.type_name()
            ))
        };
        let result = match (self.operand, a, b) {
            (Primitive::Number, Value::Number(a), Value::Number(b)) => ordering(op, *a, *b),
            (Primitive::String, Value::String(a), Value::String(b)) => text(op, a, b),
            (Primitive::Boolean, Value::Bool(a), Value::Bool(b)) => match op {
                CompareOperator::Neq => a != b,
                _ => a == b,
            },
            _ => return Err(mismatch()),
        };

        Ok(ValueMap::from([("result".to_owned(), Value::Bool(result))]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::map;

    async fn compare(node: &CompareNode, op: Option<&str>, a: Value, b: Value) -> Result<bool, NodeError> {
        let options = match op {
            Some(op) => map(&[("operator", op.into())]),
            None => ValueMap::new(),
        };
        let ctx = NodeContext::new(&options);
        let out = node.execute(map(&[("a", a), ("b", b)]), &ctx).await?;
        Ok(out["result"] == Value::Bool(true))
    }

    #[tokio::test]
    async fn operator_defaults_to_eq() {
        let node = CompareNode::numbers();
        assert!(compare(&node, None, 3.into(), 3.into()).await.unwrap());
        assert!(!compare(&node, None, 3.into(), 4.into()).await.unwrap());
    }

    #[tokio::test]
    async fn numeric_ordering() {
        let node = CompareNode::numbers();
        assert!(compare(&node, Some("GT"), 1500.into(), 1000.into()).await.unwrap());
        assert!(!compare(&node, Some("LT"), 1500.into(), 1000.into()).await.unwrap());
        assert!(compare(&node, Some("GTE"), 1000.into(), 1000.into()).await.unwrap());
        assert!(compare(&node, Some("NEQ"), 1.into(), 2.into()).await.unwrap());
    }

    #[tokio::test]
    async fn string_matching() {
        let node = CompareNode::strings();
        assert!(compare(&node, Some("STARTS_WITH"), "FR-75".into(), "FR".into()).await.unwrap());
        assert!(compare(&node, Some("CONTAINS"), "abc".into(), "b".into()).await.unwrap());
        assert!(!compare(&node, Some("ENDS_WITH"), "abc".into(), "b".into()).await.unwrap());
    }

    #[tokio::test]
    async fn inapplicable_operator_is_rejected() {
        let node = CompareNode::booleans();
        let err = compare(&node, Some("GT"), true.into(), false.into())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidOption { ref option, .. } if option == "operator"));
    }

    #[tokio::test]
    async fn missing_operand_is_reported() {
        let node = CompareNode::numbers();
        let ctx = NodeContext::empty();
        let err = node.execute(map(&[("a", 1.into())]), &ctx).await.unwrap_err();
        assert_eq!(err, NodeError::MissingInput("b".into()));
    }

    #[test]
    fn options_list_applicable_operators() {
        let options = CompareNode::strings().options(&NodeContext::empty());
        assert_eq!(options.len(), 1);
        assert!(!options[0].required);
        assert!(options[0].check(Some(&"CONTAINS".into())).is_ok());
        assert!(CompareNode::numbers().options(&NodeContext::empty())[0]
            .check(Some(&"CONTAINS".into()))
            .is_err());
    }
}
