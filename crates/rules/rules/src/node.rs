use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tripwire_core::{
    FieldFailure, Primitive, TypeRef, Validation, Value, ValueMap, collect_failures,
};

use crate::context::ExecutionContext;
use crate::error::NodeError;

/// Shared handle to a registered node.
pub type NodeRef = Arc<dyn Node>;

/// Role a node plays inside a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Receives the rule's inputs.
    Entry,
    /// Produces the rule's boolean result.
    Exit,
    /// Anything in between.
    Standard,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entry => "ENTRY",
            Self::Exit => "EXIT",
            Self::Standard => "STANDARD",
        })
    }
}

/// One selectable value of a drop-down option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropDownChoice {
    pub id: String,
    pub name: String,
}

/// Shape of a configurable node option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    /// Free-form primitive input.
    Input {
        #[serde(rename = "valueType")]
        value_type: Primitive,
    },
    /// Pick one of a fixed list of string identifiers.
    DropDown { choices: Vec<DropDownChoice> },
}

/// A configurable option of a node.
///
/// The validity predicate is derived from the option kind: an input must
/// match its primitive type, a drop-down must name one of its choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOption {
    pub id: String,
    pub name: String,
    pub kind: OptionKind,
    pub required: bool,
}

impl NodeOption {
    /// A required free-form option of the given primitive type.
    pub fn input(id: impl Into<String>, name: impl Into<String>, value_type: Primitive) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: OptionKind::Input { value_type },
            required: true,
        }
    }

    /// A required drop-down option. Choices are `(id, name)` pairs.
    pub fn drop_down<'a>(
        id: impl Into<String>,
        name: impl Into<String>,
        choices: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: OptionKind::DropDown {
                choices: choices
                    .into_iter()
                    .map(|(id, name)| DropDownChoice {
                        id: id.to_owned(),
                        name: name.to_owned(),
                    })
                    .collect(),
            },
            required: true,
        }
    }

    /// Mark the option as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Check a configured value against this option.
    ///
    /// An absent or null value is only a failure when the option is required.
    pub fn check(&self, value: Option<&Value>) -> Result<(), FieldFailure> {
        let value = match value {
            None | Some(Value::Null) if self.required => {
                return Err(FieldFailure::missing(&self.id));
            }
            None | Some(Value::Null) => return Ok(()),
            Some(value) => value,
        };
        match &self.kind {
            OptionKind::Input { value_type } if value_type.matches(value) => Ok(()),
            OptionKind::Input { value_type } => Err(FieldFailure::invalid(
                &self.id,
                format!("`{value}` is not a {}", value_type.as_str()),
            )),
            OptionKind::DropDown { choices } => {
                let selected = value.as_str();
                if choices.iter().any(|c| Some(c.id.as_str()) == selected) {
                    Ok(())
                } else {
                    let ids = choices
                        .iter()
                        .map(|c| c.id.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    Err(FieldFailure::invalid(
                        &self.id,
                        format!("`{value}` is not one of [{ids}]"),
                    ))
                }
            }
        }
    }
}

/// Validate configured option values against a list of option declarations.
pub fn validate_options(options: &[NodeOption], values: &ValueMap) -> Validation {
    let failures = options
        .iter()
        .filter_map(|option| option.check(values.get(&option.id)).err())
        .collect();
    collect_failures("invalid node options", failures)
}

/// Validate the option values in `ctx` against the node's declared options
/// and its own [`Node::check_options`]. At most one failure per option.
pub fn validate_node_options(node: &dyn Node, ctx: &NodeContext<'_>) -> Validation {
    let mut failures: Vec<FieldFailure> = node
        .options(ctx)
        .iter()
        .filter_map(|option| option.check(ctx.node_options.get(&option.id)).err())
        .collect();
    for failure in node.check_options(ctx) {
        if failures.iter().all(|f| f.field != failure.field) {
            failures.push(failure);
        }
    }
    collect_failures("invalid node options", failures)
}

/// A typed input or output port of a node.
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub id: String,
    pub name: String,
    pub ty: TypeRef,
}

impl PortSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ty,
        }
    }
}

/// Options, inputs and outputs of a node resolved against one context.
#[derive(Debug, Clone, Default)]
pub struct NodeMetadata {
    pub options: Vec<NodeOption>,
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

impl NodeMetadata {
    pub fn input(&self, id: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.id == id)
    }
}

static NO_OPTIONS: ValueMap = ValueMap::new();

/// What a node sees when it resolves its shape or executes.
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    /// Option values configured on the stage using the node.
    pub node_options: &'a ValueMap,
    /// The surrounding execution, absent when the shape is resolved for
    /// serialization.
    pub execution: Option<&'a ExecutionContext>,
}

impl<'a> NodeContext<'a> {
    pub fn new(node_options: &'a ValueMap) -> Self {
        Self {
            node_options,
            execution: None,
        }
    }

    /// A context with no options configured.
    pub fn empty() -> NodeContext<'static> {
        NodeContext {
            node_options: &NO_OPTIONS,
            execution: None,
        }
    }

    #[must_use]
    pub fn with_execution(mut self, execution: &'a ExecutionContext) -> Self {
        self.execution = Some(execution);
        self
    }

    /// A configured option value. Null counts as not configured.
    pub fn option(&self, id: &str) -> Option<&'a Value> {
        self.node_options.get(id).filter(|v| !v.is_null())
    }
}

impl fmt::Debug for NodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("node_options", self.node_options)
            .field(
                "execution_id",
                &self.execution.map(|ctx| ctx.execution_id),
            )
            .finish()
    }
}

/// A reusable unit of computation with typed inputs, outputs and options.
///
/// The shape functions (`options`, `inputs`, `outputs`) must be pure: the
/// same context always resolves to the same shape. `execute` receives native
/// (unwrapped) input values keyed by input id and returns native output
/// values keyed by output id.
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier within a registry.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind {
        NodeKind::Standard
    }

    fn description(&self) -> Option<&str> {
        None
    }

    /// Configurable options. Later options may depend on the values chosen
    /// for earlier ones.
    fn options(&self, _ctx: &NodeContext<'_>) -> Vec<NodeOption> {
        Vec::new()
    }

    /// Node-specific checks on configured option values, beyond what each
    /// option's kind can express.
    fn check_options(&self, _ctx: &NodeContext<'_>) -> Vec<FieldFailure> {
        Vec::new()
    }

    fn inputs(&self, ctx: &NodeContext<'_>) -> Vec<PortSpec>;

    fn outputs(&self, ctx: &NodeContext<'_>) -> Vec<PortSpec>;

    /// Resolve the complete shape against one context.
    fn metadata(&self, ctx: &NodeContext<'_>) -> NodeMetadata {
        NodeMetadata {
            options: self.options(ctx),
            inputs: self.inputs(ctx),
            outputs: self.outputs(ctx),
        }
    }

    async fn execute(&self, inputs: ValueMap, ctx: &NodeContext<'_>) -> Result<ValueMap, NodeError>;
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

/// Fetch a native input, failing if it is absent.
pub fn required_input<'v>(inputs: &'v ValueMap, id: &str) -> Result<&'v Value, NodeError> {
    inputs
        .get(id)
        .filter(|v| !v.is_null())
        .ok_or_else(|| NodeError::MissingInput(id.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, Value)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn input_option_checks_primitive_type() {
        let option = NodeOption::input("threshold", "Threshold", Primitive::Number);
        assert!(option.check(Some(&Value::from(3))).is_ok());

        let failure = option.check(Some(&Value::from("3"))).unwrap_err();
        assert_eq!(failure.field, "threshold");
        assert!(!failure.is_missing());

        assert!(option.check(None).unwrap_err().is_missing());
        assert!(option.check(Some(&Value::Null)).unwrap_err().is_missing());
        assert!(option.optional().check(None).is_ok());
    }

    #[test]
    fn drop_down_requires_a_listed_choice() {
        let option = NodeOption::drop_down("op", "Operator", [("EQ", "="), ("NEQ", "!=")]);
        assert!(option.check(Some(&Value::from("NEQ"))).is_ok());
        let failure = option.check(Some(&Value::from("GT"))).unwrap_err();
        assert_eq!(
            failure.to_string(),
            "op (invalid: `GT` is not one of [EQ, NEQ])"
        );
    }

    #[test]
    fn validate_options_aggregates_failures() {
        let declared = vec![
            NodeOption::input("a", "A", Primitive::String),
            NodeOption::input("b", "B", Primitive::Boolean),
            NodeOption::input("c", "C", Primitive::Number).optional(),
        ];
        let err = validate_options(&declared, &options(&[("b", Value::from(1))])).unwrap_err();
        assert_eq!(err.fields.len(), 2);
        assert!(err.field("a").unwrap().is_missing());
        assert!(err.field("b").is_some());
        assert!(err.reason.starts_with("invalid node options: "));

        let ok = options(&[("a", "x".into()), ("b", true.into())]);
        assert!(validate_options(&declared, &ok).is_ok());
    }

    #[test]
    fn option_kind_serializes_with_type_tag() {
        let json = serde_json::to_value(OptionKind::Input {
            value_type: Primitive::Number,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "INPUT", "valueType": "NUMBER"})
        );
        let json = serde_json::to_value(&NodeOption::drop_down("x", "X", [("A", "a")]).kind)
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "DROP_DOWN", "choices": [{"id": "A", "name": "a"}]})
        );
    }

    #[test]
    fn context_ignores_null_options() {
        let values = options(&[("a", Value::Null), ("b", 1.into())]);
        let ctx = NodeContext::new(&values);
        assert!(ctx.option("a").is_none());
        assert_eq!(ctx.option("b"), Some(&Value::from(1)));
        assert!(NodeContext::empty().option("b").is_none());
    }

    #[test]
    fn required_input_rejects_null() {
        let values = options(&[("a", Value::Null)]);
        assert!(matches!(
            required_input(&values, "a"),
            Err(NodeError::MissingInput(id)) if id == "a"
        ));
    }
}
