use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tripwire_core::{FieldType, Primitive, Value, ValueMap, WrappedType};

use crate::node::{Node, NodeContext, NodeKind, NodeOption, OptionKind, PortSpec};

/// A field of a serialized wrapped type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedField {
    Primitive(Primitive),
    Wrapped(Box<SerializedType>),
}

/// A wrapped type described as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedType {
    pub id: String,
    pub name: String,
    pub nullable: bool,
    pub fields: BTreeMap<String, SerializedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPort {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SerializedType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedOption {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: OptionKind,
    pub required: bool,
    /// The value configured in the serialization context, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A node's shape, resolved against one context, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub options: Vec<SerializedOption>,
    pub inputs: Vec<SerializedPort>,
    pub outputs: Vec<SerializedPort>,
}

/// Option values a node shape is resolved against for serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializationContext {
    #[serde(default)]
    pub node_options: ValueMap,
}

impl SerializationContext {
    pub fn new(node_options: ValueMap) -> Self {
        Self { node_options }
    }
}

pub fn serialize_type(ty: &dyn WrappedType) -> SerializedType {
    SerializedType {
        id: ty.id().to_owned(),
        name: ty.name().to_owned(),
        nullable: ty.is_nullable(),
        fields: ty
            .fields()
            .into_iter()
            .map(|(name, field)| {
                let field = match field {
                    FieldType::Primitive(p) => SerializedField::Primitive(p),
                    FieldType::Wrapped(nested) => {
                        SerializedField::Wrapped(Box::new(serialize_type(nested.as_ref())))
                    }
                };
                (name.to_owned(), field)
            })
            .collect(),
    }
}

fn serialize_port(port: &PortSpec) -> SerializedPort {
    SerializedPort {
        id: port.id.clone(),
        name: port.name.clone(),
        ty: serialize_type(port.ty.as_ref()),
    }
}

fn serialize_option(option: NodeOption, ctx: &NodeContext<'_>) -> SerializedOption {
    SerializedOption {
        value: ctx.option(&option.id).cloned(),
        id: option.id,
        name: option.name,
        kind: option.kind,
        required: option.required,
    }
}

/// Describe a node as data, with its shape resolved against `ctx`.
pub fn serialize_node(node: &dyn Node, ctx: &SerializationContext) -> SerializedNode {
    let node_ctx = NodeContext::new(&ctx.node_options);
    let metadata = node.metadata(&node_ctx);
    SerializedNode {
        id: node.id().to_owned(),
        name: node.name().to_owned(),
        kind: node.kind(),
        description: node.description().map(ToOwned::to_owned),
        options: metadata
            .options
            .into_iter()
            .map(|o| serialize_option(o, &node_ctx))
            .collect(),
        inputs: metadata.inputs.iter().map(serialize_port).collect(),
        outputs: metadata.outputs.iter().map(serialize_port).collect(),
    }
}
