use clap::Args;
use tripwire_engine::Engine;
use tripwire_rules::{OptionKind, SerializationContext, SerializedNode};

use super::read_object;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct NodesArgs {
    /// Only describe this node.
    #[arg(long)]
    pub node: Option<String>,
    /// Option values to resolve node shapes against (JSON or @file path).
    #[arg(long)]
    pub options: Option<String>,
}

pub fn run(engine: &Engine, args: &NodesArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let ctx = match &args.options {
        Some(options) => SerializationContext::new(read_object(options)?),
        None => SerializationContext::default(),
    };
    let nodes = match &args.node {
        Some(id) => vec![engine.export_serialized_node(id, &ctx)?],
        None => engine.export_serialized_nodes(&ctx),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        OutputFormat::Text => {
            for node in &nodes {
                print_node(node);
            }
        }
    }
    Ok(())
}

fn print_node(node: &SerializedNode) {
    println!("{} [{}] ({})", node.name, node.id, node.kind);
    if let Some(description) = &node.description {
        println!("  {description}");
    }
    for option in &node.options {
        let required = if option.required { "required" } else { "optional" };
        let shape = match &option.kind {
            OptionKind::Input { value_type } => value_type.to_string(),
            OptionKind::DropDown { choices } => choices
                .iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
                .join(" | "),
        };
        match &option.value {
            Some(value) => println!("  option {}: {shape}, {required} = {value}", option.id),
            None => println!("  option {}: {shape}, {required}", option.id),
        }
    }
    for port in &node.inputs {
        println!("  in  {}: {}", port.id, port.ty.id);
    }
    for port in &node.outputs {
        println!("  out {}: {}", port.id, port.ty.id);
    }
}
