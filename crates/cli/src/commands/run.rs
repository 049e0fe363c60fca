use clap::Args;
use tripwire_config::Revision;
use tripwire_engine::Engine;
use tripwire_rules::{RuleOutcome, RuleSetOutcome};

use super::read_object;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Rule set to execute.
    #[arg(long, conflicts_with = "rule", required_unless_present = "rule")]
    pub rule_set: Option<String>,
    /// Single rule to execute.
    #[arg(long)]
    pub rule: Option<String>,
    /// Inputs as a JSON object (string or @file path).
    #[arg(long, default_value = "{}")]
    pub inputs: String,
    /// Revision to load instead of the latest.
    #[arg(long)]
    pub revision: Option<u64>,
}

pub async fn run(engine: &Engine, args: &RunArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let inputs = read_object(&args.inputs)?;
    let revision = engine.load_config(args.revision.map(Revision::new)).await?;
    tracing::debug!(%revision, "configuration ready");

    if let Some(id) = &args.rule_set {
        let outcome = engine.execute_rule_set(id, inputs).await?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            OutputFormat::Text => print_rule_set(id, &outcome),
        }
    } else if let Some(id) = &args.rule {
        let outcome = engine.execute_rule(id, inputs).await?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            OutputFormat::Text => print_rule(id, &outcome),
        }
    }
    Ok(())
}

fn print_rule_set(id: &str, outcome: &RuleSetOutcome) {
    match (&outcome.severity, &outcome.matched_rule_id) {
        (Some(severity), Some(rule_id)) => {
            println!("rule set {id}: TRIGGERED, severity {severity} (rule {rule_id})");
        }
        _ => println!("rule set {id}: not triggered"),
    }
    for entry in &outcome.rule_results {
        let mark = if entry.triggered() { "x" } else { " " };
        println!(
            "  [{mark}] {rule} ({severity}, {ms:.3} ms)",
            rule = entry.rule_id,
            severity = entry.severity,
            ms = entry.result.execution_time_ms,
        );
    }
}

fn print_rule(id: &str, outcome: &RuleOutcome) {
    let status = if outcome.triggered { "TRIGGERED" } else { "not triggered" };
    println!("rule {id}: {status}");
    for (stage_id, result) in &outcome.stage_results {
        let outputs = serde_json::to_string(&result.outputs).unwrap_or_default();
        println!("  {stage_id}: {outputs}");
    }
}
