use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tripwire_config::ConfigFormat;
use tripwire_engine::Engine;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Document to check (`.json`, `.yaml` or `.yml`).
    pub file: PathBuf,
}

pub fn run(engine: &Engine, args: &ValidateArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let path = &args.file;
    let document_format = ConfigFormat::from_path(path)
        .with_context(|| format!("{}: unsupported file extension", path.display()))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = document_format.decode(&content)?;
    engine.validate_document(&document)?;

    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "valid": true,
                "revision": document.revision,
                "rules": document.rules.len(),
                "ruleSets": document.rule_sets.len(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!(
                "{}: revision {} is valid ({} rules, {} rule sets)",
                path.display(),
                document.revision,
                document.rules.len(),
                document.rule_sets.len()
            );
        }
    }
    Ok(())
}
