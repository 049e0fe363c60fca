use clap::{Args, Subcommand};
use tripwire_engine::Engine;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the latest revision and the rules it defines.
    Show,
    /// Store the latest revision again as a new JSON revision.
    Save,
}

pub async fn run(engine: &Engine, args: &ConfigArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let Some(revision) = engine.init().await? else {
        anyhow::bail!("no configuration revision stored");
    };

    match &args.command {
        ConfigCommand::Show => match format {
            OutputFormat::Json => {
                let summary = serde_json::json!({
                    "revision": revision,
                    "rules": engine.rule_ids(),
                    "ruleSets": engine.rule_set_ids(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Text => {
                println!("revision {revision}");
                println!("{} rules:", engine.rule_ids().len());
                for id in engine.rule_ids() {
                    println!("  {id}");
                }
                println!("{} rule sets:", engine.rule_set_ids().len());
                for id in engine.rule_set_ids() {
                    println!("  {id}");
                }
            }
        },
        ConfigCommand::Save => {
            let saved = engine.save_config().await?;
            println!("Saved revision {revision} as revision {saved}.");
        }
    }
    Ok(())
}
