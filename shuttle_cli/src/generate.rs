use std::path::PathBuf;

use clap::Subcommand;
use tracing::info;

#[derive(Subcommand)]
pub enum GenerateSubcommands {
    /// Print or write the JSON schema of the dataset format
    JsonSchema {
        /// Output file, prints to stdout when omitted
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

pub fn run(subcommand: GenerateSubcommands) -> Result<(), anyhow::Error> {
    match subcommand {
        GenerateSubcommands::JsonSchema { out: None } => {
            println!("{}", shuttle_planner::json::schema::generate_json_schema()?);
        }
        GenerateSubcommands::JsonSchema { out: Some(out) } => {
            let schema = shuttle_planner::json::schema::generate_json_schema()?;

            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }

            std::fs::write(&out, schema)?;
            info!("Wrote dataset schema to {}", out.display());
        }
    }

    Ok(())
}
