//! Validation subcommand

use clap::Parser;
use std::path::PathBuf;

use super::{CliError, OutputFormat};
use crate::identifier::ChannelRef;
use crate::input::read_channel_list;

/// Classify channel references offline
#[derive(Parser, Debug)]
pub struct ValidateCommand {
    /// Channel list CSV to classify
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Individual references (URL, @handle, channel id or name)
    pub references: Vec<String>,
}

impl ValidateCommand {
    /// Collect references from the file and the command line, in that order
    pub fn collect_references(&self) -> Result<Vec<ChannelRef>, CliError> {
        let mut refs = match &self.input {
            Some(path) => read_channel_list(path)?,
            None => Vec::new(),
        };
        for raw in &self.references {
            refs.push(ChannelRef::parse(raw)?);
        }

        if refs.is_empty() {
            return Err(CliError::InvalidArgument(
                "provide --input or at least one reference".to_string(),
            ));
        }
        Ok(refs)
    }

    /// Execute the validation command
    pub async fn execute(&self, format: OutputFormat) -> Result<(), CliError> {
        let refs = self.collect_references()?;

        match format {
            OutputFormat::Json => {
                let entries: Vec<_> = refs
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "reference": r.raw(),
                            "strategy": r.kind().strategy(),
                            "value": r.kind().value(),
                        })
                    })
                    .collect();
                let rendered = serde_json::to_string(&entries).map_err(|e| {
                    CliError::InvalidArgument(format!("Failed to render result: {e}"))
                })?;
                println!("{rendered}");
            }
            OutputFormat::Human => {
                for r in &refs {
                    println!("{}", r);
                    println!("  Strategy: {}", r.kind().strategy());
                    println!("  Lookup value: {}", r.kind().value());
                }
                println!("\n{} reference(s) classified", refs.len());
            }
        }
        Ok(())
    }
}
