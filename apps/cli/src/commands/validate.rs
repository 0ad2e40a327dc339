//! Argument-document validation command.
//!
//! Loads and schema-validates a fine-tuning argument document without
//! writing anything to the output directory.

use anyhow::{Context, Result};
use colored::Colorize;
use lumen_training::FineTuneInput;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ValidationOutput {
    valid: bool,
    run_uid: Option<String>,
    error: Option<String>,
}

pub fn execute(input_json: &Path, json: bool) -> Result<()> {
    let outcome = load(input_json);

    if json {
        let output = match &outcome {
            Ok(input) => ValidationOutput {
                valid: true,
                run_uid: Some(input.run_uid.clone()),
                error: None,
            },
            Err(e) => ValidationOutput { valid: false, run_uid: None, error: Some(format!("{e:#}")) },
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match &outcome {
            Ok(input) => {
                println!("{}", "lumen validate".bold().cyan());
                println!();
                println!("  {} {}", "✓".green().bold(), input_json.display().to_string().dimmed());
                println!();
                println!("  Run: {}", input.run_uid.cyan());
                println!("  Trainer: {}", input.finetuning_params.name);
                println!("  Loss: {}", input.finetuning_params.loss);
                println!(
                    "  Generators: {} / {}",
                    input.generator_params.name, input.test_generator_params.name
                );
                println!("  Output dir: {}", input.finetuning_params.output_dir.display());
                println!();
                println!("{}", "✓ Document is valid".green().bold());
            }
            Err(e) => {
                println!("  {} {}", "✗".red().bold(), input_json.display());
                println!("    {}: {}", "Error".red(), format!("{e:#}").dimmed());
            }
        }
    }

    if outcome.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

fn load(input_json: &Path) -> Result<FineTuneInput> {
    let bytes = std::fs::read(input_json)
        .with_context(|| format!("Failed to read argument document: {}", input_json.display()))?;
    let input: FineTuneInput =
        serde_json::from_slice(&bytes).context("Failed to parse argument document")?;
    input.validate().context("Invalid argument document")?;
    Ok(input)
}
