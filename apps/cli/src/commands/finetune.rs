//! Fine-tuning command implementation.
//!
//! The entry routine of the system: reshape the argument document, write the
//! self-describing parameter files, resolve the generator pair and the
//! trainer through the component registry, run training, and finalize the
//! output model.

use anyhow::{Context, Result};
use colored::Colorize;
use lumen_training::{
    apply_legacy_conversion, tagged_block, ComponentRegistry, FineTuneInput, RunLayout,
    StdoutProgressSink, TYPE_GENERATOR, TYPE_TRAINER,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub fn execute(
    input_json: PathBuf,
    run_uid: Option<String>,
    output_full_args: bool,
    json: bool,
) -> Result<()> {
    let bytes = std::fs::read(&input_json)
        .with_context(|| format!("Failed to read argument document: {}", input_json.display()))?;
    let mut input: FineTuneInput =
        serde_json::from_slice(&bytes).context("Failed to parse argument document")?;

    if let Some(uid) = run_uid {
        input.run_uid = uid;
    }
    if output_full_args {
        input.output_full_args = true;
    }
    input.validate().context("Invalid argument document")?;

    let layout =
        RunLayout::new(input.finetuning_params.output_dir.clone(), input.run_uid.clone());
    layout.ensure_dirs().context("Failed to create the output directory")?;

    // Provenance dump of the argument set, before any reshaping.
    if input.output_full_args {
        let path = layout.full_args_path();
        write_pretty(&path, &input)?;
        tracing::info!("wrote {}", path.display());
    }

    apply_legacy_conversion(&mut input);

    // The three parameter files, each a complete self-describing unit.
    let finetuning_path = layout.finetuning_path();
    write_pretty(&finetuning_path, &tagged_block(&input.finetuning_params, TYPE_TRAINER)?)?;
    tracing::info!("wrote {}", finetuning_path.display());

    let generator_path = layout.generator_path();
    write_pretty(&generator_path, &tagged_block(&input.generator_params, TYPE_GENERATOR)?)?;
    tracing::info!("wrote {}", generator_path.display());

    let test_generator_path = layout.test_generator_path();
    write_pretty(
        &test_generator_path,
        &tagged_block(&input.test_generator_params, TYPE_GENERATOR)?,
    )?;
    tracing::info!("wrote {}", test_generator_path.display());

    // From here the written files own the configuration; each component
    // reads its own block back from disk.
    let registry = ComponentRegistry::with_builtins();
    let data_generator = registry
        .find_and_build_generator(&generator_path)
        .context("Failed to build the train data generator")?;
    let data_test_generator = registry
        .find_and_build_generator(&test_generator_path)
        .context("Failed to build the test data generator")?;
    let mut training = registry
        .find_and_build_trainer(data_generator, data_test_generator, &finetuning_path)
        .context("Failed to build the trainer")?;
    tracing::info!("created objects for training");

    let report = training.run(&StdoutProgressSink).context("Fine-tuning run failed")?;

    tracing::info!("fine-tuning finished - finalizing output model");
    let model_path = training.finalize().context("Failed to finalize the output model")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", "Fine-tuning complete".bold().green());
    println!("  Run: {}", report.run_uid.cyan());
    println!("  Epochs: {}", report.epochs.len());
    println!("  Best val loss: {}", format!("{:.6}", report.best_val_loss).cyan());
    println!("  Model: {}", model_path.display().to_string().dimmed());
    println!();
    Ok(())
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .context("Failed to serialize parameter block")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
