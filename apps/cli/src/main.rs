//! Lumen CLI - fine-tuning entry point for the Lumen denoising trainer
//!
//! The `lumen` command reshapes a fine-tuning argument document, writes the
//! self-describing parameter files, and drives the resolved generator/trainer
//! components through a full run.

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Lumen CLI - fine-tune a frame-interpolation denoising model
#[derive(Parser, Debug)]
#[command(
    name = "lumen",
    author,
    version,
    about = "Lumen - fine-tuning CLI for the frame-interpolation denoiser"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fine-tune a pretrained model from an argument document
    ///
    /// Writes the provenance dump and the three parameter files, resolves
    /// the generator pair and the trainer by name, runs training, and
    /// finalizes the output model.
    Finetune {
        /// Path to the JSON argument document
        #[arg(long)]
        input_json: PathBuf,

        /// Override the document's run uid
        #[arg(long)]
        run_uid: Option<String>,

        /// Dump the full argument set for provenance
        #[arg(long)]
        output_full_args: bool,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an argument document without writing anything
    Validate {
        /// Path to the JSON argument document
        #[arg(long)]
        input_json: PathBuf,

        /// Output the validation result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // If no command provided, show help
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::Finetune { input_json, run_uid, output_full_args, json } => {
            commands::finetune::execute(input_json, run_uid, output_full_args, json)?;
        }
        Command::Validate { input_json, json } => {
            commands::validate::execute(&input_json, json)?;
        }
    }

    Ok(())
}
