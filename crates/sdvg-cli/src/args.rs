use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "sdvg",
    about = "Deterministic synthetic tabular data generator",
    version,
    after_help = "Examples:\n  sdvg generate config.yaml\n  sdvg generate config.yaml --continue     # resume from the last checkpoint\n  sdvg generate config.yaml --force        # overwrite a previous run's output\n  sdvg validate-config config.yaml"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate data described by a config file
    Generate(GenerateArgs),

    /// Parse and validate a config file, then print a model summary
    ValidateConfig(ValidateArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Path to the config file (.yaml, .yml or .json)
    pub config: PathBuf,

    /// Resume an interrupted run from its backup and checkpoints
    #[arg(long = "continue")]
    pub continue_generation: bool,

    /// Delete a previous run's output instead of refusing to start
    #[arg(long)]
    pub force: bool,

    /// Answer yes to the partition-files-limit prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Override the output directory from the config
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Override the worker count from the config
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the config file (.yaml, .yml or .json)
    pub config: PathBuf,

    /// Output format for the summary
    #[arg(long, default_value = "table")]
    pub format: ValidateFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ValidateFormat {
    Table,
    Json,
}
