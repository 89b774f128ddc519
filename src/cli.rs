//! CLI argument parsing for the risk pipeline.
//!
//! The CLI is thin: it gathers inputs, resolves config and credentials, and
//! hands a single request to the pipeline.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "stpm",
    version,
    about = "Forecast program risks, trade-offs, and stakeholder comms with an LM pipeline",
    after_help = "Examples:\n  stpm run --description \"Scaling a new 1GW TPU cluster in Texas, 9-month deadline, $500M budget\"\n  stpm run --description-file program.txt --attachment roadmap.pdf --out report.json\n  stpm summarize report.json\n  stpm config > ~/.config/shadow-tpm/config.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log progress to stderr (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Summarize(SummarizeArgs),
    Config(ConfigArgs),
}

/// Run command inputs for one pipeline invocation.
#[derive(Parser, Debug)]
#[command(about = "Run the risk pipeline for one program description")]
pub struct RunArgs {
    #[command(flatten)]
    pub description: DescriptionArgs,

    /// Document or image to inform the forecast (pdf, docx, txt, png, jpg); `-` reads stdin
    #[arg(long, value_name = "PATH")]
    pub attachment: Option<PathBuf>,

    /// Media type of the attachment (inferred from the extension by default)
    #[arg(long, value_name = "MIME", requires = "attachment")]
    pub media_type: Option<String>,

    /// Write the result JSON here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Pipeline config JSON (defaults to the per-user config, then built-ins)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Completion API key (falls back to SHADOW_TPM_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// News API key (falls back to SHADOW_TPM_NEWS_API_KEY; news is skipped without one)
    #[arg(long, value_name = "KEY")]
    pub news_api_key: Option<String>,

    /// Append one JSONL record per executed step to this file
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct DescriptionArgs {
    /// Free-text description of the program
    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Read the program description from a file
    #[arg(long, value_name = "PATH")]
    pub description_file: Option<PathBuf>,
}

/// Summarize command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print key impact metrics for an exported result")]
pub struct SummarizeArgs {
    /// Result JSON written by `stpm run`
    #[arg(value_name = "PATH")]
    pub report: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Also list per-step outcomes from a run transcript
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
}

/// Config command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the effective pipeline config as JSON")]
pub struct ConfigArgs {
    /// Pipeline config JSON to validate and print
    #[arg(long, value_name = "PATH", conflicts_with = "stub")]
    pub config: Option<PathBuf>,

    /// Print the built-in defaults instead of the effective config
    #[arg(long)]
    pub stub: bool,
}
