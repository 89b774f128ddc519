use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod attachment;
mod cli;
mod completion;
mod config;
mod metrics;
mod news;
mod pipeline;
mod report;
mod steps;
#[cfg(test)]
mod testing;
mod transcript;
mod util;

use attachment::{media_type_for_path, AttachmentInput};
use cli::{Command, ConfigArgs, RootArgs, RunArgs, SummarizeArgs};
use completion::{Credential, GeminiFactory};
use config::{config_stub, resolve_config, API_KEY_ENV, NEWS_API_KEY_ENV};
use news::{NewsApiClient, NewsQuery};
use pipeline::{Pipeline, PipelineRequest};
use report::PipelineResult;
use transcript::{StepRecord, Transcript};

/// Exit code when the pipeline returned an error document.
const EXIT_PIPELINE_ERROR: u8 = 1;
/// Exit code for CLI, config, or I/O failures.
const EXIT_USAGE_ERROR: u8 = 2;

const STDIN_ATTACHMENT: &str = "-";
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let outcome = match args.command {
        Command::Run(args) => cmd_run(args),
        Command::Summarize(args) => cmd_summarize(args),
        Command::Config(args) => cmd_config(args),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_USAGE_ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let config = resolve_config(args.config.as_deref())?;
    let description = match (&args.description.description, &args.description.description_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("read description {}", path.display()))?,
        (None, None) => return Err(anyhow!("--description or --description-file is required")),
    };

    let attachment = match args.attachment.as_deref() {
        Some(path) => Some(attachment_input(path, args.media_type.clone())?),
        None => None,
    };

    let credential = Credential::new(
        args.api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .as_deref(),
    );
    let news_key = args
        .news_api_key
        .or_else(|| std::env::var(NEWS_API_KEY_ENV).ok());

    let mut pipeline = Pipeline::new(
        GeminiFactory::from_config(&config),
        NewsApiClient::new(&config, news_key),
        NewsQuery::from_config(&config),
    );
    if let Some(path) = &args.transcript {
        let transcript = Transcript::new(path);
        tracing::info!(path = %transcript.path().display(), "recording transcript");
        pipeline = pipeline.with_transcript(transcript);
    }

    let result = pipeline.run(PipelineRequest {
        description,
        attachment,
        credential,
    });

    match &args.out {
        Some(path) => {
            util::write_json(path, &result)?;
            eprintln!("Wrote result to {}", path.display());
        }
        None => {
            let json = util::to_pretty_json(&result)?;
            std::io::stdout()
                .write_all(json.as_bytes())
                .context("write result to stdout")?;
        }
    }

    if result.is_complete() {
        return Ok(ExitCode::SUCCESS);
    }
    if let (Some(err), Some(_)) = (result.error(), &args.out) {
        eprintln!("Pipeline failed: {}", err.error);
    }
    Ok(ExitCode::from(EXIT_PIPELINE_ERROR))
}

fn attachment_input(path: &Path, media_type: Option<String>) -> Result<AttachmentInput> {
    if path.as_os_str() == STDIN_ATTACHMENT {
        let media_type =
            media_type.ok_or_else(|| anyhow!("--media-type is required with --attachment -"))?;
        return Ok(AttachmentInput::from_stdin(media_type));
    }
    let media_type = media_type
        .or_else(|| media_type_for_path(path).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string());
    Ok(AttachmentInput::from_path(path, media_type))
}

fn cmd_summarize(args: SummarizeArgs) -> Result<ExitCode> {
    let result: PipelineResult = util::read_json(&args.report)?;
    let Some(report) = result.report() else {
        let message = result
            .error()
            .map(|err| err.error.clone())
            .unwrap_or_default();
        eprintln!("Result is an error document: {message}");
        return Ok(ExitCode::from(EXIT_PIPELINE_ERROR));
    };

    let metrics = metrics::compute_metrics(report);
    let mut text = if args.json {
        util::to_pretty_json(&metrics)?
    } else {
        format!("{}\n{}", report.summary, metrics::render_metrics(&metrics))
    };
    if let Some(path) = &args.transcript {
        let records = Transcript::new(path).load()?;
        if args.json {
            text = util::to_pretty_json(&serde_json::json!({
                "metrics": metrics,
                "steps": records,
            }))?;
        } else {
            text.push_str("Steps:\n");
            for record in &records {
                text.push_str(&format_step(record));
            }
        }
    }
    std::io::stdout()
        .write_all(text.as_bytes())
        .context("write summary to stdout")?;
    Ok(ExitCode::SUCCESS)
}

fn format_step(record: &StepRecord) -> String {
    let mut line = format!(
        "  {}: {:?} in {}ms",
        record.step, record.outcome, record.duration_ms
    );
    if let Some(error) = &record.error {
        line.push_str(&format!(" ({error})"));
    }
    line.push('\n');
    line
}

fn cmd_config(args: ConfigArgs) -> Result<ExitCode> {
    let json = if args.stub {
        config_stub()?
    } else {
        util::to_pretty_json(&resolve_config(args.config.as_deref())?)?
    };
    std::io::stdout()
        .write_all(json.as_bytes())
        .context("write config to stdout")?;
    Ok(ExitCode::SUCCESS)
}
