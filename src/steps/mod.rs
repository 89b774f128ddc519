//! The five prompt-calling steps and the machinery they share.
//!
//! Every step follows the same contract:
//!
//! 1. Render a fixed prompt template with its inputs serialized as JSON.
//! 2. Submit it through a [`CompletionClient`].
//! 3. Parse the completion into the step's output shape.
//!
//! Failures are typed. A completion that does not match the shape is a
//! [`ErrorKind::Parse`] error and keeps the raw text for diagnosis; a failed
//! backend call is an [`ErrorKind::Execution`] error with only the step's
//! fixed message, since nothing useful came back.
use crate::completion::{CompletionClient, CompletionRequest};
use crate::report::{ErrorKind, PipelineError, Shape, ShapeContext};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

mod comms;
mod ethics;
mod forecast;
mod talent;
mod tradeoff;

pub use comms::generate_comms;
pub use ethics::check_ethics;
pub use forecast::{forecast_risks, ForecastInput};
pub use talent::simulate_talent_risks;
pub use tradeoff::optimize_tradeoffs;

/// Identifies a step in messages, logs, and transcripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Forecast,
    Ethics,
    TradeOff,
    Comms,
    Talent,
}

impl StepKind {
    /// Message used when the completion does not match the step's shape.
    pub fn parse_message(self) -> &'static str {
        match self {
            Self::Forecast => "Failed to parse risks",
            Self::Ethics => "Failed to parse ethics report",
            Self::TradeOff => "Failed to parse trade-offs",
            Self::Comms => "Failed to parse comms",
            Self::Talent => "Failed to parse talent risks",
        }
    }

    /// Message used when calling the backend fails.
    pub fn execution_message(self) -> &'static str {
        match self {
            Self::Forecast => "Failed to forecast risks",
            Self::Ethics => "Failed to check ethics",
            Self::TradeOff => "Failed to optimize trade-offs",
            Self::Comms => "Failed to generate comms",
            Self::Talent => "Failed to simulate talent risks",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forecast => write!(f, "forecast"),
            Self::Ethics => write!(f, "ethics"),
            Self::TradeOff => write!(f, "trade_off"),
            Self::Comms => write!(f, "comms"),
            Self::Talent => write!(f, "talent"),
        }
    }
}

/// A failed step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step}: {message}")]
pub struct StepError {
    pub step: StepKind,
    pub kind: ErrorKind,
    pub message: String,
    /// Unparsed completion text; only set for parse failures.
    pub raw: Option<String>,
}

impl StepError {
    pub fn parse(step: StepKind, raw: String) -> Self {
        Self {
            step,
            kind: ErrorKind::Parse,
            message: step.parse_message().to_string(),
            raw: Some(raw),
        }
    }

    pub fn execution(step: StepKind) -> Self {
        Self {
            step,
            kind: ErrorKind::Execution,
            message: step.execution_message().to_string(),
            raw: None,
        }
    }
}

impl From<StepError> for PipelineError {
    fn from(err: StepError) -> Self {
        Self {
            kind: err.kind,
            error: err.message,
            raw: err.raw,
        }
    }
}

/// Submit a rendered prompt and parse the completion into `T`.
pub(crate) fn run_step<C, T>(
    client: &C,
    step: StepKind,
    request: CompletionRequest<'_>,
    ctx: ShapeContext<'_>,
) -> Result<T, StepError>
where
    C: CompletionClient + ?Sized,
    T: DeserializeOwned + Shape,
{
    let start = Instant::now();
    tracing::info!(%step, prompt_bytes = request.prompt.len(), "step started");
    let raw = match client.complete(&request) {
        Ok(raw) => raw,
        Err(err) => {
            let error = format!("{err:#}");
            tracing::error!(%step, %error, "completion call failed");
            return Err(StepError::execution(step));
        }
    };
    let parsed = parse_completion(step, raw, ctx)?;
    tracing::info!(
        %step,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "step complete"
    );
    Ok(parsed)
}

/// Parse completion text into a step shape, keeping the text on failure.
pub(crate) fn parse_completion<T>(
    step: StepKind,
    raw: String,
    ctx: ShapeContext<'_>,
) -> Result<T, StepError>
where
    T: DeserializeOwned + Shape,
{
    let parsed: T = match serde_json::from_str(strip_code_fence(&raw)) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(
                %step,
                line = err.line(),
                column = err.column(),
                error = %err,
                "completion is not valid JSON for this step"
            );
            return Err(StepError::parse(step, raw));
        }
    };
    if let Err(violation) = parsed.check(&ctx) {
        tracing::error!(%step, %violation, "completion violates step shape");
        return Err(StepError::parse(step, raw));
    }
    Ok(parsed)
}

/// Strip one Markdown code fence wrapping the whole completion.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    // Skip a language tag such as `json` on the opening fence line.
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

/// Serialize a step input for embedding in a prompt.
pub(crate) fn prompt_json<T: Serialize>(step: StepKind, value: &T) -> Result<String, StepError> {
    serde_json::to_string(value).map_err(|err| {
        tracing::error!(%step, error = %err, "serialize prompt input");
        StepError::execution(step)
    })
}

/// Substitute `{key}` placeholders found in the template.
///
/// Substitution is single-pass, so placeholder-like text inside substituted
/// values is left alone.
pub(crate) fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let matched = vars.iter().find(|(key, _)| {
            tail.strip_prefix(*key)
                .is_some_and(|after| after.starts_with('}'))
        });
        match matched {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
