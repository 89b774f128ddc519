//! Pipeline orchestration.
//!
//! The run is a fixed sequence of stages:
//!
//! ```text
//! Forecast -> Ethics -> TradeOff -> Comms -> Talent -> Done
//! ```
//!
//! Each stage consumes what earlier stages produced and either advances or
//! halts the run. The first failure becomes the terminal result; nothing
//! after it executes. Preconditions (credential, description) are checked
//! before a client is even built, so a rejected request makes no external
//! calls at all.
use crate::attachment::AttachmentInput;
use crate::completion::{ClientFactory, CompletionClient, Credential};
use crate::news::{NewsQuery, NewsSource};
use crate::report::{ErrorKind, PipelineError, PipelineResult, RiskReport};
use crate::steps::{
    check_ethics, forecast_risks, generate_comms, optimize_tradeoffs, simulate_talent_risks,
    ForecastInput, StepError, StepKind,
};
use crate::transcript::{StepRecord, Transcript};
use std::time::Instant;

pub const MISSING_CREDENTIAL: &str =
    "Missing API key: supply a completion API key to run the pipeline.";
pub const EMPTY_DESCRIPTION: &str =
    "Program description is empty: describe the program to analyze.";

/// Everything a caller supplies for one run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub description: String,
    pub attachment: Option<AttachmentInput>,
    pub credential: Option<Credential>,
}

/// Stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Step(StepKind),
    Done,
}

impl Stage {
    pub const FIRST: Stage = Stage::Step(StepKind::Forecast);

    /// The stage that follows a successful one.
    pub fn next(self) -> Stage {
        match self {
            Stage::Step(StepKind::Forecast) => Stage::Step(StepKind::Ethics),
            Stage::Step(StepKind::Ethics) => Stage::Step(StepKind::TradeOff),
            Stage::Step(StepKind::TradeOff) => Stage::Step(StepKind::Comms),
            Stage::Step(StepKind::Comms) => Stage::Step(StepKind::Talent),
            Stage::Step(StepKind::Talent) | Stage::Done => Stage::Done,
        }
    }
}

/// Runs the five steps against a completion backend and a news source.
pub struct Pipeline<F, N> {
    factory: F,
    news: N,
    query: NewsQuery,
    transcript: Option<Transcript>,
}

impl<F, N> Pipeline<F, N>
where
    F: ClientFactory,
    N: NewsSource,
{
    pub fn new(factory: F, news: N, query: NewsQuery) -> Self {
        Self {
            factory,
            news,
            query,
            transcript: None,
        }
    }

    /// Append one JSONL record per executed step to `transcript`.
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Run the pipeline to a terminal result. Never panics or returns `Err`.
    pub fn run(&self, request: PipelineRequest) -> PipelineResult {
        let PipelineRequest {
            description,
            attachment,
            credential,
        } = request;

        let Some(credential) = credential else {
            tracing::error!("no completion credential supplied");
            return PipelineError::new(ErrorKind::Precondition, MISSING_CREDENTIAL).into();
        };
        if description.trim().is_empty() {
            tracing::error!("empty program description");
            return PipelineError::new(ErrorKind::InvalidInput, EMPTY_DESCRIPTION).into();
        }

        let client = self.factory.connect(&credential);
        let start = Instant::now();
        match self.execute(&client, &description, attachment) {
            Ok(report) => {
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    risks = report.risks.len(),
                    "pipeline complete"
                );
                report.into()
            }
            Err(err) => {
                tracing::error!(step = %err.step, kind = %err.kind, "pipeline halted");
                PipelineError::from(err).into()
            }
        }
    }

    fn execute<C>(
        &self,
        client: &C,
        project: &str,
        attachment: Option<AttachmentInput>,
    ) -> Result<RiskReport, StepError>
    where
        C: CompletionClient,
    {
        let mut stage = Stage::FIRST;

        let input = ForecastInput {
            project,
            attachment,
        };
        let forecast = self.advance(&mut stage, StepKind::Forecast, || {
            forecast_risks(client, &self.news, &self.query, input)
        })?;
        let ethics = self.advance(&mut stage, StepKind::Ethics, || {
            check_ethics(client, project, &forecast)
        })?;
        let plan = self.advance(&mut stage, StepKind::TradeOff, || {
            optimize_tradeoffs(client, &forecast)
        })?;
        let comms = self.advance(&mut stage, StepKind::Comms, || {
            generate_comms(client, &forecast, &plan)
        })?;
        let talent = self.advance(&mut stage, StepKind::Talent, || {
            simulate_talent_risks(client, project, &forecast)
        })?;
        debug_assert_eq!(stage, Stage::Done);

        Ok(RiskReport::assemble(forecast, ethics, plan, comms, talent))
    }

    /// Run one stage, record it, and move `stage` forward on success.
    fn advance<T>(
        &self,
        stage: &mut Stage,
        step: StepKind,
        run: impl FnOnce() -> Result<T, StepError>,
    ) -> Result<T, StepError> {
        debug_assert_eq!(*stage, Stage::Step(step));
        let start = Instant::now();
        let result = run();
        self.record(step, start, result.as_ref().err());
        if result.is_ok() {
            *stage = stage.next();
        }
        result
    }

    fn record(&self, step: StepKind, start: Instant, error: Option<&StepError>) {
        let Some(transcript) = &self.transcript else {
            return;
        };
        let record = match error {
            None => StepRecord::succeeded(step, start.elapsed()),
            Some(err) => StepRecord::failed(step, start.elapsed(), err),
        };
        if let Err(err) = transcript.append(&record) {
            let error = format!("{err:#}");
            tracing::warn!(%error, "could not write transcript entry");
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
