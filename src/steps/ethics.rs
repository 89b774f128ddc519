//! Ethics and sustainability review of the forecast.
use super::{prompt_json, render_template, run_step, StepError, StepKind};
use crate::completion::{CompletionClient, CompletionRequest};
use crate::report::{EthicsReport, RiskForecast, ShapeContext};

const ETHICS_CHECK: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/ethics_check.md"
));

pub fn check_ethics<C>(
    client: &C,
    project: &str,
    forecast: &RiskForecast,
) -> Result<EthicsReport, StepError>
where
    C: CompletionClient + ?Sized,
{
    let risks = prompt_json(StepKind::Ethics, forecast)?;
    let prompt = render_template(ETHICS_CHECK, &[("project", project), ("risks", &risks)]);
    run_step(
        client,
        StepKind::Ethics,
        CompletionRequest::text(&prompt),
        ShapeContext::default(),
    )
}
