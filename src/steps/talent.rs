//! Talent and resourcing risks.
use super::{prompt_json, render_template, run_step, StepError, StepKind};
use crate::completion::{CompletionClient, CompletionRequest};
use crate::report::{RiskForecast, ShapeContext, TalentReport};

const TALENT_RISK: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/talent_risk.md"
));

pub fn simulate_talent_risks<C>(
    client: &C,
    project: &str,
    forecast: &RiskForecast,
) -> Result<TalentReport, StepError>
where
    C: CompletionClient + ?Sized,
{
    let risks = prompt_json(StepKind::Talent, forecast)?;
    let prompt = render_template(TALENT_RISK, &[("project", project), ("risks", &risks)]);
    run_step(
        client,
        StepKind::Talent,
        CompletionRequest::text(&prompt),
        ShapeContext::default(),
    )
}
