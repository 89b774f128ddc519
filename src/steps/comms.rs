//! Stakeholder communication drafts.
use super::{prompt_json, render_template, run_step, StepError, StepKind};
use crate::completion::{CompletionClient, CompletionRequest};
use crate::report::{CommsArtifact, RiskForecast, ShapeContext, TradeOffPlan};

const COMMS_GENERATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/comms_generate.md"
));

pub fn generate_comms<C>(
    client: &C,
    forecast: &RiskForecast,
    plan: &TradeOffPlan,
) -> Result<CommsArtifact, StepError>
where
    C: CompletionClient + ?Sized,
{
    let risks = prompt_json(StepKind::Comms, forecast)?;
    let tradeoffs = prompt_json(StepKind::Comms, plan)?;
    let prompt = render_template(
        COMMS_GENERATE,
        &[("risks", &risks), ("tradeoffs", &tradeoffs)],
    );
    run_step(
        client,
        StepKind::Comms,
        CompletionRequest::text(&prompt),
        ShapeContext::default(),
    )
}
