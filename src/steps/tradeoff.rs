//! Mitigation trade-offs for each forecasted risk.
use super::{prompt_json, render_template, run_step, StepError, StepKind};
use crate::completion::{CompletionClient, CompletionRequest};
use crate::report::{RiskForecast, ShapeContext, TradeOffPlan};

const TRADEOFF_OPTIMIZE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/tradeoff_optimize.md"
));

/// Propose mitigation options per risk.
///
/// Every entry in the result must name one of `forecast.risks`; anything else
/// is treated as a malformed completion.
pub fn optimize_tradeoffs<C>(client: &C, forecast: &RiskForecast) -> Result<TradeOffPlan, StepError>
where
    C: CompletionClient + ?Sized,
{
    let risks = prompt_json(StepKind::TradeOff, forecast)?;
    let prompt = render_template(TRADEOFF_OPTIMIZE, &[("risks", &risks)]);
    run_step(
        client,
        StepKind::TradeOff,
        CompletionRequest::text(&prompt),
        ShapeContext {
            risks: &forecast.risks,
        },
    )
}
