//! Risk forecaster: the first step and the only one that sees news and the
//! attachment.
use super::{render_template, run_step, StepError, StepKind};
use crate::attachment::{validate_attachment, AttachmentInput};
use crate::completion::{CompletionClient, CompletionRequest};
use crate::news::{lookup_news, news_context, NewsQuery, NewsSource};
use crate::report::{ErrorKind, RiskForecast, ShapeContext};

const RISK_FORECAST: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/risk_forecast.md"
));

/// Inputs to the forecaster.
#[derive(Debug, Clone)]
pub struct ForecastInput<'a> {
    pub project: &'a str,
    pub attachment: Option<AttachmentInput>,
}

/// Forecast the program's top risks.
///
/// The attachment is validated before anything else so a bad file never costs
/// a news or completion call.
pub fn forecast_risks<C, N>(
    client: &C,
    news: &N,
    query: &NewsQuery,
    input: ForecastInput<'_>,
) -> Result<RiskForecast, StepError>
where
    C: CompletionClient + ?Sized,
    N: NewsSource + ?Sized,
{
    let attachment = match input.attachment {
        Some(raw) => match validate_attachment(raw) {
            Ok(attachment) => {
                tracing::info!(
                    name = attachment.name(),
                    media_type = attachment.media_type(),
                    bytes = attachment.bytes().len(),
                    "attachment accepted"
                );
                Some(attachment)
            }
            Err(rejection) => {
                tracing::error!(%rejection, "attachment rejected");
                return Err(StepError {
                    step: StepKind::Forecast,
                    kind: ErrorKind::InvalidAttachment,
                    message: rejection.to_string(),
                    raw: None,
                });
            }
        },
        None => None,
    };

    let articles = lookup_news(news, query);
    let prompt = render_template(
        RISK_FORECAST,
        &[("project", input.project), ("news", &news_context(&articles))],
    );
    let request = CompletionRequest {
        prompt: &prompt,
        attachment: attachment.as_ref(),
    };
    let forecast: RiskForecast =
        run_step(client, StepKind::Forecast, request, ShapeContext::default())?;
    if !(3..=5).contains(&forecast.risks.len()) {
        tracing::warn!(
            count = forecast.risks.len(),
            "forecast returned an unusual number of risks"
        );
    }
    Ok(forecast)
}
