//! Structured outputs of the risk pipeline.
//!
//! Every step's completion is deserialized into one of these shapes. Serde
//! typing covers most of the contract; the few cross-field rules (a trade-off
//! must name a forecasted risk, an option must carry an effort or cost impact)
//! live in [`Shape::check`] so that a mismatch is reported as a parse failure
//! instead of being coerced.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary line attached to every completed report.
pub const REPORT_SUMMARY: &str = "Simulation complete for your technical program.";

/// Structural checks run after a completion deserializes.
pub trait Shape {
    /// Return a description of the first structural violation, if any.
    fn check(&self, _ctx: &ShapeContext<'_>) -> Result<(), String> {
        Ok(())
    }
}

/// Upstream data a shape may need to validate references against.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShapeContext<'a> {
    pub risks: &'a [RiskItem],
}

/// Three-level rating used for both risk impact and concern severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::High, Level::Medium, Level::Low];
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// A single forecasted risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskItem {
    pub risk: String,
    /// Percentage string such as `"65%"`.
    pub probability: String,
    pub impact: Level,
    pub explanation: String,
}

/// Forecaster output: `{"risks": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskForecast {
    pub risks: Vec<RiskItem>,
}

impl Shape for RiskForecast {
    fn check(&self, _ctx: &ShapeContext<'_>) -> Result<(), String> {
        if self.risks.is_empty() {
            return Err("forecast has no risks".to_string());
        }
        if let Some(item) = self.risks.iter().find(|item| item.risk.trim().is_empty()) {
            return Err(format!("risk entry has an empty name: {item:?}"));
        }
        Ok(())
    }
}

/// One mitigation option for a risk and what it costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffOption {
    pub option: String,
    /// Engineering-effort impact, used for software/ML programs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort_impact: Option<String>,
    /// Monetary impact, used for infrastructure programs (e.g. `"+$20M"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_impact: Option<String>,
    pub time_impact: String,
    pub quality_risk_reduction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffEntry {
    pub risk: String,
    pub options: Vec<TradeOffOption>,
}

/// Trade-off optimizer output: `{"tradeoffs": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffPlan {
    pub tradeoffs: Vec<TradeOffEntry>,
}

impl Shape for TradeOffPlan {
    fn check(&self, ctx: &ShapeContext<'_>) -> Result<(), String> {
        for entry in &self.tradeoffs {
            let known = ctx
                .risks
                .iter()
                .any(|item| same_risk_name(&item.risk, &entry.risk));
            if !known {
                return Err(format!(
                    "trade-off references unknown risk {:?}",
                    entry.risk
                ));
            }
            for option in &entry.options {
                if option.effort_impact.is_none() && option.cost_impact.is_none() {
                    return Err(format!(
                        "option {:?} for risk {:?} has neither effort_impact nor cost_impact",
                        option.option, entry.risk
                    ));
                }
            }
        }
        Ok(())
    }
}

fn same_risk_name(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub greeting: String,
    pub body: String,
    pub closing: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideOutline {
    pub title: String,
    pub bullets: Vec<String>,
}

/// Stakeholder communication artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommsArtifact {
    pub email_draft: EmailDraft,
    pub talking_points: Vec<String>,
    pub slide_outline: SlideOutline,
}

impl Shape for CommsArtifact {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concern {
    pub concern: String,
    pub severity: Level,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mitigation {
    pub mitigation: String,
    pub benefit: String,
}

/// Ethics and sustainability review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthicsReport {
    pub concerns: Vec<Concern>,
    pub mitigations: Vec<Mitigation>,
}

impl Shape for EthicsReport {}

/// Talent and resourcing risks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentReport {
    pub talent_risks: Vec<RiskItem>,
    pub mitigations: Vec<Mitigation>,
}

impl Shape for TalentReport {}

/// The assembled output of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    pub summary: String,
    pub risks: Vec<RiskItem>,
    pub tradeoffs: Vec<TradeOffEntry>,
    pub comms: CommsArtifact,
    pub ethics: EthicsReport,
    pub talent: TalentReport,
}

impl RiskReport {
    /// Assemble a report from the five step outputs.
    pub fn assemble(
        forecast: RiskForecast,
        ethics: EthicsReport,
        plan: TradeOffPlan,
        comms: CommsArtifact,
        talent: TalentReport,
    ) -> Self {
        Self {
            summary: REPORT_SUMMARY.to_string(),
            risks: forecast.risks,
            tradeoffs: plan.tradeoffs,
            comms,
            ethics,
            talent,
        }
    }
}

/// Failure categories surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A caller-supplied precondition (the credential) is missing.
    Precondition,
    /// The program description is unusable.
    InvalidInput,
    /// The attachment was too large, of an unsupported type, or unreadable.
    InvalidAttachment,
    /// A completion did not match the step's JSON shape.
    Parse,
    /// Calling the completion backend failed.
    Execution,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precondition => write!(f, "precondition"),
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::InvalidAttachment => write!(f, "invalid_attachment"),
            Self::Parse => write!(f, "parse"),
            Self::Execution => write!(f, "execution"),
        }
    }
}

/// Terminal failure of a pipeline run.
///
/// Serializes as `{"error": ..., "raw": ...}`; `raw` is present only for
/// parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    #[serde(skip, default = "default_error_kind")]
    pub kind: ErrorKind,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

fn default_error_kind() -> ErrorKind {
    ErrorKind::Execution
}

impl PipelineError {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
            raw: None,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.kind)
    }
}

/// Either a full report or the single error that halted the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineResult {
    Complete(Box<RiskReport>),
    Failed(PipelineError),
}

impl PipelineResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn report(&self) -> Option<&RiskReport> {
        match self {
            Self::Complete(report) => Some(report),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Complete(_) => None,
            Self::Failed(error) => Some(error),
        }
    }
}

impl From<PipelineError> for PipelineResult {
    fn from(error: PipelineError) -> Self {
        Self::Failed(error)
    }
}

impl From<RiskReport> for PipelineResult {
    fn from(report: RiskReport) -> Self {
        Self::Complete(Box::new(report))
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
