//! Key impact metrics derived from an exported report.
//!
//! Trade-off fields are free text written by the model, so every number here
//! is best-effort: a field that does not match the expected form ("-4 weeks",
//! "+$20M", "35%") is skipped rather than failing the summary, and a metric
//! with no parseable input is reported as `None`.
use crate::report::{Level, RiskReport};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactMetrics {
    pub risk_count: usize,
    pub impact_counts: BTreeMap<Level, usize>,
    /// Mean forecast probability in percent.
    pub mean_probability: Option<f64>,
    /// Largest schedule pull-in offered by any option, in weeks.
    pub max_delay_reduction_weeks: Option<f64>,
    /// Cheapest option cost, in millions of dollars (negative means savings).
    pub min_cost_impact_musd: Option<f64>,
    /// Largest risk reduction offered by any option, in percent.
    pub max_risk_reduction_pct: Option<f64>,
}

struct Patterns {
    percent: Regex,
    weeks: Regex,
    cost: Regex,
}

impl Patterns {
    fn new() -> Self {
        Self {
            percent: Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?)\s*%").expect("regex for percentages"),
            weeks: Regex::new(r"(?i)([+-])?\s*(\d+(?:\.\d+)?)\s*weeks?\b")
                .expect("regex for week deltas"),
            cost: Regex::new(r"(?i)([+-])?\s*\$\s*(\d+(?:\.\d+)?)\s*([kmb])?")
                .expect("regex for dollar amounts"),
        }
    }

    fn percent(&self, text: &str) -> Option<f64> {
        let caps = self.percent.captures(text)?;
        caps.get(1)?.as_str().parse().ok()
    }

    /// Weeks saved, for negative deltas like "-4 weeks".
    fn delay_reduction(&self, text: &str) -> Option<f64> {
        let caps = self.weeks.captures(text)?;
        if caps.get(1).map(|sign| sign.as_str()) != Some("-") {
            return None;
        }
        caps.get(2)?.as_str().parse().ok()
    }

    /// Signed amount in millions of dollars.
    fn cost_musd(&self, text: &str) -> Option<f64> {
        let caps = self.cost.captures(text)?;
        let amount: f64 = caps.get(2)?.as_str().parse().ok()?;
        let scaled = match caps.get(3).map(|unit| unit.as_str().to_ascii_lowercase()) {
            Some(unit) if unit == "k" => amount / 1_000.0,
            Some(unit) if unit == "b" => amount * 1_000.0,
            Some(_) => amount,
            None => amount / 1_000_000.0,
        };
        match caps.get(1).map(|sign| sign.as_str()) {
            Some("-") => Some(-scaled),
            _ => Some(scaled),
        }
    }
}

fn fold_max(acc: Option<f64>, value: f64) -> Option<f64> {
    Some(acc.map_or(value, |current| current.max(value)))
}

fn fold_min(acc: Option<f64>, value: f64) -> Option<f64> {
    Some(acc.map_or(value, |current| current.min(value)))
}

pub fn compute_metrics(report: &RiskReport) -> ImpactMetrics {
    let patterns = Patterns::new();

    let mut impact_counts: BTreeMap<Level, usize> =
        Level::ALL.iter().map(|level| (*level, 0)).collect();
    let mut probabilities = Vec::new();
    for item in &report.risks {
        *impact_counts.entry(item.impact).or_default() += 1;
        if let Some(value) = patterns.percent(&item.probability) {
            probabilities.push(value);
        }
    }
    let mean_probability = if probabilities.is_empty() {
        None
    } else {
        Some(probabilities.iter().sum::<f64>() / probabilities.len() as f64)
    };

    let mut max_delay_reduction_weeks = None;
    let mut min_cost_impact_musd = None;
    let mut max_risk_reduction_pct = None;
    for option in report.tradeoffs.iter().flat_map(|entry| &entry.options) {
        if let Some(weeks) = patterns.delay_reduction(&option.time_impact) {
            max_delay_reduction_weeks = fold_max(max_delay_reduction_weeks, weeks);
        }
        if let Some(cost) = option
            .cost_impact
            .as_deref()
            .and_then(|text| patterns.cost_musd(text))
        {
            min_cost_impact_musd = fold_min(min_cost_impact_musd, cost);
        }
        if let Some(pct) = patterns.percent(&option.quality_risk_reduction) {
            max_risk_reduction_pct = fold_max(max_risk_reduction_pct, pct);
        }
    }

    ImpactMetrics {
        risk_count: report.risks.len(),
        impact_counts,
        mean_probability,
        max_delay_reduction_weeks,
        min_cost_impact_musd,
        max_risk_reduction_pct,
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

/// Plain-text rendering for the terminal.
pub fn render_metrics(metrics: &ImpactMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Risks: {}", metrics.risk_count);
    for (level, count) in &metrics.impact_counts {
        let _ = writeln!(out, "  {level}: {count}");
    }
    let _ = writeln!(
        out,
        "Mean probability: {}",
        or_na(metrics.mean_probability.map(|pct| format!("{pct:.1}%")))
    );
    let _ = writeln!(
        out,
        "Max delay reduction: {}",
        or_na(
            metrics
                .max_delay_reduction_weeks
                .map(|weeks| format!("up to {weeks} weeks"))
        )
    );
    let _ = writeln!(
        out,
        "Min cost impact: {}",
        or_na(metrics.min_cost_impact_musd.map(|cost| {
            if cost < 0.0 {
                format!("-${}M", -cost)
            } else {
                format!("+${cost}M")
            }
        }))
    );
    let _ = writeln!(
        out,
        "Max risk reduction: {}",
        or_na(metrics.max_risk_reduction_pct.map(|pct| format!("{pct}%")))
    );
    out
}
