use super::*;

fn risk(name: &str) -> RiskItem {
    RiskItem {
        risk: name.to_string(),
        probability: "60%".to_string(),
        impact: Level::High,
        explanation: "grid interconnect queue is 18 months".to_string(),
    }
}

fn option(effort: Option<&str>, cost: Option<&str>) -> TradeOffOption {
    TradeOffOption {
        option: "Lease temporary gas turbines".to_string(),
        effort_impact: effort.map(str::to_string),
        cost_impact: cost.map(str::to_string),
        time_impact: "-4 weeks".to_string(),
        quality_risk_reduction: "40%".to_string(),
    }
}

fn sample_report() -> RiskReport {
    RiskReport::assemble(
        RiskForecast {
            risks: vec![risk("Power shortage")],
        },
        EthicsReport {
            concerns: vec![Concern {
                concern: "Water usage".to_string(),
                severity: Level::Medium,
                explanation: "evaporative cooling in a drought region".to_string(),
            }],
            mitigations: vec![Mitigation {
                mitigation: "Closed-loop cooling".to_string(),
                benefit: "cuts water draw".to_string(),
            }],
        },
        TradeOffPlan {
            tradeoffs: vec![TradeOffEntry {
                risk: "Power shortage".to_string(),
                options: vec![option(None, Some("+$20M"))],
            }],
        },
        CommsArtifact {
            email_draft: EmailDraft {
                subject: "Texas cluster risk review".to_string(),
                greeting: "Hi all,".to_string(),
                body: "Power is the critical path.".to_string(),
                closing: "Best,\nTPM".to_string(),
            },
            talking_points: vec!["Power is the critical path".to_string()],
            slide_outline: SlideOutline {
                title: "Top risks".to_string(),
                bullets: vec!["Power".to_string()],
            },
        },
        TalentReport {
            talent_risks: vec![risk("Electrical engineer churn")],
            mitigations: Vec::new(),
        },
    )
}

#[test]
fn tradeoff_check_accepts_case_insensitive_risk_reference() {
    let risks = vec![risk("Power shortage")];
    let plan = TradeOffPlan {
        tradeoffs: vec![TradeOffEntry {
            risk: "  power SHORTAGE ".to_string(),
            options: vec![option(Some("2 engineers"), None)],
        }],
    };
    assert!(plan.check(&ShapeContext { risks: &risks }).is_ok());
}

#[test]
fn tradeoff_check_rejects_unknown_risk() {
    let risks = vec![risk("Power shortage")];
    let plan = TradeOffPlan {
        tradeoffs: vec![TradeOffEntry {
            risk: "Fiber delay".to_string(),
            options: vec![option(Some("2 engineers"), None)],
        }],
    };
    let err = plan
        .check(&ShapeContext { risks: &risks })
        .expect_err("unknown risk should fail");
    assert!(err.contains("Fiber delay"), "{err}");
}

#[test]
fn tradeoff_check_requires_effort_or_cost() {
    let risks = vec![risk("Power shortage")];
    let plan = TradeOffPlan {
        tradeoffs: vec![TradeOffEntry {
            risk: "Power shortage".to_string(),
            options: vec![option(None, None)],
        }],
    };
    let err = plan
        .check(&ShapeContext { risks: &risks })
        .expect_err("option without impact should fail");
    assert!(err.contains("neither effort_impact nor cost_impact"));
}

#[test]
fn forecast_rejects_unknown_impact_level() {
    let value = serde_json::json!({
        "risks": [{
            "risk": "Power shortage",
            "probability": "60%",
            "impact": "Severe",
            "explanation": "..."
        }]
    });
    assert!(serde_json::from_value::<RiskForecast>(value).is_err());
}

#[test]
fn assembled_report_keeps_every_step_output() {
    let report = sample_report();
    assert_eq!(report.summary, REPORT_SUMMARY);
    assert_eq!(report.risks[0].risk, "Power shortage");
    assert_eq!(report.tradeoffs[0].options[0].cost_impact.as_deref(), Some("+$20M"));
    assert_eq!(report.comms.email_draft.subject, "Texas cluster risk review");
    assert_eq!(report.ethics.concerns[0].severity, Level::Medium);
    assert_eq!(report.talent.talent_risks[0].risk, "Electrical engineer churn");

    let again = sample_report();
    assert_eq!(report, again);
}

#[test]
fn complete_result_serializes_report_keys_at_top_level() {
    let result = PipelineResult::from(sample_report());
    let value = serde_json::to_value(&result).expect("serialize result");
    for key in ["summary", "risks", "tradeoffs", "comms", "ethics", "talent"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert!(value.get("error").is_none());
    assert!(value["tradeoffs"][0]["options"][0].get("effort_impact").is_none());
}

#[test]
fn failed_result_serializes_error_and_optional_raw() {
    let mut error = PipelineError::new(ErrorKind::Parse, "Failed to parse trade-offs");
    error.raw = Some("not json".to_string());
    let value = serde_json::to_value(PipelineResult::from(error)).expect("serialize error");
    assert_eq!(
        value,
        serde_json::json!({"error": "Failed to parse trade-offs", "raw": "not json"})
    );

    let bare = PipelineError::new(ErrorKind::Execution, "Failed to generate comms");
    let value = serde_json::to_value(PipelineResult::from(bare)).expect("serialize error");
    assert_eq!(value, serde_json::json!({"error": "Failed to generate comms"}));
}

#[test]
fn exported_documents_deserialize_into_the_right_variant() {
    let text = serde_json::to_string(&PipelineResult::from(sample_report())).expect("serialize");
    let parsed: PipelineResult = serde_json::from_str(&text).expect("parse report");
    assert!(parsed.is_complete());
    assert_eq!(parsed.report(), Some(&sample_report()));

    let parsed: PipelineResult =
        serde_json::from_str(r#"{"error":"Failed to check ethics"}"#).expect("parse error");
    assert_eq!(
        parsed.error().map(|err| err.error.as_str()),
        Some("Failed to check ethics")
    );
}

#[test]
fn forecast_check_rejects_empty_risk_list() {
    let forecast = RiskForecast { risks: Vec::new() };
    let err = forecast
        .check(&ShapeContext::default())
        .expect_err("empty forecast should fail");
    assert!(err.contains("no risks"), "{err}");
    assert!(RiskForecast {
        risks: vec![risk("Power shortage")]
    }
    .check(&ShapeContext::default())
    .is_ok());
}
