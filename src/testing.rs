//! Scripted backends and canned completions for unit tests.
use crate::completion::{ClientFactory, CompletionClient, CompletionRequest, Credential};
use crate::news::{Article, NewsSource};
use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub const TPU_PROGRAM: &str = "Scaling a new 1GW TPU cluster in Texas, 9-month deadline, $500M budget";

pub enum Reply {
    Text(String),
    Fail(String),
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[derive(Default)]
struct ScriptState {
    replies: VecDeque<Reply>,
    prompts: Vec<String>,
    attachments: Vec<Option<String>>,
    connects: usize,
}

/// Shared record of scripted replies and the calls that consumed them.
#[derive(Clone, Default)]
pub struct Script {
    state: Rc<RefCell<ScriptState>>,
}

impl Script {
    pub fn new(replies: Vec<Reply>) -> Self {
        let script = Self::default();
        script.state.borrow_mut().replies = replies.into();
        script
    }

    pub fn calls(&self) -> usize {
        self.state.borrow().prompts.len()
    }

    pub fn connects(&self) -> usize {
        self.state.borrow().connects
    }

    pub fn prompt(&self, index: usize) -> String {
        self.state.borrow().prompts[index].clone()
    }

    pub fn attachment(&self, index: usize) -> Option<String> {
        self.state.borrow().attachments[index].clone()
    }

    pub fn client(&self) -> ScriptedClient {
        ScriptedClient {
            script: self.clone(),
        }
    }

    pub fn factory(&self) -> ScriptedFactory {
        ScriptedFactory {
            script: self.clone(),
        }
    }
}

pub struct ScriptedClient {
    script: Script,
}

impl CompletionClient for ScriptedClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let mut state = self.script.state.borrow_mut();
        state.prompts.push(request.prompt.to_string());
        state
            .attachments
            .push(request.attachment.map(|attachment| attachment.name().to_string()));
        match state.replies.pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}

pub struct ScriptedFactory {
    script: Script,
}

impl ClientFactory for ScriptedFactory {
    type Client = ScriptedClient;

    fn connect(&self, _credential: &Credential) -> ScriptedClient {
        self.script.state.borrow_mut().connects += 1;
        self.script.client()
    }
}

/// News source that either fails or returns a fixed list, counting calls.
#[derive(Default)]
pub struct StubNews {
    pub fail: bool,
    pub articles: Vec<Article>,
    calls: Cell<usize>,
}

impl StubNews {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_headline(title: &str) -> Self {
        Self {
            articles: vec![Article {
                title: title.to_string(),
                description: "ERCOT warns of summer capacity shortfall".to_string(),
                source: "Bloomberg".to_string(),
                published_at: "2026-01-10T08:00:00Z".to_string(),
            }],
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl NewsSource for StubNews {
    fn search(&self, _query: &str, _limit: u32) -> Result<Vec<Article>> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.articles.clone())
    }
}

pub const FORECAST_JSON: &str = r#"{"risks": [
  {"risk": "Grid interconnect delay", "probability": "70%", "impact": "High", "explanation": "ERCOT queue exceeds the 9-month window."},
  {"risk": "Fiber vendor slip", "probability": "40%", "impact": "Medium", "explanation": "Single-source long-haul fiber."},
  {"risk": "Cooling supply chain", "probability": "25%", "impact": "Low", "explanation": "Chiller lead times are stable."}
]}"#;

pub const ETHICS_JSON: &str = r#"{
  "concerns": [{"concern": "Carbon footprint", "severity": "High", "explanation": "Gas peakers bridge the grid gap."}],
  "mitigations": [{"mitigation": "Sign a solar PPA", "benefit": "Offsets 60% of load"}]
}"#;

pub const TRADEOFFS_JSON: &str = r#"{"tradeoffs": [
  {"risk": "Grid interconnect delay", "options": [
    {"option": "Temporary gas turbines", "cost_impact": "+$20M", "time_impact": "-6 weeks", "quality_risk_reduction": "50%"},
    {"option": "Phase the power-on", "cost_impact": "+$5M", "time_impact": "-2 weeks", "quality_risk_reduction": "20%"}
  ]},
  {"risk": "Fiber vendor slip", "options": [
    {"option": "Dual-source fiber", "effort_impact": "2 procurement FTEs", "time_impact": "+1 week", "quality_risk_reduction": "35%"}
  ]}
]}"#;

pub const COMMS_JSON: &str = r#"{
  "email_draft": {"subject": "Texas TPU cluster: risk review", "greeting": "Hi Engineering and Finance leads,", "body": "Power interconnect is the critical path.", "closing": "Best,\nProgram TPM"},
  "talking_points": ["Power is the critical path", "Fiber is dual-sourced", "Budget holds at $500M"],
  "slide_outline": {"title": "Texas cluster risks", "bullets": ["Grid", "Fiber", "Cooling"]}
}"#;

pub const TALENT_JSON: &str = r#"{
  "talent_risks": [{"risk": "Electrical engineer shortage", "probability": "55%", "impact": "High", "explanation": "Regional competition for HV engineers."}],
  "mitigations": [{"mitigation": "Retention bonuses", "benefit": "Keeps the commissioning team intact"}]
}"#;

/// Five well-formed completions in pipeline order.
pub fn happy_path_replies() -> Vec<Reply> {
    vec![
        Reply::text(FORECAST_JSON),
        Reply::text(ETHICS_JSON),
        Reply::text(TRADEOFFS_JSON),
        Reply::text(COMMS_JSON),
        Reply::text(TALENT_JSON),
    ]
}
