//! Completion backend boundary.
//!
//! Steps only see [`CompletionClient`]: submit a prompt (plus an optional
//! attachment) and get text back. A [`ClientFactory`] builds a fresh client
//! from the caller's credential for each pipeline run, so no backend state or
//! key outlives the invocation that supplied it.
//!
//! The production backend is Gemini's `generateContent` endpoint in JSON
//! response mode, called synchronously through `ureq`.
use crate::attachment::Attachment;
use crate::config::PipelineConfig;
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Caller-supplied API key for the completion backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for missing or blank keys.
    pub fn new(raw: Option<&str>) -> Option<Self> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub attachment: Option<&'a Attachment>,
}

impl<'a> CompletionRequest<'a> {
    pub fn text(prompt: &'a str) -> Self {
        Self {
            prompt,
            attachment: None,
        }
    }
}

/// Submit a prompt and receive the raw completion text.
pub trait CompletionClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

/// Builds a completion client scoped to one credential.
pub trait ClientFactory {
    type Client: CompletionClient;

    fn connect(&self, credential: &Credential) -> Self::Client;
}

/// Connection settings shared by every Gemini client the factory builds.
#[derive(Debug, Clone)]
pub struct GeminiFactory {
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl GeminiFactory {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            endpoint: config.completion_endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.completion_timeout_secs),
        }
    }
}

impl ClientFactory for GeminiFactory {
    type Client = GeminiClient;

    fn connect(&self, credential: &Credential) -> GeminiClient {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .into();
        GeminiClient {
            agent,
            url: format!("{}/models/{}:generateContent", self.endpoint, self.model),
            credential: credential.clone(),
        }
    }
}

/// Gemini `generateContent` client bound to a single credential.
pub struct GeminiClient {
    agent: ureq::Agent,
    url: String,
    credential: Credential,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Serialize)]
struct GeminiBlob {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn build_request(request: &CompletionRequest<'_>) -> GeminiRequest {
    let mut parts = vec![GeminiPart::Text {
        text: request.prompt.to_string(),
    }];
    if let Some(attachment) = request.attachment {
        parts.push(GeminiPart::Inline {
            inline_data: GeminiBlob {
                mime_type: attachment.media_type().to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(attachment.bytes()),
            },
        });
    }
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user",
            parts,
        }],
        generation_config: GeminiGenerationConfig {
            response_mime_type: "application/json",
        },
    }
}

fn extract_text(response: GeminiResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(anyhow!("Gemini API error: {}", error.message));
    }
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .ok_or_else(|| anyhow!("no candidates in Gemini response"))?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    if text.is_empty() {
        return Err(anyhow!("Gemini response has no text parts"));
    }
    Ok(text)
}

impl CompletionClient for GeminiClient {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = build_request(request);
        let start = Instant::now();
        let mut response = self
            .agent
            .post(&self.url)
            .header("x-goog-api-key", self.credential.expose())
            .send_json(&body)
            .context("call Gemini generateContent")?;
        let parsed: GeminiResponse = response
            .body_mut()
            .read_json()
            .context("decode Gemini response")?;
        let text = extract_text(parsed)?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = request.prompt.len(),
            attachment = request.attachment.is_some(),
            response_bytes = text.len(),
            "completion received"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::{validate_attachment, AttachmentInput};

    #[test]
    fn blank_credentials_are_missing() {
        assert!(Credential::new(None).is_none());
        assert!(Credential::new(Some("")).is_none());
        assert!(Credential::new(Some("   ")).is_none());
        let key = Credential::new(Some(" AIza-test ")).expect("credential");
        assert_eq!(key.expose(), "AIza-test");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let key = Credential::new(Some("secret-key")).expect("credential");
        assert!(!format!("{key:?}").contains("secret-key"));
    }

    #[test]
    fn request_requests_json_mode_and_inlines_attachment() {
        let attachment = validate_attachment(AttachmentInput::from_bytes(
            "notes.txt",
            "text/plain",
            b"hello".to_vec(),
        ))
        .expect("attachment");
        let request = CompletionRequest {
            prompt: "forecast",
            attachment: Some(&attachment),
        };
        let value = serde_json::to_value(build_request(&request)).expect("serialize request");
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "forecast");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "text/plain");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
    }

    #[test]
    fn text_only_request_has_single_part() {
        let value = serde_json::to_value(build_request(&CompletionRequest::text("hi")))
            .expect("serialize request");
        assert_eq!(value["contents"][0]["parts"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn extract_text_joins_parts_of_first_candidate() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"risks\":"}, {"text": "[]}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .expect("response");
        assert_eq!(extract_text(response).expect("text"), "{\"risks\":[]}");
    }

    #[test]
    fn extract_text_surfaces_api_errors_and_empty_responses() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "error": {"message": "API key not valid", "code": 400}
        }))
        .expect("response");
        let err = extract_text(response).expect_err("api error");
        assert!(err.to_string().contains("API key not valid"));

        let empty: GeminiResponse =
            serde_json::from_value(serde_json::json!({"candidates": []})).expect("response");
        assert!(extract_text(empty).is_err());
    }

    #[test]
    fn factory_builds_model_url_from_config() {
        let config = PipelineConfig {
            completion_endpoint: "https://example.test/v1beta/".to_string(),
            model: "gemini-test".to_string(),
            ..PipelineConfig::default()
        };
        let key = Credential::new(Some("k")).expect("credential");
        let client = GeminiFactory::from_config(&config).connect(&key);
        assert_eq!(
            client.url,
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
    }
}
