use crate::error::InferenceError;
use crate::parse::parse_findings;
use crate::prompt::render_prompt;
use crate::provider::{InferenceRequest, ModelProvider};
use async_trait::async_trait;
use refine_protocol::{Category, Finding, LineRange, Severity};
use serde::Deserialize;

/// Remote inference server client.
///
/// Posts the rendered prompt to `{endpoint}` and accepts either of the two
/// response shapes deployed servers use: a JSON findings document, or a
/// generated-text completion that is then run through the structured parser.
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct FindingsDocument {
    #[serde(alias = "issues")]
    findings: Vec<WireFinding>,
}

#[derive(Debug, Deserialize)]
struct WireFinding {
    severity: String,
    #[serde(default)]
    line: Option<usize>,
    #[serde(default)]
    end_line: Option<usize>,
    #[serde(alias = "message")]
    description: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "solution")]
    suggestion: Option<String>,
}

impl HttpProvider {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: None,
            model: model.into(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> InferenceError {
        let snippet: String = body.chars().take(200).collect();
        if status.as_u16() == 429 || status.as_u16() == 503 || status.is_server_error() {
            InferenceError::transient(format!("server returned {status}: {snippet}"))
        } else {
            InferenceError::fatal(format!("server rejected request with {status}: {snippet}"))
        }
    }

    fn classify_transport(error: &reqwest::Error) -> InferenceError {
        if error.is_builder() {
            InferenceError::fatal(format!("malformed request: {error}"))
        } else {
            // Connect failures, timeouts, and broken transfers are all
            // worth another attempt.
            InferenceError::transient(format!("transport error: {error}"))
        }
    }
}

#[async_trait]
impl ModelProvider for HttpProvider {
    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<Finding>, InferenceError> {
        let prompt = render_prompt(request);
        let payload = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": 1024,
                "temperature": 0.3,
                "top_p": 0.9,
                "return_full_text": false,
            },
            "model": self.model,
        });

        let mut builder = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        log::debug!("posting inference request to {}", self.endpoint);
        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::classify_transport(&e))?;

        if !status.is_success() {
            return Err(Self::classify_status(status, &body));
        }

        Ok(extract_findings(&body))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Accept the known response shapes, falling back to the structured text
/// parser for anything else.
fn extract_findings(body: &str) -> Vec<Finding> {
    if let Ok(document) = serde_json::from_str::<FindingsDocument>(body) {
        return document.findings.iter().filter_map(wire_to_finding).collect();
    }

    if let Ok(completions) = serde_json::from_str::<Vec<GeneratedText>>(body) {
        if let Some(first) = completions.first() {
            return parse_findings(&first.generated_text);
        }
    }

    parse_findings(body)
}

fn wire_to_finding(wire: &WireFinding) -> Option<Finding> {
    let severity = Severity::parse_token(&wire.severity)?;
    let start = wire.line.unwrap_or(1);
    let range = LineRange::new(start, wire.end_line.unwrap_or(start));

    let category = wire
        .category
        .as_deref()
        .and_then(parse_category)
        .unwrap_or(Category::Bug);

    let mut finding = Finding::new(category, severity, range, wire.description.clone());
    if let Some(suggestion) = wire.suggestion.as_deref().filter(|s| !s.is_empty()) {
        finding = finding.with_suggestion(suggestion);
    }
    Some(finding)
}

fn parse_category(token: &str) -> Option<Category> {
    match token.trim().to_ascii_uppercase().as_str() {
        "BUG" => Some(Category::Bug),
        "SECURITY" => Some(Category::Security),
        "PERFORMANCE" => Some(Category::Performance),
        "STYLE" => Some(Category::Style),
        "DOCUMENTATION" => Some(Category::Documentation),
        _ => None,
    }
}
