//! Chat-completion LLM client with structured JSON output.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use recut_models::TokenUsage;

use crate::config::{EndpointConfig, MlConfig};
use crate::error::{MlError, MlResult};

const LLM_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_MAX_TOKENS: u32 = 4000;
/// Large enough to avoid truncation on multi-video responses.
const STRUCTURED_MAX_TOKENS: u32 = 6000;
const STRUCTURED_TEMPERATURE: f64 = 0.3;
const MAX_ATTEMPTS: u32 = 3;

/// One conversation message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Raw completion result.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: TokenUsage,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for the chat-completion capability.
pub struct LlmClient {
    config: EndpointConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: EndpointConfig) -> MlResult<Self> {
        let client = reqwest::Client::builder().timeout(LLM_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    pub fn from_config(config: &MlConfig) -> MlResult<Self> {
        let endpoint = config
            .llm
            .clone()
            .ok_or(MlError::CapabilityDisabled("llm"))?;
        Self::new(endpoint)
    }

    /// Generate a completion, retrying rate limits and server errors
    /// with exponential backoff.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
        response_format: Option<Value>,
    ) -> MlResult<LlmResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            match self
                .call_once(messages, temperature, max_tokens, response_format.clone())
                .await
            {
                Ok(response) => {
                    info!(
                        prompt_tokens = response.usage.prompt_tokens,
                        completion_tokens = response.usage.completion_tokens,
                        "LLM request successful"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    let wait = Duration::from_secs(1 << attempt);
                    warn!("LLM request failed ({e}), retrying in {wait:?}");
                    tokio::time::sleep(wait).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(MlError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// Generate structured JSON conforming to `json_schema`.
    ///
    /// Wraps the schema in a `json_schema` response-format directive,
    /// strips markdown fences from the reply and repairs common
    /// truncation damage before giving up on parsing.
    pub async fn generate_structured(
        &self,
        messages: &[ChatMessage],
        json_schema: Value,
        temperature: Option<f64>,
    ) -> MlResult<(Value, TokenUsage)> {
        let response_format = serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": "storytelling_edit_plan",
                "strict": true,
                "schema": json_schema,
            }
        });

        let response = self
            .generate(
                messages,
                temperature.unwrap_or(STRUCTURED_TEMPERATURE),
                STRUCTURED_MAX_TOKENS,
                Some(response_format),
            )
            .await?;

        let value = parse_structured_content(&response.content)?;
        Ok((value, response.usage))
    }

    async fn call_once(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
        response_format: Option<Value>,
    ) -> MlResult<LlmResponse> {
        let model = self.config.model.as_deref().unwrap_or("default");
        let request = ChatRequest {
            model,
            messages,
            temperature,
            max_tokens,
            response_format,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::RequestFailed {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MlError::invalid_response("no choices in completion"))?;

        Ok(LlmResponse {
            content,
            usage: completion.usage,
            model: completion.model,
        })
    }
}

impl LlmClient {
    /// Default max_tokens for unstructured calls.
    pub fn default_max_tokens() -> u32 {
        DEFAULT_MAX_TOKENS
    }
}

/// Parse structured LLM output, repairing when necessary.
pub fn parse_structured_content(content: &str) -> MlResult<Value> {
    let stripped = strip_markdown_fences(content);
    match serde_json::from_str(stripped) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let repaired = repair_json(stripped);
            serde_json::from_str(&repaired).map_err(|_| {
                MlError::invalid_response(format!(
                    "invalid JSON from LLM (line {}, column {}): {first_err}",
                    first_err.line(),
                    first_err.column()
                ))
            })
        }
    }
}

/// Strip ```json ... ``` fences.
fn strip_markdown_fences(content: &str) -> &str {
    let mut s = content.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Repair truncated or sloppy JSON: drop trailing commas, close an
/// unterminated string and append the missing closing delimiters in
/// reverse nesting order.
pub fn repair_json(input: &str) -> String {
    balance_delimiters(&remove_trailing_commas(input))
}

fn remove_trailing_commas(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ',' => {
                // Drop the comma when the next significant byte closes
                // a container or the input ends (truncation).
                let mut j = i + 1;
                while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                    j += 1;
                }
                if j >= bytes.len() || bytes[j] == b'}' || bytes[j] == b']' {
                    i += 1;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn balance_delimiters(input: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => stack.push(c),
            '}' => {
                if stack.last() == Some(&'{') {
                    stack.pop();
                }
            }
            ']' => {
                if stack.last() == Some(&'[') {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = input.to_string();
    if in_string {
        out.push('"');
    }
    while let Some(open) = stack.pop() {
        out.push(if open == '{' { '}' } else { ']' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_strip_markdown_fences() {
        assert_eq!(strip_markdown_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_markdown_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_markdown_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_repair_appends_closers_in_reverse_nesting_order() {
        // Two unbalanced braces and one unbalanced bracket.
        let truncated = r#"{"plan": {"segments": [1, 2"#;
        let repaired = repair_json(truncated);
        assert!(repaired.ends_with("]}}"));
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["plan"]["segments"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_repair_removes_trailing_commas() {
        let sloppy = r#"{"a": [1, 2,], "b": 3,}"#;
        let value: Value = serde_json::from_str(&repair_json(sloppy)).unwrap();
        assert_eq!(value["a"], serde_json::json!([1, 2]));
        assert_eq!(value["b"], 3);
    }

    #[test]
    fn test_repair_closes_unterminated_string() {
        let truncated = r#"{"reason": "cut mid-sent"#;
        let value: Value = serde_json::from_str(&repair_json(truncated)).unwrap();
        assert_eq!(value["reason"], "cut mid-sent");
    }

    #[test]
    fn test_repair_ignores_delimiters_inside_strings() {
        let tricky = r#"{"a": "}]{["#;
        let value: Value = serde_json::from_str(&repair_json(tricky)).unwrap();
        assert_eq!(value["a"], "}]{[");
    }

    #[test]
    fn test_repair_drops_comma_before_truncation_point() {
        let truncated = r#"{"edl": [{"start": 0.0},"#;
        let value: Value = serde_json::from_str(&repair_json(truncated)).unwrap();
        assert_eq!(value["edl"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_structured_content_surfaces_offset() {
        let err = parse_structured_content("not json at all, not repairable }{").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line"));
        assert!(message.contains("column"));
    }

    fn endpoint(server: &MockServer) -> EndpointConfig {
        EndpointConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            model: Some("test-model".to_string()),
        }
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7},
            "model": "test-model"
        })
    }

    #[tokio::test]
    async fn test_generate_parses_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("hi")))
            .mount(&server)
            .await;

        let client = LlmClient::new(endpoint(&server)).unwrap();
        let messages = [ChatMessage::user("hello")];
        let response = client.generate(&messages, 0.7, 100, None).await.unwrap();

        assert_eq!(response.content, "hi");
        assert_eq!(response.usage.prompt_tokens, 12);
        assert_eq!(response.usage.completion_tokens, 7);
    }

    #[tokio::test]
    async fn test_generate_retries_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
            .with_priority(2)
            .mount(&server)
            .await;

        let client = LlmClient::new(endpoint(&server)).unwrap();
        let messages = [ChatMessage::user("hello")];
        let response = client.generate(&messages, 0.3, 100, None).await.unwrap();
        assert_eq!(response.content, "recovered");
    }

    #[tokio::test]
    async fn test_generate_structured_repairs_fenced_json() {
        let server = MockServer::start().await;
        let fenced = "```json\n{\"edl\": [{\"start\": 0.0, \"end\": 2.0\n```";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(fenced)))
            .mount(&server)
            .await;

        let client = LlmClient::new(endpoint(&server)).unwrap();
        let messages = [ChatMessage::user("plan")];
        let (value, usage) = client
            .generate_structured(&messages, serde_json::json!({"type": "object"}), None)
            .await
            .unwrap();

        assert_eq!(value["edl"][0]["end"], 2.0);
        assert_eq!(usage.prompt_tokens, 12);
    }
}
