//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the `generateContent` endpoint with:
//! - Plain text and structured (JSON schema constrained) generation
//! - System instructions and sampling temperature
//! - Inline binary parts (generated images) in responses

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Create a Gemini client from the environment.
    ///
    /// Reads `GEMINI_API_KEY`, falling back to `API_KEY`.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .map_err(|_| Error::NoApiKey)?;
        if api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a `generateContent` request and return the full response.
    pub async fn generate(&self, request: Request) -> Result<Response, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(parse_response(api_response))
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

fn build_api_request(request: &Request) -> ApiRequest {
    let contents = request
        .contents
        .iter()
        .map(|c| ApiContent {
            role: Some("user".to_string()),
            parts: c.parts.iter().map(ApiPart::from).collect(),
        })
        .collect();

    let system_instruction = request.system_instruction.as_ref().map(|text| ApiContent {
        role: None,
        parts: vec![ApiPart {
            text: Some(text.clone()),
            inline_data: None,
        }],
    });

    let generation_config = ApiGenerationConfig {
        temperature: request.temperature,
        response_mime_type: request.response_mime_type.clone(),
        response_schema: request.response_schema.clone(),
        response_modalities: request.response_modalities.as_ref().map(|m| {
            m.iter()
                .map(|modality| match modality {
                    Modality::Text => "TEXT".to_string(),
                    Modality::Image => "IMAGE".to_string(),
                })
                .collect()
        }),
    };

    ApiRequest {
        contents,
        system_instruction,
        generation_config: (!generation_config.is_empty()).then_some(generation_config),
    }
}

fn parse_response(api_response: ApiResponse) -> Response {
    let candidates = api_response
        .candidates
        .into_iter()
        .map(|c| Candidate {
            parts: c
                .content
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .filter_map(|p| match (p.text, p.inline_data) {
                            (_, Some(data)) => Some(Part::InlineData(InlineData {
                                mime_type: data.mime_type,
                                data: data.data,
                            })),
                            (Some(text), None) => Some(Part::Text(text)),
                            (None, None) => None,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            finish_reason: c.finish_reason.map(|r| match r.as_str() {
                "STOP" => FinishReason::Stop,
                "MAX_TOKENS" => FinishReason::MaxTokens,
                "SAFETY" => FinishReason::Safety,
                _ => FinishReason::Other(r),
            }),
        })
        .collect();

    Response {
        candidates,
        model_version: api_response.model_version,
        usage: api_response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        }),
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A `generateContent` request.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub response_mime_type: Option<String>,
    pub response_schema: Option<serde_json::Value>,
    pub response_modalities: Option<Vec<Modality>>,
}

impl Request {
    /// Create a new request with the given contents.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            model: None,
            contents,
            system_instruction: None,
            temperature: None,
            response_mime_type: None,
            response_schema: None,
            response_modalities: None,
        }
    }

    /// Create a single-turn request from a user prompt.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![Content::user(text)])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Constrain the output to JSON matching `schema`.
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_mime_type = Some("application/json".to_string());
        self.response_schema = Some(schema);
        self
    }

    pub fn with_response_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = Some(modalities);
        self
    }

    /// Concatenated text of every part in every content entry.
    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A user turn. Requests are single-turn, so every turn is sent as `user`.
#[derive(Debug, Clone)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user turn with text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// Output modalities the model may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

/// A piece of content: text or inline binary data.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData(InlineData),
}

impl Part {
    /// Extract text from a text part.
    pub fn as_text(&self) -> Option<&str> {
        if let Part::Text(text) = self {
            Some(text)
        } else {
            None
        }
    }

    /// Extract inline data from a binary part.
    pub fn as_inline_data(&self) -> Option<&InlineData> {
        if let Part::InlineData(data) = self {
            Some(data)
        } else {
            None
        }
    }
}

/// Base64-encoded binary payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// A `generateContent` response.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub candidates: Vec<Candidate>,
    pub model_version: Option<String>,
    pub usage: Option<Usage>,
}

impl Response {
    /// A response with a single candidate holding `parts`.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                parts,
                finish_reason: Some(FinishReason::Stop),
            }],
            ..Default::default()
        }
    }

    /// A response with a single text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_parts(vec![Part::Text(text.into())])
    }

    /// Text of the first candidate, or `None` when it carries no text.
    pub fn text(&self) -> Option<String> {
        let text = self
            .candidates
            .first()?
            .parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("");
        (!text.is_empty()).then_some(text)
    }

    /// Why the first candidate stopped, if the provider said.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.candidates.first()?.finish_reason.as_ref()
    }

    /// The first inline binary part of the first candidate.
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .parts
            .iter()
            .find_map(Part::as_inline_data)
    }
}

/// One generated alternative.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub parts: Vec<Part>,
    pub finish_reason: Option<FinishReason>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other(String),
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<ApiInlineData>,
}

impl From<&Part> for ApiPart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => ApiPart {
                text: Some(text.clone()),
                inline_data: None,
            },
            Part::InlineData(data) => ApiPart {
                text: None,
                inline_data: Some(ApiInlineData {
                    mime_type: data.mime_type.clone(),
                    data: data.data.clone(),
                }),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

impl ApiGenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.response_mime_type.is_none()
            && self.response_schema.is_none()
            && self.response_modalities.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.base_url, API_BASE);
    }

    #[test]
    fn test_client_with_model_and_base_url() {
        let client = Gemini::new("test-key")
            .with_model("gemini-2.5-pro")
            .with_base_url("http://localhost:8080/");
        assert_eq!(client.model(), "gemini-2.5-pro");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::prompt("Tell me about gravity")
            .with_system_instruction("You are a storyteller")
            .with_temperature(0.3)
            .with_json_schema(json!({ "type": "OBJECT" }));

        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.response_mime_type.as_deref(), Some("application/json"));
        assert_eq!(request.prompt_text(), "Tell me about gravity");
        assert!(request.system_instruction.is_some());
    }

    #[test]
    fn test_api_request_serialization() {
        let request = Request::prompt("Hello")
            .with_system_instruction("Be brief")
            .with_temperature(0.5)
            .with_json_schema(json!({ "type": "OBJECT" }));

        let value = serde_json::to_value(build_api_request(&request)).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_plain_request_omits_generation_config() {
        let value = serde_json::to_value(build_api_request(&Request::prompt("Hi"))).unwrap();
        assert!(value.get("generationConfig").is_none());
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let raw = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 4 },
            "modelVersion": "gemini-2.5-flash"
        });
        let api: ApiResponse = serde_json::from_value(raw).unwrap();
        let response = parse_response(api);

        assert_eq!(response.text().as_deref(), Some("{\"a\":1}"));
        assert_eq!(response.finish_reason(), Some(&FinishReason::Stop));
        assert_eq!(response.model_version.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(response.usage.as_ref().map(|u| u.prompt_tokens), Some(12));
        assert_eq!(response.usage.as_ref().map(|u| u.output_tokens), Some(4));
        assert!(response.first_inline_data().is_none());
    }

    #[test]
    fn test_parse_image_response() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here is your picture" },
                    { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
                ] }
            }]
        });
        let api: ApiResponse = serde_json::from_value(raw).unwrap();
        let response = parse_response(api);

        let image = response.first_inline_data().unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "iVBORw0KGgo=");
    }

    #[test]
    fn test_empty_response_has_no_text() {
        let api: ApiResponse = serde_json::from_value(json!({})).unwrap();
        let response = parse_response(api);
        assert!(response.text().is_none());
        assert!(response.first_inline_data().is_none());

        let blocked = Response::from_parts(vec![]);
        assert!(blocked.text().is_none());
    }

    #[test]
    fn test_parse_blocked_response() {
        let raw = json!({
            "candidates": [{ "finishReason": "SAFETY" }],
            "modelVersion": "gemini-2.5-flash"
        });
        let response = parse_response(serde_json::from_value(raw).unwrap());

        assert!(response.text().is_none());
        assert_eq!(response.finish_reason(), Some(&FinishReason::Safety));
        assert!(Response::default().finish_reason().is_none());
    }
}
