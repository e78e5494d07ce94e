use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use facit_core::InvoiceRecord;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("extraction request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("extraction endpoint returned HTTP {0}")]
    Status(u16),
    #[error("malformed extraction response: {0}")]
    Malformed(String),
}

/// Abstraction over the extraction model.
/// Implementations take the request inputs (raw text and/or a base64 image)
/// and return one parsed invoice record.
pub trait InvoiceOracle: Send + Sync {
    fn extract(
        &self,
        text: Option<&str>,
        image_base64: Option<&str>,
    ) -> impl Future<Output = Result<InvoiceRecord, OracleError>> + Send;
}

// ── Chat-completions client ───────────────────────────────────────────────────

/// Settings for the extraction endpoint, collected once at startup and
/// passed in here; nothing reads the process environment at call time.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    /// Applied to the whole oracle call; expiry is an availability error.
    pub timeout: Duration,
}

impl OracleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint with vision
/// input. One outbound call per extraction, no shared mutable state.
pub struct OpenAiOracle {
    client: reqwest::Client,
    config: OracleConfig,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

impl InvoiceOracle for OpenAiOracle {
    async fn extract(
        &self,
        text: Option<&str>,
        image_base64: Option<&str>,
    ) -> Result<InvoiceRecord, OracleError> {
        let request = ChatRequest::for_invoice(&self.config.model, text, image_base64);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status(status.as_u16()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| OracleError::Malformed("no choices in response".to_string()))?;
        debug!(content, "oracle response content");

        InvoiceRecord::from_json(content).map_err(|e| OracleError::Malformed(e.to_string()))
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

const SYSTEM_PROMPT: &str = "You are an automated accountant. Extract vendor, \
date (YYYY-MM-DD), total amount, vat amount, and vat rate (percentage) from \
the invoice. Return JSON only.";

const SHAPE_PROMPT: &str = "Return a JSON object with keys: 'vendor', 'date', \
'total', 'vat', 'vat_rate'. Use numbers for amounts. If vat/rate is missing, \
use 0.";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

impl ChatRequest {
    /// Grounds the model in whatever was supplied: the detected text, the
    /// image, or both, followed by the output-shape instruction.
    fn for_invoice(model: &str, text: Option<&str>, image_base64: Option<&str>) -> Self {
        let mut parts = Vec::new();
        if let Some(text) = text {
            parts.push(ContentPart::Text {
                text: format!("Analyze this invoice text:\n{text}"),
            });
        }
        if let Some(image) = image_base64 {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/jpeg;base64,{image}"),
                    detail: "high",
                },
            });
        }
        parts.push(ContentPart::Text {
            text: SHAPE_PROMPT.to_string(),
        });

        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(parts),
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: 0.0,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

// ── Mock oracle (always available, used for tests) ────────────────────────────

/// Returns a pre-set record or failure, letting pipeline and route tests
/// run without a live extraction endpoint.
pub struct MockOracle {
    response: Result<InvoiceRecord, String>,
}

impl MockOracle {
    pub fn returning(record: InvoiceRecord) -> Self {
        Self { response: Ok(record) }
    }

    pub fn failing(detail: impl Into<String>) -> Self {
        Self { response: Err(detail.into()) }
    }
}

impl InvoiceOracle for MockOracle {
    async fn extract(
        &self,
        _text: Option<&str>,
        _image_base64: Option<&str>,
    ) -> Result<InvoiceRecord, OracleError> {
        self.response.clone().map_err(OracleError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_text_and_image_parts() {
        let request = ChatRequest::for_invoice("gpt-4o", Some("TOTAL: 720.00"), Some("aGVsbG8="));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["temperature"], 0.0);
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");

        let parts = value["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["type"], "text");
        assert!(parts[0]["text"].as_str().unwrap().contains("TOTAL: 720.00"));
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/jpeg;base64,aGVsbG8="
        );
        assert_eq!(parts[1]["image_url"]["detail"], "high");
        // The shape instruction always comes last.
        assert!(parts[2]["text"].as_str().unwrap().contains("'vat_rate'"));
    }

    #[test]
    fn request_without_image_has_two_parts() {
        let request = ChatRequest::for_invoice("gpt-4o", Some("text"), None);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][1]["content"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn response_content_parses_into_record() {
        let payload = r#"{
            "choices": [{"message": {"content": "{\"vendor\": \"Tech Corp Inc.\", \"total\": 720}"}}]
        }"#;
        let response: ChatResponse = serde_json::from_str(payload).unwrap();
        let record =
            InvoiceRecord::from_json(&response.choices[0].message.content).unwrap();
        assert_eq!(record.vendor, "Tech Corp Inc.");
    }

    #[tokio::test]
    async fn mock_oracle_returns_preset_record() {
        let record = InvoiceRecord::from_json("{\"vendor\": \"A\"}").unwrap();
        let oracle = MockOracle::returning(record);
        let out = oracle.extract(Some("irrelevant"), None).await.unwrap();
        assert_eq!(out.vendor, "A");
    }

    #[tokio::test]
    async fn mock_oracle_failure_is_malformed() {
        let oracle = MockOracle::failing("boom");
        let err = oracle.extract(None, Some("img")).await.unwrap_err();
        assert!(matches!(err, OracleError::Malformed(d) if d == "boom"));
    }
}
