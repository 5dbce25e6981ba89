use serde::{Deserialize, Serialize};

use super::{ChatTurn, LlmError, ReplyGenerator};
use crate::models::enums::MessageRole;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
            timeout_secs,
        }
    }

    /// Configure from the environment: GEMINI_API_KEY, GEMINI_MODEL,
    /// GEMINI_BASE_URL. A missing key is reported on first use, not here.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = std::env::var("GEMINI_API_KEY").ok();
        Self::new(&base_url, &model, api_key, DEFAULT_TIMEOUT_SECS)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn wire_role(role: MessageRole) -> &'static str {
        match role {
            MessageRole::User => "user",
            MessageRole::Ai => "model",
        }
    }
}

/// Request body for models/{model}:generateContent
#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

/// Response body from models/{model}:generateContent
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl ReplyGenerator for GeminiClient {
    fn generate(&self, history: &[ChatTurn], prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: Self::wire_role(turn.role),
                parts: vec![Part {
                    text: turn.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: "user",
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest { contents })
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
