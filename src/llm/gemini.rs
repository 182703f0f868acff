//! Gemini `generateContent` client for the desk assistant.
//!
//! A thin pass-through: seeded history plus one utterance in, raw model text
//! out. No retry, backoff, or rate limiting; the turn fails hard on any
//! upstream error. Requests carry explicit timeouts so a stalled upstream
//! cannot hold a turn open indefinitely.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::history::{ChatRole, ChatTurn};
use crate::config::GeminiConfig;

/// Connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Overall timeout for one generation call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Header carrying the API credential.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Errors produced by the reasoning-service client.
#[derive(Debug, Error)]
pub enum ModelError {
    /// HTTP client error.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// Upstream returned a non-success status.
    #[error("reasoning service returned status {0}")]
    ApiStatus(u16),
    /// Upstream returned no usable text.
    #[error("no response from reasoning service")]
    NoResponse,
}

/// Convenience result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Boxed future type for model operations.
pub type ModelFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A conversational text model addressed with seeded history.
pub trait ChatModel: Send + Sync {
    /// Send one utterance against the given history, returning raw text.
    ///
    /// # Errors
    /// Returns an error if the upstream call fails or yields no text.
    fn send(
        &self,
        history: Vec<ChatTurn>,
        utterance: String,
    ) -> ModelFuture<'_, ModelResult<String>>;
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

/// Async Gemini client with a fixed system instruction.
///
/// The instruction is set once per client, mirroring how the service is
/// configured per model handle rather than per request.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    instructions: String,
}

impl GeminiClient {
    /// Create a client from configuration and the system instructions.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GeminiConfig, instructions: String) -> ModelResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            instructions,
        })
    }

    async fn generate(&self, contents: Vec<Content>) -> ModelResult<String> {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: self.instructions.clone(),
                }],
            },
            contents,
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::ApiStatus(status.as_u16()));
        }

        let body = response.json::<GenerateResponse>().await?;
        extract_text(&body).ok_or(ModelError::NoResponse)
    }
}

impl ChatModel for GeminiClient {
    fn send(
        &self,
        history: Vec<ChatTurn>,
        utterance: String,
    ) -> ModelFuture<'_, ModelResult<String>> {
        Box::pin(async move {
            let mut contents: Vec<Content> = history
                .into_iter()
                .map(|turn| Content {
                    role: Some(turn.role.as_str()),
                    parts: vec![Part { text: turn.text }],
                })
                .collect();
            contents.push(Content {
                role: Some(ChatRole::User.as_str()),
                parts: vec![Part { text: utterance }],
            });

            self.generate(contents).await
        })
    }
}

/// Concatenated text of the first candidate, if any.
fn extract_text(response: &GenerateResponse) -> Option<String> {
    let parts = response
        .candidates
        .as_ref()?
        .first()?
        .content
        .as_ref()?
        .parts
        .as_ref()?;

    let mut out = String::new();
    for part in parts {
        if let Some(text) = &part.text {
            out.push_str(text);
        }
    }

    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use crate::chat::history::seed_history;

    use super::*;

    #[test]
    fn test_request_serializes_to_wire_names() {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: "be brief".to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.1 },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("systemInstruction").is_some());
        assert!(value.get("generationConfig").is_some());
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], json!("user"));
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] }
            }]
        }))
        .unwrap();

        assert_eq!(extract_text(&response).as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_extract_text_empty_candidates_is_none() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(extract_text(&response).is_none());

        let response: GenerateResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(extract_text(&response).is_none());
    }

    async fn spawn_stub(response: Value) -> String {
        let app = Router::new().route(
            "/models/{model}",
            post(move || {
                let response = response.clone();
                async move { Json(response) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_send_extracts_candidate_text() {
        let base_url = spawn_stub(json!({
            "candidates": [{
                "content": { "parts": [{ "text": r#"{"reply":"What is your name?","query":null}"# }] }
            }]
        }))
        .await;

        let config = GeminiConfig {
            base_url,
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config, "instructions".to_string()).unwrap();

        let raw = client
            .send(seed_history(), "I want to book an appointment".to_string())
            .await
            .unwrap();
        assert_eq!(raw, r#"{"reply":"What is your name?","query":null}"#);
    }

    #[tokio::test]
    async fn test_send_without_candidates_is_no_response() {
        let base_url = spawn_stub(json!({ "candidates": [] })).await;

        let config = GeminiConfig {
            base_url,
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config, "instructions".to_string()).unwrap();

        let err = client.send(Vec::new(), "hello".to_string()).await.unwrap_err();
        assert!(matches!(err, ModelError::NoResponse));
    }
}
