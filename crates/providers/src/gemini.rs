use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{IntentProvider, ProviderError};

const NAME: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` adapter. Requests JSON output directly.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 2048,
                response_mime_type: "application/json",
            },
        };

        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, "sending gemini generateContent");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::transport(NAME, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: NAME,
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::undecodable(NAME, err))?;
        candidate_text(body)
    }
}

impl IntentProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.generate_content(prompt))
    }
}

fn candidate_text(body: GenerateContentResponse) -> Result<String, ProviderError> {
    let text = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(ProviderError::EmptyPayload { provider: NAME })
    } else {
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn parse(raw: &str) -> Result<String, ProviderError> {
        candidate_text(serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn joins_first_candidate_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"intent\":"},{"text":"\"UNKNOWN\"}"}]}}]}"#;
        assert_eq!(parse(raw).unwrap(), r#"{"intent":"UNKNOWN"}"#);
    }

    #[test]
    fn no_candidates_is_empty_payload() {
        assert!(matches!(
            parse(r#"{"candidates":[]}"#),
            Err(ProviderError::EmptyPayload { provider: "gemini" })
        ));
        assert!(matches!(
            parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#),
            Err(ProviderError::EmptyPayload { .. })
        ));
    }

    #[test]
    fn request_uses_json_mime_type() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 2048,
                response_mime_type: "application/json",
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
    }

    fn provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::new(Client::new(), "test-gemini-key", "gemini-test").with_base_url(base_url)
    }

    #[tokio::test]
    async fn generate_sends_key_header_and_reads_candidate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gemini-test:generateContent")
            .match_header(API_KEY_HEADER, "test-gemini-key")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"{\"intent\":\"QUERY_STATUS\"}"}]}}]}"#)
            .create_async()
            .await;

        let text = provider(&server.url()).generate("status?").await.unwrap();
        assert_eq!(text, r#"{"intent":"QUERY_STATUS"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gemini-test:generateContent")
            .with_status(429)
            .with_body(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let err = provider(&server.url()).generate("hi").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Status { provider: "gemini", status: 429, ref body } if body.contains("RESOURCE_EXHAUSTED")
        ));
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gemini-test:generateContent")
            .with_status(200)
            .with_body("<html>upstream proxy</html>")
            .create_async()
            .await;

        let err = provider(&server.url()).generate("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { provider: "gemini", .. }));
    }

    #[tokio::test]
    async fn transport_error_does_not_expose_key() {
        let err = GeminiProvider::new(Client::new(), "SECRET-GEMINI", "m")
            .with_base_url("http://127.0.0.1:1")
            .generate("hi")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Transport { .. }));
        assert!(!err.to_string().contains("SECRET-GEMINI"));
    }
}
