use futures::future::BoxFuture;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{IntentProvider, ProviderError};

const NAME: &str = "huggingface";
const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Hugging Face Inference API adapter for instruction-tuned text models.
#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    token: String,
    model: String,
    base_url: String,
}

impl HuggingFaceProvider {
    pub fn new(client: Client, token: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn infer(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: 500,
                temperature: 0.7,
                top_p: 0.95,
                return_full_text: false,
            },
        };

        let url = format!("{}/{}", self.base_url, self.model);
        debug!(model = %self.model, "sending huggingface inference request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
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

        let body: Value = response
            .json()
            .await
            .map_err(|err| ProviderError::undecodable(NAME, err))?;
        generated_text(&body)
    }
}

impl IntentProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(self.infer(prompt))
    }
}

/// Accepts `[{"generated_text": ..}]` as well as the bare object form.
fn generated_text(body: &Value) -> Result<String, ProviderError> {
    let entry = match body {
        Value::Array(items) => items
            .first()
            .ok_or(ProviderError::EmptyPayload { provider: NAME })?,
        Value::Object(_) => body,
        other => {
            return Err(ProviderError::Malformed {
                provider: NAME,
                message: format!("unexpected payload: {}", other),
            })
        }
    };

    if let Some(error) = entry.get("error").and_then(Value::as_str) {
        return Err(ProviderError::Malformed {
            provider: NAME,
            message: error.to_string(),
        });
    }

    let text = entry
        .get("generated_text")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Malformed {
            provider: NAME,
            message: "missing generated_text".to_string(),
        })?;

    if text.trim().is_empty() {
        Err(ProviderError::EmptyPayload { provider: NAME })
    } else {
        Ok(text.to_string())
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    return_full_text: bool,
}
