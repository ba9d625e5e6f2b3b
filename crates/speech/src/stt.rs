use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SpeechError;
use crate::transcode::NormalizedAudio;

const DEFAULT_BASE_URL: &str = "https://speech.googleapis.com/v1";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Turns normalized audio into a transcript. An empty transcript is a valid
/// answer; unintelligible audio is [`SpeechError::TranscriptionAmbiguous`].
pub trait SpeechRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize<'a>(&'a self, audio: &'a NormalizedAudio) -> BoxFuture<'a, Result<String, SpeechError>>;
}

/// Google Cloud Speech-to-Text `speech:recognize`.
#[derive(Debug, Clone)]
pub struct GoogleSpeechRecognizer {
    client: Client,
    api_key: Option<String>,
    language: String,
    base_url: String,
}

impl GoogleSpeechRecognizer {
    pub fn new(client: Client, api_key: Option<String>, language: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            language: language.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn recognize_remote(&self, audio: &NormalizedAudio) -> Result<String, SpeechError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SpeechError::NotConfigured("Google speech recognition"))?;

        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: audio.sample_rate(),
                language_code: &self.language,
                enable_automatic_punctuation: true,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(audio.pcm()?),
            },
        };

        debug!(
            language = %self.language,
            duration_ms = audio.duration().as_millis() as u64,
            "sending speech:recognize"
        );
        let response = self
            .client
            .post(format!("{}/speech:recognize", self.base_url))
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(SpeechError::service)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::ServiceUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: RecognizeResponse = response.json().await.map_err(SpeechError::service)?;
        transcript(body)
    }
}

impl SpeechRecognizer for GoogleSpeechRecognizer {
    fn name(&self) -> &'static str {
        "google-speech"
    }

    fn recognize<'a>(&'a self, audio: &'a NormalizedAudio) -> BoxFuture<'a, Result<String, SpeechError>> {
        Box::pin(self.recognize_remote(audio))
    }
}

/// Joins the top alternative of every result segment.
fn transcript(body: RecognizeResponse) -> Result<String, SpeechError> {
    if body.results.is_empty() {
        return Err(SpeechError::TranscriptionAmbiguous);
    }

    let text = body
        .results
        .into_iter()
        .filter_map(|result| result.alternatives.into_iter().next())
        .map(|alternative| alternative.transcript.trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(text)
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}
