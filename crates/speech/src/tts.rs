use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SpeechError;

const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com/v1";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Renders text as MP3 bytes.
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn synthesize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<u8>, SpeechError>>;
}

/// Google Cloud Text-to-Speech `text:synthesize`.
#[derive(Debug, Clone)]
pub struct GoogleSpeechSynthesizer {
    client: Client,
    api_key: Option<String>,
    language: String,
    base_url: String,
}

impl GoogleSpeechSynthesizer {
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

    async fn synthesize_remote(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SpeechError::NotConfigured("Google text-to-speech"))?;

        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        debug!(chars = text.chars().count(), "sending text:synthesize");
        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(SpeechError::synthesis)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Synthesis(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(SpeechError::synthesis)?;
        decode_audio(&body.audio_content)
    }
}

impl SpeechSynthesizer for GoogleSpeechSynthesizer {
    fn name(&self) -> &'static str {
        "google-tts"
    }

    fn synthesize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<u8>, SpeechError>> {
        Box::pin(self.synthesize_remote(text))
    }
}

fn decode_audio(content: &str) -> Result<Vec<u8>, SpeechError> {
    let bytes = STANDARD
        .decode(content.trim())
        .map_err(|err| SpeechError::Synthesis(format!("invalid audio content: {}", err)))?;
    if bytes.is_empty() {
        return Err(SpeechError::Synthesis("no audio returned".to_string()));
    }
    Ok(bytes)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}
