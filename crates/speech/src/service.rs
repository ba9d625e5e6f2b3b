use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use genie_core::{SpeechToTextResponse, TextToSpeechResponse};
use genie_observability::AppMetrics;
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::config::SpeechSettings;
use crate::error::SpeechError;
use crate::stt::{GoogleSpeechRecognizer, SpeechRecognizer};
use crate::transcode::{AudioTranscoder, FfmpegTranscoder};
use crate::tts::{GoogleSpeechSynthesizer, SpeechSynthesizer};

/// Largest accepted upload (10 MiB).
pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Uploads below this size are almost always a recording that never started.
pub const SUSPICIOUS_AUDIO_BYTES: usize = 1_000;

/// Speech-to-text and text-to-speech with every failure folded into the
/// response payload.
#[derive(Clone)]
pub struct VoicePipeline {
    transcoder: Arc<dyn AudioTranscoder>,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    metrics: Arc<AppMetrics>,
}

impl VoicePipeline {
    pub fn new(
        transcoder: Arc<dyn AudioTranscoder>,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            transcoder,
            recognizer,
            synthesizer,
            metrics,
        }
    }

    pub fn from_settings(settings: &SpeechSettings, client: Client, metrics: Arc<AppMetrics>) -> Self {
        if !settings.is_configured() {
            warn!("GENIE_GOOGLE_SPEECH_API_KEY not set; speech endpoints will report errors");
        }

        Self::new(
            Arc::new(
                FfmpegTranscoder::new(settings.ffmpeg_bin.clone())
                    .with_timeout(settings.transcode_timeout),
            ),
            Arc::new(GoogleSpeechRecognizer::new(
                client.clone(),
                settings.google_api_key.clone(),
                settings.language.clone(),
            )),
            Arc::new(GoogleSpeechSynthesizer::new(
                client,
                settings.google_api_key.clone(),
                settings.language.clone(),
            )),
            metrics,
        )
    }

    pub fn recognizer_name(&self) -> &'static str {
        self.recognizer.name()
    }

    pub fn synthesizer_name(&self) -> &'static str {
        self.synthesizer.name()
    }

    #[instrument(skip(self, audio), fields(bytes = audio.len()))]
    pub async fn speech_to_text(&self, audio: &[u8], filename: Option<&str>) -> SpeechToTextResponse {
        let started = Instant::now();
        let response = match self.transcribe(audio, filename).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("recognizer returned an empty transcript");
                SpeechToTextResponse::failed("No speech detected in audio")
            }
            Ok(text) => {
                info!(
                    chars = text.chars().count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "transcription complete"
                );
                SpeechToTextResponse::transcribed(text.trim())
            }
            Err(err) => {
                warn!(error = %err, "transcription failed");
                SpeechToTextResponse::failed(err.transcription_message())
            }
        };

        self.metrics.record_transcription(response.success);
        response
    }

    async fn transcribe(&self, audio: &[u8], filename: Option<&str>) -> Result<String, SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::AudioEmpty);
        }
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(SpeechError::AudioTooLarge {
                size: audio.len(),
                limit: MAX_AUDIO_BYTES,
            });
        }
        if audio.len() < SUSPICIOUS_AUDIO_BYTES {
            warn!(bytes = audio.len(), "audio upload is very small");
        }

        let hint = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        let normalized = self.transcoder.to_wav(audio, hint.as_deref()).await?;
        info!(
            duration_ms = normalized.duration().as_millis() as u64,
            format = hint.as_deref().unwrap_or("unknown"),
            "audio normalized"
        );
        self.recognizer.recognize(&normalized).await
    }

    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn text_to_speech(&self, text: &str) -> TextToSpeechResponse {
        let response = match self.synthesize(text).await {
            Ok(audio) => TextToSpeechResponse::synthesized(STANDARD.encode(audio)),
            Err(err) => {
                warn!(error = %err, "synthesis failed");
                TextToSpeechResponse::failed(err.to_string())
            }
        };

        self.metrics.record_synthesis(response.success);
        response
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }
        self.synthesizer.synthesize(text).await
    }
}
