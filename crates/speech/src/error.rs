use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Audio file is empty")]
    AudioEmpty,

    #[error("audio payload exceeds maximum size: {size} bytes (limit: {limit} bytes)")]
    AudioTooLarge { size: usize, limit: usize },

    #[error("audio conversion failed: {0}")]
    AudioConversion(String),

    #[error("speech could not be understood")]
    TranscriptionAmbiguous,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Text is empty")]
    EmptyText,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl SpeechError {
    /// Message shown to the caller of the speech-to-text endpoint.
    pub fn transcription_message(&self) -> String {
        match self {
            Self::AudioEmpty | Self::AudioTooLarge { .. } => self.to_string(),
            Self::AudioConversion(_) => {
                "Failed to convert audio format. Please ensure you're recording audio properly."
                    .to_string()
            }
            Self::TranscriptionAmbiguous => {
                "I couldn't understand the audio. Please speak clearly and try again.".to_string()
            }
            other => format!("Speech recognition service error: {}", other),
        }
    }

    // request URLs never reach callers or logs
    pub(crate) fn service(err: reqwest::Error) -> Self {
        Self::ServiceUnavailable(err.without_url().to_string())
    }

    pub(crate) fn synthesis(err: reqwest::Error) -> Self {
        Self::Synthesis(err.without_url().to_string())
    }
}
