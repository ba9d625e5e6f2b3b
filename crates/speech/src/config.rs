use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::transcode::DEFAULT_TRANSCODE_TIMEOUT;

const PLACEHOLDER_KEY: &str = "YOUR_GOOGLE_SPEECH_API_KEY";

#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub google_api_key: Option<String>,
    pub language: String,
    pub ffmpeg_bin: PathBuf,
    pub transcode_timeout: Duration,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            google_api_key: None,
            language: "en-US".to_string(),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            transcode_timeout: DEFAULT_TRANSCODE_TIMEOUT,
        }
    }
}

impl SpeechSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            google_api_key: env::var("GENIE_GOOGLE_SPEECH_API_KEY")
                .ok()
                .and_then(|value| usable_key(&value)),
            language: env::var("GENIE_SPEECH_LANGUAGE")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.language),
            ffmpeg_bin: env::var("GENIE_FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_bin),
            transcode_timeout: defaults.transcode_timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.google_api_key.is_some()
    }
}

fn usable_key(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == PLACEHOLDER_KEY {
        None
    } else {
        Some(value.to_string())
    }
}
