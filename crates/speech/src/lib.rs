mod config;
mod error;
mod service;
mod stt;
mod transcode;
mod tts;

pub use config::SpeechSettings;
pub use error::SpeechError;
pub use service::{VoicePipeline, MAX_AUDIO_BYTES, SUSPICIOUS_AUDIO_BYTES};
pub use stt::{GoogleSpeechRecognizer, SpeechRecognizer};
pub use transcode::{encode_wav, AudioTranscoder, FfmpegTranscoder, NormalizedAudio};
pub use tts::{GoogleSpeechSynthesizer, SpeechSynthesizer};
