use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::SpeechError;

/// Recognition input format: 16 kHz, mono, 16-bit signed PCM.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
pub const TARGET_CHANNELS: u16 = 1;
pub const TARGET_BITS_PER_SAMPLE: u16 = 16;

pub const DEFAULT_TRANSCODE_TIMEOUT: Duration = Duration::from_secs(30);

fn target_spec() -> WavSpec {
    WavSpec {
        channels: TARGET_CHANNELS,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: TARGET_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// WAV bytes in the recognition format.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAudio {
    pub wav: Vec<u8>,
    pub sample_count: u32,
}

impl NormalizedAudio {
    pub fn sample_rate(&self) -> u32 {
        TARGET_SAMPLE_RATE
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.sample_count) / f64::from(TARGET_SAMPLE_RATE))
    }

    /// Raw little-endian PCM without the RIFF header.
    pub fn pcm(&self) -> Result<Vec<u8>, SpeechError> {
        let mut reader = WavReader::new(Cursor::new(self.wav.as_slice()))
            .map_err(|err| SpeechError::AudioConversion(err.to_string()))?;
        let mut pcm = Vec::with_capacity(self.sample_count as usize * 2);
        for sample in reader.samples::<i16>() {
            let sample = sample.map_err(|err| SpeechError::AudioConversion(err.to_string()))?;
            pcm.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(pcm)
    }
}

/// Converts an uploaded recording (WebM, MP3, OGG, WAV, ...) to
/// [`NormalizedAudio`].
pub trait AudioTranscoder: Send + Sync {
    fn to_wav<'a>(
        &'a self,
        input: &'a [u8],
        format_hint: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NormalizedAudio, SpeechError>>;
}

/// Runs `ffmpeg` over stdin/stdout. Input that is already a WAV in the target
/// format skips the subprocess.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TRANSCODE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn transcode(
        &self,
        input: &[u8],
        format_hint: Option<&str>,
    ) -> Result<NormalizedAudio, SpeechError> {
        if let Some(audio) = passthrough(input) {
            debug!("input already in recognition format");
            return Ok(audio);
        }

        let mut command = Command::new(&self.binary);
        command.args(["-hide_banner", "-loglevel", "error"]);
        if let Some(demuxer) = format_hint.and_then(demuxer_for) {
            command.args(["-f", demuxer]);
        }
        command
            .args(["-i", "pipe:0", "-vn", "-ac", "1", "-ar", "16000"])
            .args(["-f", "s16le", "-acodec", "pcm_s16le", "pipe:1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| {
            SpeechError::AudioConversion(format!(
                "failed to spawn {}: {}",
                self.binary.display(),
                err
            ))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpeechError::AudioConversion("failed to open stdin".to_string()))?;
        let payload = input.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&payload).await;
            drop(stdin);
            result
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                SpeechError::AudioConversion(format!(
                    "transcoder timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| SpeechError::AudioConversion(err.to_string()))?;

        if let Ok(Err(err)) = writer.await {
            // ffmpeg may stop reading early once it has what it needs
            debug!(error = %err, "transcoder closed stdin early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status.code(), stderr = %stderr.trim(), "ffmpeg failed");
            return Err(SpeechError::AudioConversion(stderr.trim().to_string()));
        }

        let samples = output
            .stdout
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        if samples.is_empty() {
            return Err(SpeechError::AudioConversion(
                "transcoder produced no audio".to_string(),
            ));
        }
        encode_wav(&samples)
    }
}

impl AudioTranscoder for FfmpegTranscoder {
    fn to_wav<'a>(
        &'a self,
        input: &'a [u8],
        format_hint: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NormalizedAudio, SpeechError>> {
        Box::pin(self.transcode(input, format_hint))
    }
}

pub fn encode_wav(samples: &[i16]) -> Result<NormalizedAudio, SpeechError> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, target_spec())
            .map_err(|err| SpeechError::AudioConversion(err.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|err| SpeechError::AudioConversion(err.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|err| SpeechError::AudioConversion(err.to_string()))?;
    }

    Ok(NormalizedAudio {
        wav: cursor.into_inner(),
        sample_count: samples.len() as u32,
    })
}

fn passthrough(input: &[u8]) -> Option<NormalizedAudio> {
    let reader = WavReader::new(Cursor::new(input)).ok()?;
    if reader.spec() != target_spec() || reader.len() == 0 {
        return None;
    }
    Some(NormalizedAudio {
        wav: input.to_vec(),
        sample_count: reader.len(),
    })
}

/// ffmpeg demuxer for a file extension. Unknown extensions let ffmpeg probe.
fn demuxer_for(extension: &str) -> Option<&'static str> {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "webm" | "mkv" => Some("matroska"),
        "mp3" => Some("mp3"),
        "wav" | "wave" => Some("wav"),
        "ogg" | "oga" | "opus" => Some("ogg"),
        "flac" => Some("flac"),
        _ => None,
    }
}
