use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::Device;
use crate::config::Config;
use crate::extractors::local::LocalFileExtractor;
use crate::extractors::{AcquiredAudio, ExtractorRegistry, InputSource};
use crate::lifecycle::{Cancellation, TempAudio};
use crate::output::{self, ConsoleReporter, Reporter, TranscriptAssembler, TranscriptMode};
use crate::utils::status_spinner;

pub mod model;
pub mod whisper;

use model::ModelResolver;
use whisper::WhisperEngine;

/// Beam width used for every decode
pub const BEAM_SIZE: usize = 5;

/// One timed span of recognized speech
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Segment text as produced by the engine
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Summary reported by the engine before segments are read
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionInfo {
    /// Audio duration in seconds
    pub duration: f64,

    /// Language code used for decoding
    pub language: String,

    /// Confidence of the language detection (1.0 when the language was forced)
    pub language_probability: f32,
}

/// Settings of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionConfig {
    /// Model size or path to a ggml model file
    pub model: String,
    pub device: Device,
    /// Forced language code, auto-detected when `None`
    pub language: Option<String>,
    pub timestamps: bool,
    pub beam_size: usize,
}

impl TranscriptionConfig {
    /// Merge command-line values over the configuration file
    pub fn resolve(
        config: &Config,
        model: Option<String>,
        device: Option<Device>,
        language: Option<String>,
        timestamps: Option<bool>,
    ) -> Self {
        let defaults = &config.transcription;
        Self {
            model: model.unwrap_or_else(|| defaults.model.clone()),
            device: device.unwrap_or(defaults.device),
            language: language
                .or_else(|| defaults.language.clone())
                .filter(|lang| !lang.trim().is_empty()),
            timestamps: timestamps.unwrap_or(defaults.timestamps),
            beam_size: BEAM_SIZE,
        }
    }

    pub fn mode(&self) -> TranscriptMode {
        TranscriptMode::from_timestamps(self.timestamps)
    }
}

/// Forward-only stream of segments, read one at a time
pub type SegmentStream = Box<dyn Iterator<Item = Result<Segment>> + Send>;

/// Speech-to-text engine
#[cfg_attr(test, mockall::automock)]
pub trait SpeechEngine: Send {
    /// Start transcribing `audio`, returning the lazy segment stream and summary info.
    ///
    /// The stream stops early once `cancel` is raised.
    fn transcribe(
        &self,
        audio: &Path,
        config: &TranscriptionConfig,
        cancel: &Cancellation,
    ) -> Result<(SegmentStream, TranscriptionInfo)>;
}

/// Run an engine over `audio` and assemble the transcript.
///
/// Every segment is reported as soon as it arrives. Returns `None` when the cancellation flag
/// is raised before the stream is exhausted.
pub fn transcribe_with<E: SpeechEngine + ?Sized>(
    engine: &E,
    audio: &Path,
    config: &TranscriptionConfig,
    cancel: &Cancellation,
    reporter: &mut dyn Reporter,
) -> Result<Option<String>> {
    reporter.line("Transcribing audio...");
    let (segments, info) = engine.transcribe(audio, config, cancel)?;

    reporter.line(&format!("Duration: {:.2} seconds", info.duration));
    if config.language.is_none() {
        reporter.line(&format!(
            "Detected language '{}' with probability {:.2}",
            info.language, info.language_probability
        ));
    }

    let mut assembler = TranscriptAssembler::new(config.mode());
    for segment in segments {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let segment = segment?;
        let piece = assembler.push(&segment);
        match assembler.mode() {
            TranscriptMode::Plain => reporter.fragment(&piece),
            TranscriptMode::Timestamped => reporter.line(piece.trim_end_matches('\n')),
        }
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }

    Ok(Some(assembler.finish()))
}

/// How an invocation ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed {
        output: PathBuf,
        title: Option<String>,
    },
    Cancelled,
}

/// One transcription request
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    /// Local path or URL
    pub input: String,
    pub output: PathBuf,
    pub config: TranscriptionConfig,
}

/// Main transcription pipeline
pub struct TranscriptionPipeline {
    extractor_registry: ExtractorRegistry,
    local_extractor: LocalFileExtractor,
    models: ModelResolver,
    show_progress: bool,
}

impl TranscriptionPipeline {
    /// Create a new transcription pipeline
    pub fn new(config: &Config, show_progress: bool) -> Result<Self> {
        Ok(Self {
            extractor_registry: ExtractorRegistry::new(show_progress),
            local_extractor: LocalFileExtractor::new(),
            models: ModelResolver::new(config.models_dir()?, show_progress),
            show_progress,
        })
    }

    /// Resolve the input to a local audio file.
    ///
    /// URLs are downloaded under the temporary stem, which is armed first so that partial
    /// downloads are removed too. Local files are only validated.
    pub async fn acquire(&self, input: &str, temp: &mut TempAudio) -> Result<AcquiredAudio> {
        match InputSource::classify(input) {
            InputSource::Local(path) => self.local_extractor.acquire(&path).await,
            InputSource::Url(url) => {
                temp.arm();
                self.extractor_registry.fetch(&url, temp.stem()).await
            }
        }
    }

    /// Run a full request: acquisition, model resolution, transcription and file write
    pub async fn run(
        &self,
        request: &TranscribeRequest,
        temp: &mut TempAudio,
        cancel: &Cancellation,
    ) -> Result<Outcome> {
        tracing::info!("Starting transcription for: {}", request.input);

        let audio = self.acquire(&request.input, temp).await?;
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let model_path = self.models.resolve(&request.config.model).await?;
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let audio_path = audio.path.clone();
        let config = request.config.clone();
        let blocking_cancel = cancel.clone();
        let show_progress = self.show_progress;

        let transcript = tokio::task::spawn_blocking(move || -> Result<Option<String>> {
            let progress = status_spinner(show_progress, "Loading model...");
            let engine = WhisperEngine::load(&model_path, config.device);
            progress.finish_and_clear();

            let engine = engine?;
            if blocking_cancel.is_cancelled() {
                return Ok(None);
            }

            transcribe_with(
                &engine,
                &audio_path,
                &config,
                &blocking_cancel,
                &mut ConsoleReporter,
            )
        })
        .await
        .context("Transcription task failed")??;

        let Some(transcript) = transcript else {
            return Ok(Outcome::Cancelled);
        };
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        output::write_transcript(&request.output, &transcript)?;
        tracing::info!(
            "Wrote {} characters to {}",
            transcript.chars().count(),
            request.output.display()
        );

        Ok(Outcome::Completed {
            output: request.output.clone(),
            title: audio.title,
        })
    }
}
