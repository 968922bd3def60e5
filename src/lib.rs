//! Quill - A Rust CLI tool for transcribing audio from local files and URLs
//!
//! This library resolves an input (local file, direct audio URL or YouTube link) to a
//! local audio file, runs it through whisper.cpp and writes the transcript to disk,
//! optionally annotated with timestamps.

pub mod audio;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod lifecycle;
pub mod output;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, Device};
pub use config::Config;
pub use extractors::{is_url, is_youtube_url, AcquiredAudio, InputSource, MediaExtractor};
pub use lifecycle::{Cancellation, TempAudio};
pub use output::{TranscriptAssembler, TranscriptMode};
pub use transcribe::{
    Outcome, Segment, SpeechEngine, TranscriptionConfig, TranscriptionInfo, TranscriptionPipeline,
};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to quill
#[derive(thiserror::Error, Debug)]
pub enum QuillError {
    #[error("Failed to download YouTube audio: {0}")]
    YoutubeDownload(String),

    #[error("Failed to download file: {0}")]
    Download(String),

    #[error("Input file does not exist: {0}")]
    InputNotFound(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("Unknown model size '{0}' (run `quill models` to list the available sizes)")]
    UnknownModel(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio decoding failed: {0}")]
    AudioDecode(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
}
