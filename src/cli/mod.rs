use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quill",
    about = "Quill - Transcribe audio from local files, URLs and YouTube videos using Whisper",
    version,
    long_about = "A CLI tool for transcribing audio from local files, direct audio URLs and YouTube videos. Runs Whisper locally through whisper.cpp and writes the transcript to a text file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Timestamp choice from the `--timestamps` / `--no-timestamps` pair; `None` defers to the config file
pub fn timestamps_flag(timestamps: bool, no_timestamps: bool) -> Option<bool> {
    match (timestamps, no_timestamps) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe audio from a file or URL to text
    Transcribe {
        /// Path to local audio file or URL to audio file (including YouTube URLs)
        #[arg(value_name = "INPUT_SOURCE")]
        input_source: String,

        /// Path where the transcription will be saved [default: transcription.txt]
        #[arg(value_name = "OUTPUT_FILE")]
        output_file: Option<PathBuf>,

        /// Model size to use (tiny, base, small, medium, large) or a path to a ggml model file [default: medium]
        #[arg(short, long, env = "QUILL_MODEL", value_name = "SIZE")]
        model: Option<String>,

        /// Device to use for inference [default: auto]
        #[arg(short, long, value_enum, env = "QUILL_DEVICE")]
        device: Option<Device>,

        /// Language code for transcription (e.g., en, fr, de). Default: auto-detect
        #[arg(short, long, env = "QUILL_LANGUAGE", value_name = "LANG")]
        language: Option<String>,

        /// Include timestamps in the transcription output
        #[arg(short, long, overrides_with = "no_timestamps")]
        timestamps: bool,

        /// Leave timestamps out even when the config file turns them on
        #[arg(long, overrides_with = "timestamps")]
        no_timestamps: bool,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file if none exists
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },

    /// List the available Whisper model sizes
    Models,

    /// List supported input sources
    Platforms,
}

/// Compute device used by the speech engine
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// GPU when the build has a GPU backend, CPU otherwise
    #[default]
    Auto,
    /// CPU only
    Cpu,
    /// NVIDIA GPU (requires the `cuda` build feature)
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Auto => write!(f, "auto"),
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transcribe_defaults() {
        let cli = Cli::try_parse_from(["quill", "transcribe", "talk.mp3"]).unwrap();
        match cli.command {
            Commands::Transcribe {
                input_source,
                output_file,
                timestamps,
                ..
            } => {
                assert_eq!(input_source, "talk.mp3");
                assert!(output_file.is_none());
                assert!(!timestamps);
            }
            _ => panic!("expected transcribe command"),
        }
    }

    #[test]
    fn test_transcribe_short_flags() {
        let cli = Cli::try_parse_from([
            "quill", "transcribe", "talk.mp3", "out.txt", "-m", "small", "-d", "cpu", "-l", "fr", "-t",
        ])
        .unwrap();
        match cli.command {
            Commands::Transcribe {
                output_file,
                model,
                device,
                language,
                timestamps,
                ..
            } => {
                assert_eq!(output_file, Some(PathBuf::from("out.txt")));
                assert_eq!(model.as_deref(), Some("small"));
                assert_eq!(device, Some(Device::Cpu));
                assert_eq!(language.as_deref(), Some("fr"));
                assert!(timestamps);
            }
            _ => panic!("expected transcribe command"),
        }
    }

    #[test]
    fn test_last_timestamp_flag_wins() {
        let flags = |args: &[&str]| {
            let cli = Cli::try_parse_from(args).unwrap();
            match cli.command {
                Commands::Transcribe {
                    timestamps,
                    no_timestamps,
                    ..
                } => timestamps_flag(timestamps, no_timestamps),
                _ => panic!("expected transcribe command"),
            }
        };

        assert_eq!(flags(&["quill", "transcribe", "a.wav"]), None);
        assert_eq!(flags(&["quill", "transcribe", "a.wav", "-t"]), Some(true));
        assert_eq!(flags(&["quill", "transcribe", "a.wav", "--no-timestamps"]), Some(false));
        assert_eq!(flags(&["quill", "transcribe", "a.wav", "-t", "--no-timestamps"]), Some(false));
        assert_eq!(flags(&["quill", "transcribe", "a.wav", "--no-timestamps", "-t"]), Some(true));
    }

    #[test]
    fn test_rejects_unknown_device() {
        assert!(Cli::try_parse_from(["quill", "transcribe", "a.wav", "-d", "tpu"]).is_err());
    }
}
