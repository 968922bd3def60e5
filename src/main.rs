use anyhow::Result;
use clap::Parser;
use console::style;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill::cli::{timestamps_flag, Cli, Commands};
use quill::config::Config;
use quill::extractors::ExtractorRegistry;
use quill::lifecycle::{Cancellation, TempAudio};
use quill::transcribe::model::{alias_for, ModelResolver};
use quill::transcribe::{Outcome, TranscribeRequest, TranscriptionConfig, TranscriptionPipeline};
use quill::utils;

/// Exit status after a user interrupt (128 + SIGINT)
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for user-facing output
    let default_filter = if cli.verbose { "quill=debug" } else { "quill=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load().await?;
    let show_progress = !cli.quiet;

    match cli.command {
        Commands::Transcribe {
            input_source,
            output_file,
            model,
            device,
            language,
            timestamps,
            no_timestamps,
        } => {
            let timestamps = timestamps_flag(timestamps, no_timestamps);
            let request = TranscribeRequest {
                input: input_source,
                output: output_file.unwrap_or_else(|| config.app.default_output.clone()),
                config: TranscriptionConfig::resolve(&config, model, device, language, timestamps),
            };
            return transcribe(&config, request, show_progress).await;
        }
        Commands::Config { show, init } => {
            if show {
                config.display();
            } else if init {
                let path = Config::config_path()?;
                if path.exists() {
                    println!("Configuration already exists at: {}", path.display());
                } else {
                    let path = Config::default().save().await?;
                    println!("Configuration written to: {}", path.display());
                }
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Use --show to print it or --init to create it with defaults.");
            }
        }
        Commands::Models => {
            let resolver = ModelResolver::new(config.models_dir()?, false);
            println!("Available models (cached in {}):", resolver.models_dir().display());
            for (size, cached) in resolver.list() {
                let label = match alias_for(size) {
                    Some(alias) => format!("{} ({})", size, alias),
                    None => size.to_string(),
                };
                match cached {
                    Some(bytes) => println!("  • {:<24} {}", label, utils::format_file_size(bytes)),
                    None => println!("  • {:<24} not downloaded", label),
                }
            }
        }
        Commands::Platforms => {
            println!("Supported input sources:");
            for platform in ExtractorRegistry::new(false).list_platforms() {
                match platform {
                    "YouTube" => println!("  • YouTube (watch, youtu.be, embed, v/ and shorts links)"),
                    "Direct URL" => println!("  • Direct audio URLs (http:// and https://)"),
                    other => println!("  • {}", other),
                }
            }
            println!("  • Local audio files (anything ffmpeg can decode)");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn transcribe(config: &Config, request: TranscribeRequest, show_progress: bool) -> Result<ExitCode> {
    // Check for required external tools (non-fatal)
    let missing_deps = utils::check_dependencies().await;
    for dep in missing_deps {
        tracing::warn!("Missing dependency: {}", dep);
    }

    let pipeline = TranscriptionPipeline::new(config, show_progress)?;
    let cancel = Cancellation::new();
    let mut temp = TempAudio::new(&config.temp_dir());

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    // An interrupt wins over a pipeline error caused by the same signal
    let outcome = tokio::select! {
        biased;
        _ = interrupted => {
            cancel.cancel();
            Ok(Outcome::Cancelled)
        }
        result = pipeline.run(&request, &mut temp, &cancel) => result,
    };

    if matches!(outcome, Ok(Outcome::Cancelled)) {
        eprintln!(
            "\n{}",
            style("Transcription cancelled by user. Cleaning up...").yellow()
        );
    }

    // Runs exactly once, whatever the outcome
    temp.cleanup();

    match outcome? {
        Outcome::Completed { output, title } => {
            if let Some(title) = title {
                tracing::info!("Transcribed \"{}\"", title);
            }
            println!(
                "\n{} {}",
                style("Transcription saved to:").green().bold(),
                output.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Cancelled => {
            eprintln!("{}", style("Aborted!").red());
            // A decode may still be running on a blocking thread; don't wait for it
            let _ = std::io::stdout().flush();
            std::process::exit(EXIT_CANCELLED)
        }
    }
}
