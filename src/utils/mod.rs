use anyhow::Result;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use url::Url;

/// Spinner for an indeterminate blocking phase, hidden when progress is disabled
pub fn spinner(show_progress: bool, message: &str) -> ProgressBar {
    if !show_progress {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.enable_steady_tick(std::time::Duration::from_millis(120));
    progress.set_message(message.to_string());
    progress
}

/// Spinner for a status phase; the status is printed as a plain line when progress is disabled
pub fn status_spinner(show_progress: bool, message: &str) -> ProgressBar {
    if !show_progress {
        println!("{}", message);
    }
    spinner(show_progress, message)
}

/// Byte progress bar for a download of (possibly unknown) length
fn download_bar(show_progress: bool, message: &str) -> ProgressBar {
    if !show_progress {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
    {
        progress.set_style(style.progress_chars("#>-"));
    }
    progress.set_message(message.to_string());
    progress
}

/// Stream the body of a single GET request into `dest`.
///
/// Fails on transport errors and non-success statuses. There is no retry and no resume;
/// whatever was written before a failure is left for the caller to clean up.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    message: &str,
    show_progress: bool,
) -> Result<u64> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    let progress = download_bar(show_progress, message);
    progress.set_length(response.content_length().unwrap_or(0));

    let mut file = fs_err::File::create(dest)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                progress.abandon_with_message("Download failed");
                return Err(e.into());
            }
        };
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress.set_position(downloaded);
    }
    file.flush()?;

    progress.finish_with_message("Download complete");
    tracing::debug!("Downloaded {} bytes from {} to {}", downloaded, url, dest.display());

    Ok(downloaded)
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|host| {
        // Remove 'www.' prefix if present
        host.strip_prefix("www.").unwrap_or(host).to_string()
    })
}

/// Check if the current environment has the external tools quill drives
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp", "--version").await {
        missing.push("yt-dlp - required for YouTube downloads".to_string());
    }

    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for YouTube downloads and non-WAV audio".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
