use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{is_youtube_url, AcquiredAudio, MediaExtractor};
use crate::utils::spinner;
use crate::{QuillError, Result};

/// Extension yt-dlp appends after converting the audio stream
pub const WAV_EXTENSION: &str = "wav";

/// YouTube audio extractor using yt-dlp
pub struct YoutubeExtractor {
    yt_dlp_path: String,
    show_progress: bool,
}

impl YoutubeExtractor {
    pub fn new(show_progress: bool) -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            show_progress,
        }
    }

    /// Path yt-dlp writes to once the audio has been converted to WAV
    pub fn output_path(stem: &Path) -> PathBuf {
        with_suffix(stem, WAV_EXTENSION)
    }

    /// Side file yt-dlp streams into before renaming it to the stem
    pub fn partial_path(stem: &Path) -> PathBuf {
        with_suffix(stem, "part")
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str) -> Result<Value> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| QuillError::YoutubeDownload(format!("could not run yt-dlp: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(QuillError::YoutubeDownload(error.trim().to_string()).into());
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| QuillError::YoutubeDownload(format!("unreadable video info: {e}")))?;

        Ok(info)
    }

    /// Download the best audio stream and convert it to WAV at `<stem>.wav`
    async fn download_audio(&self, url: &str, stem: &Path) -> Result<PathBuf> {
        tracing::debug!("Downloading audio for {} to {}", url, stem.display());

        let output = Command::new(&self.yt_dlp_path)
            .arg("--output")
            .arg(stem)
            .args([
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                WAV_EXTENSION,
                "--no-playlist",
                "--no-part",
                "--quiet",
                "--no-warnings",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| QuillError::YoutubeDownload(format!("could not run yt-dlp: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(QuillError::YoutubeDownload(error.trim().to_string()).into());
        }

        let path = Self::output_path(stem);
        if !path.exists() {
            return Err(QuillError::YoutubeDownload(format!(
                "yt-dlp did not produce {}",
                path.display()
            ))
            .into());
        }

        Ok(path)
    }
}

fn with_suffix(stem: &Path, extension: &str) -> PathBuf {
    let mut path = stem.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

#[async_trait]
impl MediaExtractor for YoutubeExtractor {
    fn supports_url(&self, url: &str) -> bool {
        is_youtube_url(url)
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }

    async fn fetch(&self, url: &str, stem: &Path) -> Result<AcquiredAudio> {
        println!("Detected YouTube URL. Downloading audio...");
        let progress = spinner(self.show_progress, "Downloading audio with yt-dlp...");

        let result = async {
            let info = self.get_video_info(url).await?;
            let title = info["title"].as_str().unwrap_or("video").to_string();
            progress.set_message(format!("Downloading \"{}\"...", title));

            let path = self.download_audio(url, stem).await?;
            Ok::<_, anyhow::Error>(AcquiredAudio {
                path,
                title: Some(title),
                temporary: true,
            })
        }
        .await;

        match &result {
            Ok(_) => progress.finish_with_message("Download complete"),
            Err(_) => progress.abandon_with_message("Download failed"),
        }
        result
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}
