use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use url::Url;

use super::{is_url, AcquiredAudio, MediaExtractor};
use crate::utils::{download_to_file, extract_domain, format_file_size};
use crate::{QuillError, Result};

/// Direct URL extractor: fetches the resource byte-for-byte
pub struct DirectExtractor {
    client: Client,
    show_progress: bool,
}

impl DirectExtractor {
    pub fn new(show_progress: bool) -> Self {
        Self {
            client: Client::new(),
            show_progress,
        }
    }

    /// Human-readable title from the last path segment of the URL
    pub fn title_from_url(url: &str) -> Option<String> {
        let parsed_url = Url::parse(url).ok()?;
        let filename = parsed_url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|filename| !filename.is_empty())?;

        // Remove extension and decode URL encoding
        let name = match filename.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => &filename[..dot_pos],
            _ => filename,
        };
        let title = urlencoding::decode(name)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| name.to_string())
            .replace(['_', '-'], " ");

        Some(title.trim().to_string()).filter(|title| !title.is_empty())
    }
}

#[async_trait]
impl MediaExtractor for DirectExtractor {
    fn supports_url(&self, url: &str) -> bool {
        is_url(url)
    }

    fn platform_name(&self) -> &'static str {
        "Direct URL"
    }

    async fn fetch(&self, url: &str, stem: &Path) -> Result<AcquiredAudio> {
        let message = match extract_domain(url) {
            Some(domain) => format!("Downloading audio from {}...", domain),
            None => "Downloading audio...".to_string(),
        };

        let bytes = download_to_file(&self.client, url, stem, &message, self.show_progress)
            .await
            .map_err(|e| QuillError::Download(format!("{e:#}")))?;

        tracing::info!("Downloaded {} to {}", format_file_size(bytes), stem.display());

        Ok(AcquiredAudio {
            path: stem.to_path_buf(),
            title: Self::title_from_url(url),
            temporary: true,
        })
    }
}

impl Default for DirectExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}
