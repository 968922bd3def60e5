use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

pub mod direct;
pub mod local;
pub mod youtube;

use crate::Result;

/// Link shapes that need yt-dlp instead of a plain HTTP fetch
static YOUTUBE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^https?://(?:www\.)?youtube\.com/watch\?v=[\w-]+",
        r"^https?://(?:www\.)?youtube\.com/v/[\w-]+",
        r"^https?://(?:www\.)?youtube\.com/shorts/[\w-]+",
        r"^https?://(?:www\.)?youtube\.com/embed/[\w-]+",
        r"^https?://(?:www\.)?youtu\.be/[\w-]+",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Check if a string is an HTTP(S) URL. Purely syntactic.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Check if the URL is a YouTube watch, short, embed or shorts link
pub fn is_youtube_url(input: &str) -> bool {
    YOUTUBE_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}

/// Where the audio of an invocation comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Local(PathBuf),
    Url(String),
}

impl InputSource {
    pub fn classify(input: &str) -> Self {
        if is_url(input) {
            InputSource::Url(input.to_string())
        } else {
            InputSource::Local(PathBuf::from(input))
        }
    }
}

/// Local audio ready for transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredAudio {
    /// Path of the audio file
    pub path: PathBuf,

    /// Title of the media, when the source provides one
    pub title: Option<String>,

    /// Whether the file was downloaded by this invocation and must be cleaned up
    pub temporary: bool,
}

/// Trait for fetching audio from remote sources
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Check if this extractor supports the given URL
    fn supports_url(&self, url: &str) -> bool;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;

    /// Download the audio behind `url`, writing it at (or next to) `stem`
    async fn fetch(&self, url: &str, stem: &Path) -> Result<AcquiredAudio>;
}

/// Registry for managing remote extractors, checked in registration order
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn MediaExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new registry with default extractors
    pub fn new(show_progress: bool) -> Self {
        let mut registry = Self {
            extractors: Vec::new(),
        };

        // YouTube must come before the catch-all direct extractor
        registry.register(Box::new(youtube::YoutubeExtractor::new(show_progress)));
        registry.register(Box::new(direct::DirectExtractor::new(show_progress)));

        registry
    }

    /// Register a new extractor
    pub fn register(&mut self, extractor: Box<dyn MediaExtractor>) {
        self.extractors.push(extractor);
    }

    /// Find an extractor that supports the given URL
    pub fn find_extractor(&self, url: &str) -> Option<&dyn MediaExtractor> {
        self.extractors
            .iter()
            .find(|extractor| extractor.supports_url(url))
            .map(|boxed| boxed.as_ref())
    }

    /// List all supported platforms
    pub fn list_platforms(&self) -> Vec<&'static str> {
        self.extractors
            .iter()
            .map(|extractor| extractor.platform_name())
            .collect()
    }

    /// Download the audio for a URL using the appropriate extractor
    pub async fn fetch(&self, url: &str, stem: &Path) -> Result<AcquiredAudio> {
        let extractor = self
            .find_extractor(url)
            .ok_or_else(|| anyhow::anyhow!("No extractor found for URL: {}", url))?;

        tracing::info!("Fetching {} audio from {}", extractor.platform_name(), url);
        extractor.fetch(url, stem).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}
