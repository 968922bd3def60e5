use anyhow::Context;
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::utils::{download_to_file, format_file_size};
use crate::{QuillError, Result};

/// Where whisper.cpp publishes its ggml models
pub const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Model sizes that can be downloaded by name
pub const KNOWN_MODELS: &[&str] = &[
    "tiny",
    "tiny.en",
    "base",
    "base.en",
    "small",
    "small.en",
    "medium",
    "medium.en",
    "large-v1",
    "large-v2",
    "large-v3",
    "large-v3-turbo",
];

/// Short names accepted in place of a model size
pub const MODEL_ALIASES: &[(&str, &str)] = &[("large", "large-v3")];

/// Canonical ggml name of a model size or alias
pub fn canonical_name(size: &str) -> Option<&'static str> {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == size)
        .map(|(_, target)| *target)
        .or_else(|| KNOWN_MODELS.iter().copied().find(|known| *known == size))
}

/// Alias that resolves to `size`, if any
pub fn alias_for(size: &str) -> Option<&'static str> {
    MODEL_ALIASES
        .iter()
        .find(|(_, target)| *target == size)
        .map(|(alias, _)| *alias)
}

/// File name of a model size in the cache and on the model hub
pub fn model_file_name(size: &str) -> Option<String> {
    canonical_name(size).map(|name| format!("ggml-{}.bin", name))
}

/// Resolves model selectors to ggml files, downloading them into a cache directory once
pub struct ModelResolver {
    models_dir: PathBuf,
    client: Client,
    show_progress: bool,
}

impl ModelResolver {
    pub fn new(models_dir: PathBuf, show_progress: bool) -> Self {
        Self {
            models_dir,
            client: Client::new(),
            show_progress,
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Cached location of a known model size, whether or not it has been downloaded
    pub fn cached_path(&self, size: &str) -> Option<PathBuf> {
        model_file_name(size).map(|name| self.models_dir.join(name))
    }

    /// Resolve a model selector: an existing file path, a cached model, or a download
    pub async fn resolve(&self, model: &str) -> Result<PathBuf> {
        let explicit = Path::new(model);
        if explicit.is_file() {
            tracing::debug!("Using model file {}", explicit.display());
            return Ok(explicit.to_path_buf());
        }

        let cached = self
            .cached_path(model)
            .ok_or_else(|| QuillError::UnknownModel(model.to_string()))?;
        if cached.is_file() {
            tracing::debug!("Using cached model {}", cached.display());
            return Ok(cached);
        }

        self.download(model, &cached).await?;
        Ok(cached)
    }

    async fn download(&self, model: &str, dest: &Path) -> Result<()> {
        let file_name = model_file_name(model).ok_or_else(|| QuillError::UnknownModel(model.to_string()))?;
        let url = format!("{}/{}", MODEL_BASE_URL, file_name);

        fs_err::create_dir_all(&self.models_dir).context("Failed to create model cache directory")?;

        println!("Downloading model '{}'...", model);
        tracing::info!("Downloading {} to {}", url, dest.display());

        // Written to a side file first so an interrupted download never looks cached
        let partial = dest.with_extension("part");
        let message = format!("ggml-{}", canonical_name(model).unwrap_or(model));
        let result = download_to_file(&self.client, &url, &partial, &message, self.show_progress).await;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs_err::remove_file(&partial);
                return Err(e.context(format!("Failed to download model '{}'", model)));
            }
        };

        fs_err::rename(&partial, dest)?;
        tracing::info!("Model '{}' cached ({})", model, format_file_size(bytes));
        Ok(())
    }

    /// Known model sizes with their cached size on disk, if downloaded
    pub fn list(&self) -> Vec<(&'static str, Option<u64>)> {
        KNOWN_MODELS
            .iter()
            .map(|size| {
                let cached = self
                    .cached_path(size)
                    .and_then(|path| fs_err::metadata(path).ok())
                    .filter(|metadata| metadata.is_file())
                    .map(|metadata| metadata.len());
                (*size, cached)
            })
            .collect()
    }
}
