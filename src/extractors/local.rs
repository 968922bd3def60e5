use std::path::Path;

use super::AcquiredAudio;
use crate::{QuillError, Result};

/// Local input: validated and used as-is, never copied or deleted
pub struct LocalFileExtractor;

impl LocalFileExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Check that the file exists, is a regular file and is not empty
    pub async fn validate_file(&self, path: &Path) -> Result<()> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QuillError::InputNotFound(path.display().to_string()).into());
            }
            Err(e) => {
                return Err(QuillError::InvalidInput(format!(
                    "cannot access {}: {}",
                    path.display(),
                    e
                ))
                .into());
            }
        };

        if !metadata.is_file() {
            return Err(QuillError::InvalidInput(format!("{} is not a file", path.display())).into());
        }

        if metadata.len() == 0 {
            return Err(QuillError::InvalidInput(format!("{} is empty", path.display())).into());
        }

        Ok(())
    }

    pub async fn acquire(&self, path: &Path) -> Result<AcquiredAudio> {
        self.validate_file(path).await?;

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());

        Ok(AcquiredAudio {
            path: path.to_path_buf(),
            title,
            temporary: false,
        })
    }
}

impl Default for LocalFileExtractor {
    fn default() -> Self {
        Self::new()
    }
}
