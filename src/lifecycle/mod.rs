use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::extractors::youtube::YoutubeExtractor;

/// Prefix of every temporary audio artifact
pub const TEMP_AUDIO_PREFIX: &str = "temp_audio_file";

/// Temporary audio artifact of one invocation.
///
/// The stem is unique per invocation (`temp_audio_file_<pid>_<id>`). Downloads are written
/// at the stem itself or at `<stem>.wav`, with `<stem>.part` left behind by an interrupted
/// yt-dlp; all of them are removed on cleanup, which happens at most once and never fails.
/// Dropping the guard cleans up as well.
#[derive(Debug)]
pub struct TempAudio {
    stem: PathBuf,
    armed: bool,
    cleaned: bool,
}

impl TempAudio {
    pub fn new(dir: &Path) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}_{}_{}", TEMP_AUDIO_PREFIX, std::process::id(), &id[..8]);
        Self {
            stem: dir.join(name),
            armed: false,
            cleaned: false,
        }
    }

    pub fn stem(&self) -> &Path {
        &self.stem
    }

    /// Every path a download may leave behind
    pub fn artifacts(&self) -> [PathBuf; 3] {
        [
            self.stem.clone(),
            YoutubeExtractor::partial_path(&self.stem),
            YoutubeExtractor::output_path(&self.stem),
        ]
    }

    /// Mark that acquisition is about to create an artifact
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Remove the artifacts, if any were created. Idempotent and best-effort.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        if !self.armed {
            return;
        }

        for path in self.artifacts() {
            if !path.exists() {
                continue;
            }
            match fs_err::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed temporary file {}", path.display()),
                Err(e) => tracing::debug!("Could not remove temporary file: {}", e),
            }
        }
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Shared flag raised when the user interrupts the invocation
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stems_are_unique() {
        let tmp = TempDir::new().unwrap();
        let a = TempAudio::new(tmp.path());
        let b = TempAudio::new(tmp.path());
        assert_ne!(a.stem(), b.stem());
        let name = a.stem().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("temp_audio_file_"));
    }

    #[test]
    fn test_cleanup_removes_every_artifact() {
        let tmp = TempDir::new().unwrap();
        let mut temp = TempAudio::new(tmp.path());
        temp.arm();
        let [raw, part, wav] = temp.artifacts();
        fs_err::write(&raw, b"partial").unwrap();
        fs_err::write(&part, b"partial").unwrap();
        fs_err::write(&wav, b"RIFF").unwrap();

        temp.cleanup();
        assert!(!raw.exists());
        assert!(!part.exists());
        assert!(!wav.exists());

        // Second run is a no-op even if something reappears
        fs_err::write(&raw, b"again").unwrap();
        temp.cleanup();
        assert!(raw.exists());
    }

    #[test]
    fn test_cleanup_with_missing_files_is_silent() {
        let tmp = TempDir::new().unwrap();
        let mut temp = TempAudio::new(tmp.path());
        temp.arm();
        temp.cleanup();
        assert_eq!(fs_err::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unarmed_guard_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let temp = TempAudio::new(tmp.path());
        let [raw, _, _] = temp.artifacts();
        fs_err::write(&raw, b"not ours").unwrap();

        drop(temp);
        assert!(raw.exists());
    }

    #[test]
    fn test_drop_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let wav = {
            let mut temp = TempAudio::new(tmp.path());
            temp.arm();
            let [_, _, wav] = temp.artifacts();
            fs_err::write(&wav, b"RIFF").unwrap();
            wav
        };
        assert!(!wav.exists());
    }

    #[test]
    fn test_cancellation_is_shared() {
        let cancel = Cancellation::new();
        let observer = cancel.clone();
        assert!(!observer.is_cancelled());
        cancel.cancel();
        assert!(observer.is_cancelled());
    }
}
