use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::transcribe::Segment;

/// Shape of the transcript, chosen once per invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptMode {
    /// Segment texts concatenated, each followed by a single space
    Plain,
    /// One `[<start>s -> <end>s] <text>` line per group
    Timestamped,
}

impl TranscriptMode {
    pub fn from_timestamps(timestamps: bool) -> Self {
        if timestamps {
            TranscriptMode::Timestamped
        } else {
            TranscriptMode::Plain
        }
    }
}

/// Open timestamp group: start time and accumulated text
#[derive(Debug)]
struct Group {
    start: f64,
    text: String,
}

/// Builds the transcript from segments in arrival order.
///
/// In timestamp mode a group is closed after every segment, so each segment ends up on its
/// own line.
#[derive(Debug)]
pub struct TranscriptAssembler {
    mode: TranscriptMode,
    transcript: String,
    group: Option<Group>,
}

impl TranscriptAssembler {
    pub fn new(mode: TranscriptMode) -> Self {
        Self {
            mode,
            transcript: String::new(),
            group: None,
        }
    }

    pub fn mode(&self) -> TranscriptMode {
        self.mode
    }

    /// Append one segment and return the piece that was added to the transcript
    pub fn push(&mut self, segment: &Segment) -> String {
        let piece = match self.mode {
            TranscriptMode::Plain => format!("{} ", segment.text.trim()),
            TranscriptMode::Timestamped => {
                let group = self.group.get_or_insert_with(|| Group {
                    start: segment.start,
                    text: String::new(),
                });
                group.text.push_str(&segment.text);
                group.text.push(' ');

                let line = format_line(group.start, segment.end, group.text.trim());
                self.group = None;
                format!("{}\n", line)
            }
        };

        self.transcript.push_str(&piece);
        piece
    }

    pub fn finish(self) -> String {
        self.transcript
    }
}

/// `[1.50s -> 3.00s] text`
pub fn format_line(start: f64, end: f64, text: &str) -> String {
    format!("[{:.2}s -> {:.2}s] {}", start, end, text)
}

/// Sink for user-facing progress while a transcript is produced
pub trait Reporter: Send {
    /// A complete status or transcript line
    fn line(&mut self, text: &str);

    /// Transcript text without a line break
    fn fragment(&mut self, text: &str);
}

/// Reporter printing to stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn line(&mut self, text: &str) {
        println!("{}", text);
    }

    fn fragment(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        // Live output is best-effort
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

#[cfg(test)]
impl Reporter for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(format!("{}\n", text));
    }

    fn fragment(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

/// Save the transcript as UTF-8, replacing any existing file
pub fn write_transcript(path: &Path, transcript: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            anyhow::bail!("Output directory does not exist: {}", parent.display());
        }
    }

    fs_err::write(path, transcript).context("Failed to write transcription")?;
    Ok(())
}
