//! Audio decoding for the speech engine.
//!
//! Whisper consumes 16 kHz mono `f32` samples. Canonical WAV files (16 kHz, mono, 16-bit PCM)
//! are read directly; anything else is decoded and resampled by `ffmpeg`.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::{QuillError, Result};

/// Sample rate expected by Whisper
pub const SAMPLE_RATE: u32 = 16_000;

/// Load an audio file as 16 kHz mono samples in `[-1.0, 1.0]`
pub fn load_samples(path: &Path) -> Result<Vec<f32>> {
    let samples = match read_canonical_wav(path) {
        Some(samples) => samples?,
        None => decode_with_ffmpeg(path)?,
    };

    if samples.is_empty() {
        return Err(QuillError::AudioDecode(format!("{} contains no audio", path.display())).into());
    }

    tracing::debug!(
        "Loaded {} samples ({:.2}s) from {}",
        samples.len(),
        samples.len() as f64 / SAMPLE_RATE as f64,
        path.display()
    );
    Ok(samples)
}

/// Read the file with hound when it is already in Whisper's format.
///
/// Returns `None` when the file is not a WAV in that exact format, so the caller can fall
/// back to ffmpeg.
fn read_canonical_wav(path: &Path) -> Option<Result<Vec<f32>>> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();

    let canonical = spec.channels == 1
        && spec.sample_rate == SAMPLE_RATE
        && spec.bits_per_sample == 16
        && spec.sample_format == hound::SampleFormat::Int;
    if !canonical {
        tracing::debug!("WAV spec {:?} needs conversion", spec);
        return None;
    }

    let samples: std::result::Result<Vec<f32>, _> = reader
        .into_samples::<i16>()
        .map(|sample| sample.map(|s| s as f32 / i16::MAX as f32))
        .collect();

    Some(samples.map_err(|e| QuillError::AudioDecode(e.to_string()).into()))
}

/// Decode any container ffmpeg understands to 16 kHz mono signed 16-bit PCM
fn decode_with_ffmpeg(path: &Path) -> Result<Vec<f32>> {
    tracing::debug!("Decoding {} with ffmpeg", path.display());

    let output = Command::new("ffmpeg")
        .args(["-nostdin", "-v", "error", "-i"])
        .arg(path)
        .args(["-f", "s16le", "-ac", "1", "-ar"])
        .arg(SAMPLE_RATE.to_string())
        .arg("-")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| QuillError::AudioDecode(format!("could not run ffmpeg: {e}")))?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(QuillError::AudioDecode(error.trim().to_string()).into());
    }

    Ok(pcm_s16le_to_f32(&output.stdout))
}

/// Convert little-endian signed 16-bit PCM bytes to normalized samples.
/// A trailing odd byte is ignored.
pub fn pcm_s16le_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / i16::MAX as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, spec: hound::WavSpec, samples: &[i16]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn canonical_spec() -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_pcm_conversion() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x01, 0x80, 0x42];
        let samples = pcm_s16le_to_f32(&bytes);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 1.0);
        assert_eq!(samples[2], -1.0);
    }

    #[test]
    fn test_reads_canonical_wav_directly() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("speech.wav");
        write_wav(&path, canonical_spec(), &[0, i16::MAX, -i16::MAX, 16384]);

        let samples = load_samples(&path).unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[1], 1.0);
        assert_eq!(samples[2], -1.0);
        assert!((samples[3] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_other_wav_specs_need_conversion() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            ..canonical_spec()
        };
        write_wav(&path, spec, &[0, 0, 1, 1]);

        assert!(read_canonical_wav(&path).is_none());
    }

    #[test]
    fn test_empty_canonical_wav_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("silence.wav");
        write_wav(&path, canonical_spec(), &[]);

        let err = load_samples(&path).unwrap_err();
        assert!(err.to_string().contains("contains no audio"));
    }
}
