use std::path::Path;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use whisper_rs::{
    FullParams, SamplingStrategy, SegmentCallbackData, WhisperContext, WhisperContextParameters, WhisperState,
};

use super::{Segment, SegmentStream, SpeechEngine, TranscriptionConfig, TranscriptionInfo};
use crate::audio::{self, SAMPLE_RATE};
use crate::cli::Device;
use crate::lifecycle::Cancellation;
use crate::{QuillError, Result};

/// Speech engine backed by whisper.cpp.
///
/// Precision follows the ggml model file; whisper.cpp picks the compute type on its own.
pub struct WhisperEngine {
    context: WhisperContext,
    threads: usize,
}

impl WhisperEngine {
    /// Load a ggml model on the selected device
    pub fn load(model_path: &Path, device: Device) -> Result<Self> {
        let path = model_path
            .to_str()
            .ok_or_else(|| QuillError::ModelLoad(format!("invalid model path: {}", model_path.display())))?;

        let mut params = WhisperContextParameters::default();
        params.use_gpu(use_gpu(device)?);

        tracing::debug!("Loading {} on device {}", model_path.display(), device);
        let context = WhisperContext::new_with_params(path, params)
            .map_err(|e| QuillError::ModelLoad(format!("{}: {}", model_path.display(), e)))?;

        Ok(Self {
            context,
            threads: num_threads(),
        })
    }

    /// Detect the spoken language from the start of the audio
    fn detect_language(&self, state: &mut WhisperState, samples: &[f32]) -> Result<(String, f32)> {
        state
            .pcm_to_mel(samples, self.threads)
            .map_err(|e| QuillError::TranscriptionFailed(format!("mel spectrogram: {e}")))?;

        let (lang_id, probabilities) = state
            .lang_detect(0, self.threads)
            .map_err(|e| QuillError::TranscriptionFailed(format!("language detection: {e}")))?;

        let language = whisper_rs::get_lang_str(lang_id)
            .ok_or_else(|| QuillError::TranscriptionFailed(format!("unknown language id {lang_id}")))?;
        let probability = usize::try_from(lang_id)
            .ok()
            .and_then(|index| probabilities.get(index).copied())
            .unwrap_or(0.0);

        tracing::debug!("Detected language {} ({:.3})", language, probability);
        Ok((language.to_string(), probability))
    }
}

fn use_gpu(device: Device) -> Result<bool> {
    match device {
        Device::Cpu => Ok(false),
        // whisper.cpp falls back to the CPU when no GPU backend is compiled in
        Device::Auto => Ok(true),
        Device::Cuda if cfg!(feature = "cuda") => Ok(true),
        Device::Cuda => Err(QuillError::DeviceUnavailable(
            "this build has no CUDA support (rebuild with `--features cuda`)".to_string(),
        )
        .into()),
    }
}

fn num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

impl SpeechEngine for WhisperEngine {
    fn transcribe(
        &self,
        audio: &Path,
        config: &TranscriptionConfig,
        cancel: &Cancellation,
    ) -> Result<(SegmentStream, TranscriptionInfo)> {
        let samples = audio::load_samples(audio)?;
        let duration = samples.len() as f64 / SAMPLE_RATE as f64;

        let mut state = self
            .context
            .create_state()
            .map_err(|e| QuillError::TranscriptionFailed(format!("could not create decoder state: {e}")))?;

        let (language, language_probability) = match &config.language {
            Some(language) => (language.clone(), 1.0),
            None => self.detect_language(&mut state, &samples)?,
        };

        let decode = Decode {
            state,
            samples,
            language: language.clone(),
            beam_size: config.beam_size,
            threads: self.threads,
            cancel: cancel.clone(),
        };
        let (sender, receiver) = crossbeam_channel::unbounded();
        let decoder = std::thread::Builder::new()
            .name("whisper-decode".to_string())
            .spawn(move || decode.run(sender))
            .map_err(|e| QuillError::TranscriptionFailed(format!("could not start decoder: {e}")))?;

        let info = TranscriptionInfo {
            duration,
            language,
            language_probability,
        };
        Ok((Box::new(WhisperSegments::new(receiver, decoder)), info))
    }
}

/// One full decode, run on its own thread.
///
/// Segments are sent as soon as whisper.cpp finalizes them; the decode stops early once the
/// cancellation flag is raised.
struct Decode {
    state: WhisperState,
    samples: Vec<f32>,
    language: String,
    beam_size: usize,
    threads: usize,
    cancel: Cancellation,
}

impl Decode {
    fn run(self, sender: Sender<Result<Segment>>) {
        let Decode {
            mut state,
            samples,
            language,
            beam_size,
            threads,
            cancel,
        } = self;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: beam_size as i32,
            patience: -1.0,
        });
        params.set_language(Some(language.as_str()));
        params.set_translate(false);
        params.set_n_threads(threads as i32);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);

        // Lossy: a multi-byte character may be split across two segments
        let segments = sender.clone();
        params.set_segment_callback_safe_lossy(move |data: SegmentCallbackData| {
            let segment = segment_from_centiseconds(data.start_timestamp, data.end_timestamp, data.text);
            let _ = segments.send(Ok(segment));
        });

        let abort = cancel.clone();
        params.set_abort_callback_safe(move || abort.is_cancelled());

        match state.full(params, &samples) {
            Ok(_) => tracing::debug!("Decoder finished"),
            Err(e) if cancel.is_cancelled() => tracing::debug!("Decoder stopped after cancellation: {}", e),
            Err(e) => {
                let _ = sender.send(Err(QuillError::TranscriptionFailed(e.to_string()).into()));
            }
        }
    }
}

/// whisper.cpp reports segment bounds in centiseconds
fn segment_from_centiseconds(t0: i64, t1: i64, text: String) -> Segment {
    Segment::new(t0 as f64 / 100.0, t1 as f64 / 100.0, text)
}

/// Segments in decode order, pulled from the decoder thread as they are produced
struct WhisperSegments {
    receiver: Receiver<Result<Segment>>,
    decoder: Option<JoinHandle<()>>,
}

impl WhisperSegments {
    fn new(receiver: Receiver<Result<Segment>>, decoder: JoinHandle<()>) -> Self {
        Self {
            receiver,
            decoder: Some(decoder),
        }
    }
}

impl Iterator for WhisperSegments {
    type Item = Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Ok(segment) = self.receiver.recv() {
            return Some(segment);
        }

        // Every sender is gone, so the decoder has returned or panicked
        let decoder = self.decoder.take()?;
        match decoder.join() {
            Ok(()) => None,
            Err(_) => Some(Err(QuillError::TranscriptionFailed("decoder thread panicked".to_string()).into())),
        }
    }
}
