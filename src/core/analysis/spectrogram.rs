// src/core/analysis/spectrogram.rs
//
// Fixed-shape, standardized log-mel image used as classifier input.

use crate::config::SpectrogramConfig;
use crate::core::dsp::stats::EPSILON;
use crate::core::dsp::{power_to_db_ref_max, MelFilterbank, Stft};
use crate::error::{CryError, Result};

/// Mel-major 2-D grid: `data[mel * n_frames + frame]`
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramImage {
    n_mels: usize,
    n_frames: usize,
    data: Vec<f32>,
}

impl SpectrogramImage {
    pub fn new(n_mels: usize, n_frames: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != n_mels * n_frames {
            return Err(CryError::Analysis(format!(
                "spectrogram data has {} values, expected {}x{}",
                data.len(),
                n_mels,
                n_frames
            )));
        }
        Ok(Self {
            n_mels,
            n_frames,
            data,
        })
    }

    /// `(mel rows, time frames)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_mels, self.n_frames)
    }

    pub fn get(&self, mel: usize, frame: usize) -> f32 {
        self.data[mel * self.n_frames + frame]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Log-mel image extractor with a cached STFT plan and filterbank
pub struct LogMelExtractor {
    config: SpectrogramConfig,
    sample_rate: u32,
    stft: Stft,
    filterbank: MelFilterbank,
}

impl LogMelExtractor {
    pub fn new(sample_rate: u32, config: &SpectrogramConfig) -> Self {
        Self {
            config: config.clone(),
            sample_rate,
            stft: Stft::new(config.n_fft, config.hop_length),
            filterbank: MelFilterbank::new(
                sample_rate,
                config.n_fft,
                config.n_mels,
                0.0,
                sample_rate as f64 / 2.0,
            ),
        }
    }

    /// Samples in the fixed analysis window
    pub fn clip_len(&self) -> usize {
        (self.config.clip_secs * self.sample_rate as f64).round() as usize
    }

    /// Build the image.
    ///
    /// The clip is truncated or zero-padded to the analysis window, converted
    /// to dB relative to its own maximum, cut or zero-padded to exactly
    /// `n_frames` frames, then standardized to zero mean and unit variance.
    pub fn extract(&self, samples: &[f32]) -> SpectrogramImage {
        let clip_len = self.clip_len();
        let mut clip = samples[..samples.len().min(clip_len)].to_vec();
        clip.resize(clip_len, 0.0);

        let mel_frames: Vec<Vec<f32>> = self
            .stft
            .power(&clip)
            .iter()
            .map(|frame| self.filterbank.apply(frame))
            .collect();

        let n_mels = self.config.n_mels;
        let available = mel_frames.len();
        let mut db = vec![0.0f32; n_mels * available];
        for (t, frame) in mel_frames.iter().enumerate() {
            for (m, &value) in frame.iter().enumerate() {
                db[m * available + t] = value;
            }
        }
        power_to_db_ref_max(&mut db, self.config.top_db);

        let n_frames = self.config.n_frames;
        let mut data = vec![0.0f32; n_mels * n_frames];
        for m in 0..n_mels {
            for t in 0..available.min(n_frames) {
                data[m * n_frames + t] = db[m * available + t];
            }
        }

        standardize(&mut data);

        SpectrogramImage {
            n_mels,
            n_frames,
            data,
        }
    }
}

/// Zero mean, unit variance over the whole grid
fn standardize(data: &mut [f32]) {
    if data.is_empty() {
        return;
    }

    let n = data.len() as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let std = (data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n).sqrt();

    for v in data.iter_mut() {
        *v = ((*v as f64 - mean) / (std + EPSILON)) as f32;
    }
}
