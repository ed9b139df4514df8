// src/config/pipeline.rs
//
// Tunable thresholds and frame parameters for every pipeline stage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CryError, Result};

/// Environment variable that overrides the model directory
pub const MODELS_DIR_ENV: &str = "CRYCHECKR_MODELS";

/// Signal gate thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Mean frame RMS below which a clip counts as silence
    pub silence_rms_threshold: f32,
    /// Minimum fraction of voiced frames for a cry-like clip
    pub min_voiced_ratio: f64,
    pub frame_length: usize,
    pub hop_length: usize,
    /// Pitch search band for the voicing check (Hz)
    pub pitch_fmin: f64,
    pub pitch_fmax: f64,
    /// Aperiodicity threshold below which a frame counts as voiced
    pub yin_threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            silence_rms_threshold: 0.005,
            min_voiced_ratio: 0.2,
            frame_length: 2048,
            hop_length: 512,
            pitch_fmin: 200.0,
            pitch_fmax: 800.0,
            yin_threshold: 0.15,
        }
    }
}

/// Engineered feature extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub frame_length: usize,
    pub hop_length: usize,
    pub f0_min: f64,
    pub f0_max: f64,
    /// Hyper-phonation threshold; clamped to `f0_max` when used
    pub hyper_f0: f64,
    pub yin_threshold: f64,
    /// Frames below this fraction of the median RMS count as pauses
    pub silence_ratio_factor: f64,
    pub hpss_n_fft: usize,
    pub hpss_hop: usize,
    /// Median filter length for harmonic/percussive separation
    pub hpss_kernel: usize,
    pub lpc_order: usize,
    pub pre_emphasis: f32,
    pub formant_min_hz: f64,
    pub formant_max_hz: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            frame_length: 1024,
            hop_length: 256,
            f0_min: 100.0,
            f0_max: 800.0,
            hyper_f0: 1000.0,
            yin_threshold: 0.15,
            silence_ratio_factor: 0.6,
            hpss_n_fft: 2048,
            hpss_hop: 512,
            hpss_kernel: 31,
            lpc_order: 12,
            pre_emphasis: 0.97,
            formant_min_hz: 90.0,
            formant_max_hz: 5000.0,
        }
    }
}

/// Classifier input image parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Analysis window; longer clips are truncated, shorter ones zero-padded
    pub clip_secs: f64,
    pub n_mels: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    /// Fixed number of time frames in the output image
    pub n_frames: usize,
    pub top_db: f32,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            clip_secs: 2.5,
            n_mels: 128,
            n_fft: 2048,
            hop_length: 512,
            n_frames: 128,
            top_db: 80.0,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub gate: GateConfig,
    pub features: FeatureConfig,
    pub spectrogram: SpectrogramConfig,
}

impl PipelineConfig {
    /// Load a JSON configuration; omitted fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| CryError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let gate = &self.gate;
        let feat = &self.features;
        let spec = &self.spectrogram;

        let checks: [(bool, &str); 12] = [
            (gate.silence_rms_threshold >= 0.0, "gate.silence_rms_threshold must be >= 0"),
            ((0.0..=1.0).contains(&gate.min_voiced_ratio), "gate.min_voiced_ratio must be in [0, 1]"),
            (gate.hop_length > 0 && gate.frame_length >= gate.hop_length, "gate frame/hop lengths are inconsistent"),
            (gate.pitch_fmin > 0.0 && gate.pitch_fmin < gate.pitch_fmax, "gate pitch band is empty"),
            (feat.hop_length > 0 && feat.frame_length >= feat.hop_length, "feature frame/hop lengths are inconsistent"),
            (feat.f0_min > 0.0 && feat.f0_min < feat.f0_max, "feature pitch band is empty"),
            (feat.hpss_hop > 0 && feat.hpss_n_fft >= feat.hpss_hop, "hpss frame/hop lengths are inconsistent"),
            (feat.hpss_kernel % 2 == 1, "features.hpss_kernel must be odd"),
            (feat.lpc_order > 0, "features.lpc_order must be > 0"),
            (feat.formant_min_hz < feat.formant_max_hz, "formant band is empty"),
            (spec.clip_secs > 0.0 && spec.n_mels > 0 && spec.n_frames > 0, "spectrogram shape must be non-empty"),
            (spec.hop_length > 0 && spec.n_fft >= spec.hop_length, "spectrogram frame/hop lengths are inconsistent"),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(CryError::Config(message.to_string())),
            None => Ok(()),
        }
    }
}

/// Builder for adjusted configurations
pub struct ConfigBuilder {
    config: PipelineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn silence_threshold(mut self, rms: f32) -> Self {
        self.config.gate.silence_rms_threshold = rms;
        self
    }

    pub fn min_voiced_ratio(mut self, ratio: f64) -> Self {
        self.config.gate.min_voiced_ratio = ratio;
        self
    }

    pub fn gate_pitch_band(mut self, fmin: f64, fmax: f64) -> Self {
        self.config.gate.pitch_fmin = fmin;
        self.config.gate.pitch_fmax = fmax;
        self
    }

    pub fn yin_threshold(mut self, threshold: f64) -> Self {
        self.config.gate.yin_threshold = threshold;
        self.config.features.yin_threshold = threshold;
        self
    }

    pub fn clip_secs(mut self, secs: f64) -> Self {
        self.config.spectrogram.clip_secs = secs;
        self
    }

    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Model directory: `$CRYCHECKR_MODELS`, else `<data dir>/crycheckr/models`
pub fn default_models_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(MODELS_DIR_ENV) {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|d| d.join("crycheckr").join("models"))
        .unwrap_or_else(|| PathBuf::from("models"))
}
