// src/core/features.rs
//
// Acoustic feature extraction: the classifier's log-mel image and the
// named engineered descriptor vector for the anomaly screen.

use log::{debug, warn};
use serde::ser::{Serialize, Serializer};

use crate::config::{FeatureConfig, SpectrogramConfig};
use crate::core::analysis::{
    energy_features, formant_features, pitch_features, spectral_features, LogMelExtractor,
    PartialFeatures, SpectrogramImage, ENERGY_FEATURES, FORMANT_FEATURES, PITCH_FEATURES,
    SPECTRAL_FEATURES,
};
use crate::core::decoder::{Waveform, TARGET_SAMPLE_RATE};
use crate::error::{CryError, Result};

/// Every descriptor the extractor produces, in pitch, energy, spectral,
/// formant order
pub fn default_feature_names() -> Vec<String> {
    PITCH_FEATURES
        .iter()
        .chain(ENERGY_FEATURES.iter())
        .chain(SPECTRAL_FEATURES.iter())
        .chain(FORMANT_FEATURES.iter())
        .map(|name| name.to_string())
        .collect()
}

/// Ordered, finite descriptor values keyed by name
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Merge partial maps into the order given by `names`.
    ///
    /// Names no partial produced become 0.0, as do NaN/Inf values.
    pub fn assemble(partials: &[PartialFeatures], names: &[String]) -> Self {
        let values = names
            .iter()
            .map(|name| {
                let found = partials.iter().find_map(|p| p.get(name.as_str()).copied());
                match found {
                    Some(v) if v.is_finite() => v,
                    Some(v) => {
                        warn!("Feature {} is {}, using 0.0", name, v);
                        0.0
                    }
                    None => {
                        debug!("Feature {} not produced, using 0.0", name);
                        0.0
                    }
                }
            })
            .collect();

        Self {
            names: names.to_vec(),
            values,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

// Serialized as an ordered JSON object
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Both model inputs for one clip
#[derive(Debug, Clone)]
pub struct AcousticFeatures {
    pub spectrogram: SpectrogramImage,
    pub features: FeatureVector,
}

/// Produces the classifier image and the engineered descriptor vector
pub struct AcousticFeatureExtractor {
    config: FeatureConfig,
    log_mel: LogMelExtractor,
}

impl AcousticFeatureExtractor {
    pub fn new(features: &FeatureConfig, spectrogram: &SpectrogramConfig) -> Self {
        Self {
            config: features.clone(),
            log_mel: LogMelExtractor::new(TARGET_SAMPLE_RATE, spectrogram),
        }
    }

    /// Extract both representations; `names` fixes the vector layout
    pub fn extract(&self, waveform: &Waveform, names: &[String]) -> Result<AcousticFeatures> {
        self.check_input(waveform)?;

        let (spectrogram, features) = rayon::join(
            || self.log_mel.extract(waveform.samples()),
            || self.engineered_unchecked(waveform, names),
        );

        Ok(AcousticFeatures {
            spectrogram,
            features,
        })
    }

    pub fn spectrogram(&self, waveform: &Waveform) -> Result<SpectrogramImage> {
        self.check_input(waveform)?;
        Ok(self.log_mel.extract(waveform.samples()))
    }

    pub fn engineered(&self, waveform: &Waveform, names: &[String]) -> Result<FeatureVector> {
        self.check_input(waveform)?;
        Ok(self.engineered_unchecked(waveform, names))
    }

    fn engineered_unchecked(&self, waveform: &Waveform, names: &[String]) -> FeatureVector {
        let samples = waveform.samples();
        let sr = waveform.sample_rate();

        let partials = [
            pitch_features(samples, sr, &self.config),
            energy_features(samples, &self.config),
            spectral_features(samples, sr, &self.config),
            formant_features(samples, sr, &self.config),
        ];

        let vector = FeatureVector::assemble(&partials, names);
        debug!("Extracted {} features", vector.len());
        vector
    }

    fn check_input(&self, waveform: &Waveform) -> Result<()> {
        if waveform.is_empty() {
            return Err(CryError::Analysis("waveform has no samples".into()));
        }
        if waveform.sample_rate() != TARGET_SAMPLE_RATE {
            return Err(CryError::Analysis(format!(
                "expected {} Hz audio, got {} Hz",
                TARGET_SAMPLE_RATE,
                waveform.sample_rate()
            )));
        }
        Ok(())
    }
}

impl Default for AcousticFeatureExtractor {
    fn default() -> Self {
        Self::new(&FeatureConfig::default(), &SpectrogramConfig::default())
    }
}
