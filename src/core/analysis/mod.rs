//! Acoustic descriptor algorithms
//!
//! Each sub-extractor returns a partial name → value map:
//! - Pitch statistics over a YIN-style F0 track
//! - Frame energy contour and pause ratio
//! - Spectral centroid/flatness and harmonic-to-noise ratio
//! - LPC formants (F1, F2)
//!
//! The log-mel classifier image lives here too.

use std::collections::BTreeMap;

mod energy;
mod formant;
mod pitch;
mod spectral;
mod spectrogram;

/// Partial descriptor set produced by one sub-extractor
pub type PartialFeatures = BTreeMap<&'static str, f64>;

pub use energy::{energy_features, ENERGY_FEATURES};
pub use formant::{estimate_formants, formant_features, FORMANT_FEATURES};
pub use pitch::{pitch_features, pitch_statistics, PitchTrack, PitchTracker, PITCH_FEATURES};
pub use spectral::{
    harmonic_component, harmonic_to_noise_ratio, spectral_features, SPECTRAL_FEATURES,
};
pub use spectrogram::{LogMelExtractor, SpectrogramImage};
