// src/core/analysis/formant.rs
//
// First two vocal-tract resonances from an LPC fit around the loudest
// part of the clip.

use log::warn;
use std::f64::consts::PI;

use crate::config::FeatureConfig;
use crate::core::dsp::stats::frame_rms;
use crate::core::dsp::{burg, polynomial_roots, pre_emphasis, LpcError};

use super::PartialFeatures;

pub const FORMANT_FEATURES: [&str; 2] = ["F1", "F2"];

/// Roots closer than this to the real axis are not resonances
const MIN_ROOT_IMAG: f64 = 0.01;

/// `F1`/`F2` in Hz; both 0.0 when the fit fails or finds no resonance
pub fn formant_features(samples: &[f32], sample_rate: u32, config: &FeatureConfig) -> PartialFeatures {
    let (f1, f2) = match estimate_formants(samples, sample_rate, config) {
        Ok(formants) => (
            formants.first().copied().unwrap_or(0.0),
            formants.get(1).copied().unwrap_or(0.0),
        ),
        Err(e) => {
            warn!("Formant estimation failed, using 0.0: {}", e);
            (0.0, 0.0)
        }
    };

    [("F1", f1), ("F2", f2)].into_iter().collect()
}

/// Sorted resonance frequencies inside the configured formant band
pub fn estimate_formants(
    samples: &[f32],
    sample_rate: u32,
    config: &FeatureConfig,
) -> Result<Vec<f64>, LpcError> {
    let emphasized = pre_emphasis(samples, config.pre_emphasis);
    let segment = loudest_segment(&emphasized, config.frame_length, config.hop_length);

    let coeffs = burg(&segment, config.lpc_order)?;
    let roots = polynomial_roots(&coeffs)?;

    let sr = sample_rate as f64;
    let mut formants: Vec<f64> = roots
        .iter()
        .filter(|z| z.im >= MIN_ROOT_IMAG)
        .map(|z| z.im.atan2(z.re) * sr / (2.0 * PI))
        .filter(|&f| f > config.formant_min_hz && f < config.formant_max_hz)
        .collect();
    formants.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Ok(formants)
}

/// Four frames starting one frame before the loudest frame, zero-padded to
/// at least two frames
fn loudest_segment(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f32> {
    let contour = frame_rms(samples, frame_length, hop);
    let loudest = contour
        .iter()
        .enumerate()
        .fold((0usize, f32::MIN), |best, (i, &r)| if r > best.1 { (i, r) } else { best })
        .0;

    let start = (loudest * hop).saturating_sub(frame_length).min(samples.len());
    let end = (start + 4 * frame_length).min(samples.len());

    let mut segment = samples[start..end].to_vec();
    if segment.len() < 2 * frame_length {
        segment.resize(2 * frame_length, 0.0);
    }
    segment
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pseudo-random excitation through two resonators (700 Hz and 1800 Hz)
    fn vowel_like(n: usize) -> Vec<f32> {
        let sr = 16000.0f64;
        let mut state = 0x2545_f491_u32;
        let mut signal: Vec<f64> = (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f64 / (1u32 << 24) as f64 - 0.5
            })
            .collect();

        for (freq, r) in [(700.0f64, 0.97f64), (1800.0, 0.96)] {
            let theta = 2.0 * PI * freq / sr;
            let (a1, a2) = (2.0 * r * theta.cos(), -r * r);
            let mut out = vec![0.0f64; n];
            for i in 0..n {
                let y1 = if i >= 1 { out[i - 1] } else { 0.0 };
                let y2 = if i >= 2 { out[i - 2] } else { 0.0 };
                out[i] = signal[i] + a1 * y1 + a2 * y2;
            }
            signal = out;
        }

        let peak = signal.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        signal.iter().map(|s| (0.5 * s / peak) as f32).collect()
    }

    #[test]
    fn test_resonances_recovered() {
        let formants = estimate_formants(&vowel_like(16000), 16000, &FeatureConfig::default()).unwrap();
        assert!(formants.len() >= 2);
        assert!(formants.iter().any(|f| (f - 700.0).abs() < 100.0), "{:?}", formants);
        assert!(formants.iter().any(|f| (f - 1800.0).abs() < 150.0), "{:?}", formants);
    }

    #[test]
    fn test_clean_harmonic_cry_has_formants() {
        let clip = crate::testgen::CrySignal {
            noise: 0.0,
            ..Default::default()
        }
        .render(2.0, 16000, 1);

        let config = FeatureConfig::default();
        assert!(estimate_formants(&clip, 16000, &config).is_ok());

        let stats = formant_features(&clip, 16000, &config);
        for name in FORMANT_FEATURES {
            assert!(
                stats[name] > config.formant_min_hz && stats[name] < config.formant_max_hz,
                "{} = {}",
                name,
                stats[name]
            );
        }
        assert!(stats["F1"] < stats["F2"]);
    }

    #[test]
    fn test_silence_falls_back_to_zero() {
        let stats = formant_features(&vec![0.0; 16000], 16000, &FeatureConfig::default());
        assert_eq!(stats["F1"], 0.0);
        assert_eq!(stats["F2"], 0.0);
    }

    #[test]
    fn test_short_clip_is_padded() {
        let segment = loudest_segment(&[0.1; 300], 1024, 256);
        assert_eq!(segment.len(), 2048);
    }

    #[test]
    fn test_formants_sorted_within_band() {
        let config = FeatureConfig::default();
        let formants = estimate_formants(&vowel_like(8000), 16000, &config).unwrap();
        assert!(formants.windows(2).all(|w| w[0] <= w[1]));
        assert!(formants
            .iter()
            .all(|&f| f > config.formant_min_hz && f < config.formant_max_hz));
    }
}
