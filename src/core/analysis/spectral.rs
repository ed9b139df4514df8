// src/core/analysis/spectral.rs
//
// Spectral shape statistics and harmonic-to-noise ratio.
// The harmonic component comes from median-filter harmonic/percussive
// separation: harmonics are smooth along time, transients along frequency.

use rustfft::num_complex::Complex;

use crate::config::FeatureConfig;
use crate::core::dsp::stats::{
    coefficient_of_variation, mean, spectral_centroid, spectral_flatness, std_dev, EPSILON,
};
use crate::core::dsp::{median_filter, Stft};

use super::PartialFeatures;

pub const SPECTRAL_FEATURES: [&str; 6] =
    ["sc_mean", "sc_std", "sc_cv", "flat_mean", "flat_std", "hnr"];

/// Exponent of the soft separation mask
const MASK_POWER: i32 = 2;

/// Centroid and flatness statistics plus `hnr`
pub fn spectral_features(samples: &[f32], sample_rate: u32, config: &FeatureConfig) -> PartialFeatures {
    let stft = Stft::new(config.frame_length, config.hop_length);
    let magnitudes = stft.magnitude(samples);

    let centroids: Vec<f64> = magnitudes
        .iter()
        .map(|frame| spectral_centroid(frame, sample_rate, config.frame_length))
        .collect();
    let flatness: Vec<f64> = magnitudes.iter().map(|frame| spectral_flatness(frame)).collect();

    let sc_mean = mean(&centroids);
    let sc_std = std_dev(&centroids);

    let harmonic = harmonic_component(samples, config.hpss_n_fft, config.hpss_hop, config.hpss_kernel);

    [
        ("sc_mean", sc_mean),
        ("sc_std", sc_std),
        ("sc_cv", coefficient_of_variation(sc_std, sc_mean)),
        ("flat_mean", mean(&flatness)),
        ("flat_std", std_dev(&flatness)),
        ("hnr", harmonic_to_noise_ratio(samples, &harmonic)),
    ]
    .into_iter()
    .collect()
}

/// Mean absolute harmonic amplitude over mean absolute residual amplitude
pub fn harmonic_to_noise_ratio(samples: &[f32], harmonic: &[f32]) -> f64 {
    if samples.is_empty() {
        return 1.0;
    }

    let n = samples.len() as f64;
    let harmonic_level: f64 = harmonic.iter().map(|h| h.abs() as f64).sum::<f64>() / n;
    let residual_level: f64 = samples
        .iter()
        .zip(harmonic)
        .map(|(y, h)| (y - h).abs() as f64)
        .sum::<f64>()
        / n;

    (harmonic_level + EPSILON) / (residual_level + EPSILON)
}

/// Harmonic part of `samples`, same length as the input
pub fn harmonic_component(samples: &[f32], n_fft: usize, hop: usize, kernel: usize) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let stft = Stft::new(n_fft, hop);
    let spectrum = stft.forward(samples);
    let num_frames = spectrum.len();
    let num_bins = stft.num_bins();

    let magnitude: Vec<Vec<f32>> = spectrum
        .iter()
        .map(|frame| frame.iter().map(|c| c.norm()).collect())
        .collect();

    // Harmonic enhancement: median along time, per bin
    let mut harmonic = vec![vec![0.0f32; num_bins]; num_frames];
    for k in 0..num_bins {
        let series: Vec<f32> = magnitude.iter().map(|frame| frame[k]).collect();
        for (t, value) in median_filter(&series, kernel).into_iter().enumerate() {
            harmonic[t][k] = value;
        }
    }

    // Percussive enhancement: median along frequency, per frame
    let percussive: Vec<Vec<f32>> = magnitude
        .iter()
        .map(|frame| median_filter(frame, kernel))
        .collect();

    let masked: Vec<Vec<Complex<f32>>> = spectrum
        .iter()
        .enumerate()
        .map(|(t, frame)| {
            frame
                .iter()
                .enumerate()
                .map(|(k, &c)| c * soft_mask(harmonic[t][k], percussive[t][k]))
                .collect()
        })
        .collect();

    stft.inverse(&masked, samples.len())
}

/// Wiener-style mask `x^p / (x^p + r^p)`; 0 where both are negligible
fn soft_mask(x: f32, reference: f32) -> f32 {
    let z = x.max(reference);
    if z < f32::MIN_POSITIVE {
        return 0.0;
    }
    let xm = (x / z).powi(MASK_POWER);
    let rm = (reference / z).powi(MASK_POWER);
    xm / (xm + rm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 16000.0).sin())
            .collect()
    }

    fn clicks(n: usize) -> Vec<f32> {
        (0..n).map(|i| if i % 8000 == 0 { 0.9 } else { 0.0 }).collect()
    }

    #[test]
    fn test_soft_mask() {
        assert_eq!(soft_mask(0.0, 0.0), 0.0);
        assert!((soft_mask(1.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((soft_mask(2.0, 1.0) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_steady_tone_is_harmonic() {
        let y = tone(440.0, 16000);
        let harmonic = harmonic_component(&y, 2048, 512, 31);
        assert_eq!(harmonic.len(), y.len());

        let hnr = harmonic_to_noise_ratio(&y, &harmonic);
        assert!(hnr > 3.0, "hnr {}", hnr);
    }

    #[test]
    fn test_clicks_are_not_harmonic() {
        let y = clicks(32000);
        let harmonic = harmonic_component(&y, 2048, 512, 31);
        let hnr = harmonic_to_noise_ratio(&y, &harmonic);
        assert!(hnr < 1.0, "hnr {}", hnr);
    }

    #[test]
    fn test_centroid_tracks_frequency() {
        let config = FeatureConfig::default();
        let low = spectral_features(&tone(300.0, 16000), 16000, &config);
        let high = spectral_features(&tone(3000.0, 16000), 16000, &config);
        assert!(high["sc_mean"] > low["sc_mean"]);
        assert!(low["flat_mean"] < 0.1);
    }

    #[test]
    fn test_silence_is_finite() {
        let stats = spectral_features(&vec![0.0; 8000], 16000, &FeatureConfig::default());
        assert_eq!(stats.len(), SPECTRAL_FEATURES.len());
        assert!(stats.values().all(|v| v.is_finite()));
        assert_eq!(stats["sc_mean"], 0.0);
        assert!((stats["hnr"] - 1.0).abs() < 1e-9);
    }
}
