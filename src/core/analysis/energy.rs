// src/core/analysis/energy.rs
//
// Loudness contour statistics and pause ratio.

use crate::config::FeatureConfig;
use crate::core::dsp::stats::{coefficient_of_variation, frame_rms, mean, median, std_dev};

use super::PartialFeatures;

pub const ENERGY_FEATURES: [&str; 4] = ["rms_mean", "rms_std", "rms_cv", "silence_ratio"];

/// Frame RMS statistics.
///
/// `silence_ratio` is the fraction of frames quieter than
/// `silence_ratio_factor` times the median frame RMS.
pub fn energy_features(samples: &[f32], config: &FeatureConfig) -> PartialFeatures {
    let contour: Vec<f64> = frame_rms(samples, config.frame_length, config.hop_length)
        .into_iter()
        .map(f64::from)
        .collect();

    let rms_mean = mean(&contour);
    let rms_std = std_dev(&contour);

    let threshold = config.silence_ratio_factor * median(&contour);
    let silence_ratio = if contour.is_empty() {
        0.0
    } else {
        contour.iter().filter(|&&r| r < threshold).count() as f64 / contour.len() as f64
    };

    [
        ("rms_mean", rms_mean),
        ("rms_std", rms_std),
        ("rms_cv", coefficient_of_variation(rms_std, rms_mean)),
        ("silence_ratio", silence_ratio),
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_tone() {
        let samples: Vec<f32> = (0..16000)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        let stats = energy_features(&samples, &FeatureConfig::default());

        // Interior frames of a 0.5 amplitude sine sit near 0.354
        assert!((stats["rms_mean"] - 0.354).abs() < 0.03, "rms_mean {}", stats["rms_mean"]);
        assert!(stats["rms_cv"] < 0.2);
        assert!(stats["silence_ratio"] < 0.05);
    }

    #[test]
    fn test_bursts_with_pauses() {
        // 0.25 s on, 0.25 s off
        let samples: Vec<f32> = (0..32000)
            .map(|i| {
                if (i / 4000) % 2 == 0 {
                    0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin()
                } else {
                    0.0
                }
            })
            .collect();
        let stats = energy_features(&samples, &FeatureConfig::default());

        assert!(stats["silence_ratio"] > 0.3, "silence_ratio {}", stats["silence_ratio"]);
        assert!(stats["rms_cv"] > 0.5);
    }

    #[test]
    fn test_silence_is_finite() {
        let stats = energy_features(&vec![0.0; 8000], &FeatureConfig::default());
        assert_eq!(stats.len(), ENERGY_FEATURES.len());
        assert!(stats.values().all(|v| v.is_finite()));
        assert_eq!(stats["rms_mean"], 0.0);
        assert_eq!(stats["silence_ratio"], 0.0);
    }
}
