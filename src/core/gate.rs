// src/core/gate.rs
//
// Cheap pre-filters run before feature extraction: a loudness check and a
// voicing check. A rejection ends the analysis early and is a regular
// outcome, not an error.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GateConfig;
use crate::core::analysis::PitchTracker;
use crate::core::decoder::Waveform;
use crate::core::dsp::stats::{frame_rms, mean};

/// Why the gate stopped a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    #[serde(rename = "silence")]
    Silence,
    #[serde(rename = "non-cry-pattern")]
    NonCryPattern,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Silence => "silence",
            RejectReason::NonCryPattern => "non-cry-pattern",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements taken by the gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateStats {
    pub mean_rms: f64,
    /// Not measured when the clip was already rejected as silence
    pub voiced_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub stats: GateStats,
    pub rejection: Option<RejectReason>,
}

impl GateDecision {
    pub fn passed(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Silence and voicing pre-filter
pub struct SignalGate {
    config: GateConfig,
    tracker: PitchTracker,
}

impl SignalGate {
    pub fn new(config: &GateConfig, sample_rate: u32) -> Self {
        Self {
            config: config.clone(),
            tracker: PitchTracker::new(
                sample_rate,
                config.frame_length,
                config.hop_length,
                config.pitch_fmin,
                config.pitch_fmax,
                config.yin_threshold,
            ),
        }
    }

    /// Run both checks, cheapest first
    pub fn check(&self, waveform: &Waveform) -> GateDecision {
        let samples = waveform.samples();

        let contour: Vec<f64> = frame_rms(samples, self.config.frame_length, self.config.hop_length)
            .into_iter()
            .map(f64::from)
            .collect();
        let mean_rms = mean(&contour);

        if mean_rms < self.config.silence_rms_threshold as f64 {
            debug!(
                "Gate: mean RMS {:.5} below {:.5}, silence",
                mean_rms, self.config.silence_rms_threshold
            );
            return GateDecision {
                stats: GateStats {
                    mean_rms,
                    voiced_ratio: None,
                },
                rejection: Some(RejectReason::Silence),
            };
        }

        let voiced_ratio = self.tracker.track(samples).voiced_ratio();
        let rejection = if voiced_ratio < self.config.min_voiced_ratio {
            Some(RejectReason::NonCryPattern)
        } else {
            None
        };

        debug!(
            "Gate: mean RMS {:.5}, voiced ratio {:.3} -> {}",
            mean_rms,
            voiced_ratio,
            rejection.map_or("pass", |r| r.as_str())
        );

        GateDecision {
            stats: GateStats {
                mean_rms,
                voiced_ratio: Some(voiced_ratio),
            },
            rejection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decoder::TARGET_SAMPLE_RATE;

    fn gate() -> SignalGate {
        SignalGate::new(&GateConfig::default(), TARGET_SAMPLE_RATE)
    }

    fn wave(samples: Vec<f32>) -> Waveform {
        Waveform::from_samples(samples, TARGET_SAMPLE_RATE).unwrap()
    }

    fn sine(freq: f32, amplitude: f32, secs: f32) -> Vec<f32> {
        let n = (TARGET_SAMPLE_RATE as f32 * secs) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 16000.0).sin())
            .collect()
    }

    #[test]
    fn test_silence_rejected() {
        for secs in [0.1f32, 1.0, 3.0] {
            let decision = gate().check(&wave(vec![0.0; (16000.0 * secs) as usize]));
            assert_eq!(decision.rejection, Some(RejectReason::Silence));
            assert_eq!(decision.stats.voiced_ratio, None);
        }
    }

    #[test]
    fn test_empty_is_silence() {
        let decision = gate().check(&wave(Vec::new()));
        assert_eq!(decision.rejection, Some(RejectReason::Silence));
    }

    #[test]
    fn test_quiet_tone_rejected_as_silence() {
        let decision = gate().check(&wave(sine(440.0, 0.002, 1.0)));
        assert_eq!(decision.rejection, Some(RejectReason::Silence));
    }

    #[test]
    fn test_in_band_sine_passes() {
        let decision = gate().check(&wave(sine(440.0, 0.5, 3.0)));
        assert!(decision.passed(), "{:?}", decision);
        assert!((decision.stats.mean_rms - 0.35).abs() < 0.02);
        assert!(decision.stats.voiced_ratio.unwrap() > 0.9);
    }

    #[test]
    fn test_low_hum_rejected_as_non_cry() {
        let decision = gate().check(&wave(sine(100.0, 0.5, 2.0)));
        assert_eq!(decision.rejection, Some(RejectReason::NonCryPattern));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(RejectReason::Silence.to_string(), "silence");
        assert_eq!(
            serde_json::to_string(&RejectReason::NonCryPattern).unwrap(),
            "\"non-cry-pattern\""
        );
    }
}
