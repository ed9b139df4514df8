// src/core/analysis/pitch.rs
//
// Fundamental frequency tracking (YIN difference function with a
// cumulative-mean-normalized voicing decision) and pitch statistics.

use crate::config::FeatureConfig;
use crate::core::dsp::stats::{coefficient_of_variation, mean, median, percentile, std_dev, EPSILON};
use crate::core::dsp::{centered_frame_count, pad_center};

use super::PartialFeatures;

/// Names produced by [`pitch_features`], in layout order
pub const PITCH_FEATURES: [&str; 8] = [
    "f0_mean",
    "f0_std",
    "f0_median",
    "f0_iqr",
    "f0_cv",
    "f0_jitter",
    "f0_voiced_ratio",
    "f0_hyper_ratio",
];

/// Per-frame pitch estimates; `None` marks an unvoiced frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchTrack {
    pub f0: Vec<Option<f64>>,
}

impl PitchTrack {
    pub fn num_frames(&self) -> usize {
        self.f0.len()
    }

    /// Fraction of frames with a valid pitch estimate
    pub fn voiced_ratio(&self) -> f64 {
        if self.f0.is_empty() {
            return 0.0;
        }
        self.f0.iter().filter(|f| f.is_some()).count() as f64 / self.f0.len() as f64
    }

    /// Pitch values of the voiced frames, in time order
    pub fn voiced(&self) -> Vec<f64> {
        self.f0.iter().flatten().copied().collect()
    }
}

/// Frame-wise pitch tracker restricted to a frequency band
#[derive(Debug, Clone)]
pub struct PitchTracker {
    sample_rate: u32,
    frame_length: usize,
    hop: usize,
    fmin: f64,
    fmax: f64,
    threshold: f64,
}

impl PitchTracker {
    pub fn new(
        sample_rate: u32,
        frame_length: usize,
        hop: usize,
        fmin: f64,
        fmax: f64,
        threshold: f64,
    ) -> Self {
        Self {
            sample_rate,
            frame_length,
            hop,
            fmin,
            fmax,
            threshold,
        }
    }

    /// Smallest and largest lag searched, in samples
    fn period_range(&self) -> (usize, usize) {
        let sr = self.sample_rate as f64;
        let window = self.frame_length / 2;
        let min_period = ((sr / self.fmax).floor() as usize).max(1);
        let max_period = ((sr / self.fmin).ceil() as usize)
            .min(self.frame_length.saturating_sub(window + 1));
        (min_period, max_period)
    }

    /// Track pitch over every centered frame of `samples`
    pub fn track(&self, samples: &[f32]) -> PitchTrack {
        let padded = pad_center(samples, self.frame_length);
        let num_frames = centered_frame_count(samples.len(), self.hop);

        let f0 = (0..num_frames)
            .map(|t| {
                let start = t * self.hop;
                let end = (start + self.frame_length).min(padded.len());
                self.frame_pitch(&padded[start..end])
            })
            .collect();

        PitchTrack { f0 }
    }

    fn frame_pitch(&self, frame: &[f32]) -> Option<f64> {
        let (min_period, max_period) = self.period_range();
        let window = self.frame_length / 2;
        if min_period + 1 >= max_period || frame.len() < window + max_period + 1 {
            return None;
        }

        // Difference function d(tau) for tau in 0..=max_period
        let mut diff = vec![0.0f64; max_period + 2];
        for (tau, d) in diff.iter_mut().enumerate().skip(1).take(max_period + 1) {
            *d = frame[..window]
                .iter()
                .zip(&frame[tau..tau + window])
                .map(|(&a, &b)| {
                    let delta = (a - b) as f64;
                    delta * delta
                })
                .sum();
        }

        // Cumulative mean normalized difference
        let mut cmnd = vec![1.0f64; diff.len()];
        let mut running = 0.0;
        for tau in 1..diff.len() {
            running += diff[tau];
            cmnd[tau] = if running > f64::MIN_POSITIVE {
                diff[tau] * tau as f64 / running
            } else {
                1.0
            };
        }

        let mut tau = (min_period..=max_period).find(|&tau| cmnd[tau] < self.threshold)?;
        while tau < max_period && cmnd[tau + 1] < cmnd[tau] {
            tau += 1;
        }

        let period = refine_period(&cmnd, tau);
        let f0 = self.sample_rate as f64 / period;

        if f0.is_finite() && f0 >= self.fmin && f0 <= self.fmax {
            Some(f0)
        } else {
            None
        }
    }
}

/// Parabolic interpolation of the minimum around integer lag `tau`
fn refine_period(cmnd: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f64;
    }

    let (a, b, c) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
    let curvature = a - 2.0 * b + c;
    if curvature.abs() < f64::EPSILON {
        return tau as f64;
    }

    let shift = 0.5 * (a - c) / curvature;
    tau as f64 + shift.clamp(-1.0, 1.0)
}

/// Pitch statistics over voiced frames.
///
/// Every value is 0.0 when no frame is voiced.
pub fn pitch_features(samples: &[f32], sample_rate: u32, config: &FeatureConfig) -> PartialFeatures {
    let tracker = PitchTracker::new(
        sample_rate,
        config.frame_length,
        config.hop_length,
        config.f0_min,
        config.f0_max,
        config.yin_threshold,
    );
    let track = tracker.track(samples);
    let hyper_threshold = config.hyper_f0.min(config.f0_max);
    pitch_statistics(&track, hyper_threshold)
}

/// Summary statistics of a pitch track
pub fn pitch_statistics(track: &PitchTrack, hyper_threshold: f64) -> PartialFeatures {
    let voiced = track.voiced();
    if voiced.is_empty() {
        return PITCH_FEATURES.iter().map(|&name| (name, 0.0)).collect();
    }

    let f0_mean = mean(&voiced);
    let f0_std = std_dev(&voiced);
    let f0_iqr = percentile(&voiced, 75.0) - percentile(&voiced, 25.0);

    let periods: Vec<f64> = voiced.iter().map(|f| 1.0 / (f + EPSILON)).collect();
    let jitter = if periods.len() > 1 {
        let abs_diff: Vec<f64> = periods.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        mean(&abs_diff) / (mean(&periods) + EPSILON)
    } else {
        0.0
    };

    let hyper_ratio =
        voiced.iter().filter(|&&f| f > hyper_threshold).count() as f64 / voiced.len() as f64;

    [
        ("f0_mean", f0_mean),
        ("f0_std", f0_std),
        ("f0_median", median(&voiced)),
        ("f0_iqr", f0_iqr),
        ("f0_cv", coefficient_of_variation(f0_std, f0_mean)),
        ("f0_jitter", jitter),
        ("f0_voiced_ratio", track.voiced_ratio()),
        ("f0_hyper_ratio", hyper_ratio),
    ]
    .into_iter()
    .collect()
}
