//! Statistical helpers shared by the gate and the feature extractors

use super::fft::{centered_frame_count, pad_center};

/// Additive guard used in every ratio denominator
pub const EPSILON: f64 = 1e-9;

/// RMS of every centered frame
pub fn frame_rms(samples: &[f32], frame_len: usize, hop: usize) -> Vec<f32> {
    let padded = pad_center(samples, frame_len);
    (0..centered_frame_count(samples.len(), hop))
        .map(|t| {
            let start = t * hop;
            let end = (start + frame_len).min(padded.len());
            let sum_sq: f64 = padded[start..end].iter().map(|&s| (s as f64).powi(2)).sum();
            (sum_sq / frame_len as f64).sqrt() as f32
        })
        .collect()
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    (data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64).sqrt()
}

/// Coefficient of variation with a guarded denominator
pub fn coefficient_of_variation(std: f64, mean: f64) -> f64 {
    std / (mean + EPSILON)
}

/// Percentile with linear interpolation between closest ranks (`q` in 0..=100)
pub fn percentile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Compute median of a slice
pub fn median(data: &[f64]) -> f64 {
    percentile(data, 50.0)
}

/// Spectral centroid of one magnitude frame
pub fn spectral_centroid(magnitudes: &[f32], sample_rate: u32, n_fft: usize) -> f64 {
    let total: f64 = magnitudes.iter().map(|&m| m as f64).sum();
    if total < EPSILON {
        return 0.0;
    }

    let bin_hz = sample_rate as f64 / n_fft as f64;
    let weighted: f64 = magnitudes
        .iter()
        .enumerate()
        .map(|(k, &m)| k as f64 * bin_hz * m as f64)
        .sum();

    weighted / total
}

/// Spectral flatness (Wiener entropy) of one magnitude frame, computed on
/// power with a 1e-10 floor.
/// Returns 1.0 for white noise, approaches 0.0 for tonal signals
pub fn spectral_flatness(magnitudes: &[f32]) -> f64 {
    if magnitudes.is_empty() {
        return 0.0;
    }

    let n = magnitudes.len() as f64;
    let power = magnitudes.iter().map(|&m| ((m as f64).powi(2)).max(1e-10));

    let (log_sum, sum) = power.fold((0.0, 0.0), |(l, s), p| (l + p.ln(), s + p));
    let geometric_mean = (log_sum / n).exp();
    let arithmetic_mean = sum / n;

    // Every power term is floored, so the mean is never below 1e-10
    geometric_mean / arithmetic_mean
}
