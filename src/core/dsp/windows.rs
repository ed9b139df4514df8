//! Window function implementations

use std::f32::consts::PI;

/// Periodic Hann window (divides by N, not N-1).
///
/// The periodic form sums to a constant under 75% overlap, which keeps
/// STFT analysis and overlap-add resynthesis consistent.
pub fn hann(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n).cos()))
        .collect()
}
