//! Short-time Fourier transform with centered framing and overlap-add inverse

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::windows::hann;

/// Number of frames a centered analysis produces for `len` samples
pub fn centered_frame_count(len: usize, hop: usize) -> usize {
    1 + len / hop
}

/// Zero-pad `frame_len / 2` samples on both sides so frame `i` is centered
/// on sample `i * hop`
pub fn pad_center(samples: &[f32], frame_len: usize) -> Vec<f32> {
    let pad = frame_len / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);
    padded
}

/// Centered, Hann-windowed STFT.
///
/// Frames are stored time-major: `frames[t][k]` for `k in 0..=n_fft/2`.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop,
            window: hann(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Complex spectrum of every frame
    pub fn forward(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let padded = pad_center(samples, self.n_fft);
        let num_frames = centered_frame_count(samples.len(), self.hop);
        let num_bins = self.num_bins();

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut frames = Vec::with_capacity(num_frames);

        for t in 0..num_frames {
            let start = t * self.hop;
            for i in 0..self.n_fft {
                let s = padded.get(start + i).copied().unwrap_or(0.0);
                buffer[i] = Complex::new(s * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);
            frames.push(buffer[..num_bins].to_vec());
        }

        frames
    }

    /// Magnitude spectrogram
    pub fn magnitude(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.forward(samples)
            .into_iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Power spectrogram (squared magnitude)
    pub fn power(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.forward(samples)
            .into_iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }

    /// Overlap-add resynthesis of `frames`, trimmed to `length` samples.
    ///
    /// Inverts [`Stft::forward`] exactly for unmodified frames.
    pub fn inverse(&self, frames: &[Vec<Complex<f32>>], length: usize) -> Vec<f32> {
        let n = self.n_fft;
        let num_bins = self.num_bins();
        let total = n + self.hop * frames.len().saturating_sub(1);

        let mut output = vec![0.0f32; total];
        let mut window_sum = vec![0.0f32; total];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];

        for (t, frame) in frames.iter().enumerate() {
            for k in 0..num_bins {
                buffer[k] = frame.get(k).copied().unwrap_or_default();
            }
            // DC and Nyquist must be real for a real-valued frame
            buffer[0].im = 0.0;
            buffer[n / 2].im = 0.0;
            for k in 1..(n - num_bins + 1) {
                buffer[n - k] = buffer[k].conj();
            }

            self.inverse.process(&mut buffer);

            let start = t * self.hop;
            for i in 0..n {
                let w = self.window[i];
                output[start + i] += buffer[i].re / n as f32 * w;
                window_sum[start + i] += w * w;
            }
        }

        for (o, &ws) in output.iter_mut().zip(window_sum.iter()) {
            if ws > f32::MIN_POSITIVE {
                *o /= ws;
            }
        }

        let pad = n / 2;
        let mut trimmed: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        trimmed.resize(length, 0.0);
        trimmed
    }
}
