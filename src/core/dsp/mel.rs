//! Slaney-style mel filterbank and decibel conversion

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert frequency in Hz to the Slaney mel scale
/// (linear below 1 kHz, logarithmic above)
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mel back to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular, area-normalized mel filterbank.
///
/// Row `m` holds the weights of band `m` over the `n_fft / 2 + 1` STFT bins.
pub struct MelFilterbank {
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Self {
        let num_bins = n_fft / 2 + 1;
        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);

        let mel_f: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();
        let fft_freqs: Vec<f64> = (0..num_bins)
            .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let lower_width = mel_f[m + 1] - mel_f[m];
                let upper_width = mel_f[m + 2] - mel_f[m + 1];
                let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let lower = (f - mel_f[m]) / lower_width;
                        let upper = (mel_f[m + 2] - f) / upper_width;
                        (lower.min(upper).max(0.0) * enorm) as f32
                    })
                    .collect()
            })
            .collect();

        Self { weights }
    }

    pub fn num_mels(&self) -> usize {
        self.weights.len()
    }

    /// Project one power frame onto the mel bands
    pub fn apply(&self, power_frame: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|band| band.iter().zip(power_frame).map(|(w, p)| w * p).sum())
            .collect()
    }
}

/// Convert power values to dB relative to their maximum, floored at
/// `max - top_db`
pub fn power_to_db_ref_max(power: &mut [f32], top_db: f32) {
    const AMIN: f32 = 1e-10;

    let peak = power.iter().copied().fold(0.0f32, f32::max).max(AMIN);
    let ref_db = 10.0 * peak.log10();

    let mut max_db = f32::NEG_INFINITY;
    for p in power.iter_mut() {
        *p = 10.0 * p.max(AMIN).log10() - ref_db;
        max_db = max_db.max(*p);
    }

    let floor = max_db - top_db;
    for p in power.iter_mut() {
        *p = p.max(floor);
    }
}
