// src/testgen/mod.rs
//
// Synthetic signal generation for tests and demos: silence, tones, seeded
// noise and cry-like harmonic bursts, plus WAV writing with hound.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

fn num_samples(secs: f32, sample_rate: u32) -> usize {
    (secs * sample_rate as f32).round() as usize
}

pub fn silence(secs: f32, sample_rate: u32) -> Vec<f32> {
    vec![0.0; num_samples(secs, sample_rate)]
}

pub fn sine(freq: f32, amplitude: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
    (0..num_samples(secs, sample_rate))
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Uniform white noise; the same seed always gives the same samples
pub fn white_noise(amplitude: f32, secs: f32, sample_rate: u32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_samples(secs, sample_rate))
        .map(|_| amplitude * rng.random_range(-1.0f32..1.0))
        .collect()
}

/// Shape of a synthetic cry: harmonic bursts with vibrato separated by pauses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrySignal {
    /// Base fundamental in Hz
    pub f0: f32,
    pub vibrato_hz: f32,
    /// Peak F0 deviation in Hz
    pub vibrato_depth: f32,
    pub harmonics: usize,
    pub burst_secs: f32,
    pub pause_secs: f32,
    pub amplitude: f32,
    /// Breath noise level relative to `amplitude`
    pub noise: f32,
}

impl Default for CrySignal {
    fn default() -> Self {
        Self {
            f0: 450.0,
            vibrato_hz: 5.0,
            vibrato_depth: 30.0,
            harmonics: 6,
            burst_secs: 0.6,
            pause_secs: 0.2,
            amplitude: 0.5,
            noise: 0.02,
        }
    }
}

impl CrySignal {
    pub fn render(&self, secs: f32, sample_rate: u32, seed: u64) -> Vec<f32> {
        let sr = sample_rate as f32;
        let n = num_samples(secs, sample_rate);
        let period = self.burst_secs + self.pause_secs;
        let ramp = 0.03f32.min(self.burst_secs / 2.0);
        let harmonic_norm: f32 = (1..=self.harmonics).map(|k| 1.0 / k as f32).sum();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut phase = 0.0f32;

        (0..n)
            .map(|i| {
                let t = i as f32 / sr;
                let f = self.f0 + self.vibrato_depth * (2.0 * PI * self.vibrato_hz * t).sin();
                phase = (phase + 2.0 * PI * f / sr) % (2.0 * PI);

                let in_cycle = t % period;
                let envelope = if in_cycle >= self.burst_secs {
                    0.0
                } else if in_cycle < ramp {
                    0.5 - 0.5 * (PI * in_cycle / ramp).cos()
                } else if in_cycle > self.burst_secs - ramp {
                    0.5 - 0.5 * (PI * (self.burst_secs - in_cycle) / ramp).cos()
                } else {
                    1.0
                };

                let voiced: f32 = (1..=self.harmonics)
                    .map(|k| (k as f32 * phase).sin() / k as f32)
                    .sum::<f32>()
                    / harmonic_norm.max(1.0);

                let breath = self.noise * rng.random_range(-1.0f32..1.0);
                (self.amplitude * (envelope * voiced + breath)).clamp(-1.0, 1.0)
            })
            .collect()
    }
}

/// Write mono samples as 16-bit PCM WAV
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Kinds of generated fixture clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Silence,
    Sine,
    Noise,
    Cry,
}

impl SignalKind {
    pub fn all() -> [SignalKind; 4] {
        [SignalKind::Silence, SignalKind::Sine, SignalKind::Noise, SignalKind::Cry]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Silence => "silence",
            SignalKind::Sine => "sine",
            SignalKind::Noise => "noise",
            SignalKind::Cry => "cry",
        }
    }

    pub fn render(&self, secs: f32, sample_rate: u32) -> Vec<f32> {
        match self {
            SignalKind::Silence => silence(secs, sample_rate),
            SignalKind::Sine => sine(440.0, 0.5, secs, sample_rate),
            SignalKind::Noise => white_noise(0.3, secs, sample_rate, 7),
            SignalKind::Cry => CrySignal::default().render(secs, sample_rate, 7),
        }
    }
}

/// Write one WAV per [`SignalKind`] into `dir`
pub fn write_fixture_set(dir: &Path, secs: f32, sample_rate: u32) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    SignalKind::all()
        .iter()
        .map(|kind| {
            let path = dir.join(format!("{}.wav", kind.name()));
            write_wav(&path, &kind.render(secs, sample_rate), sample_rate)?;
            Ok(path)
        })
        .collect()
}
