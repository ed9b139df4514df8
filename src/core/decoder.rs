// src/core/decoder.rs
//
// Waveform loading: format-agnostic decoding with Symphonia, mono downmix
// and a single resampling pass to the pipeline rate.

use log::debug;
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{CryError, Result};

/// Sample rate every downstream stage works at
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Mono waveform at [`TARGET_SAMPLE_RATE`] with samples clamped to [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Build a waveform from mono samples at any rate.
    ///
    /// Resamples once when `sample_rate` differs from the pipeline rate,
    /// replaces non-finite samples with silence and clamps the rest.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CryError::Decode("sample rate of 0 Hz".to_string()));
        }

        let mut samples = if sample_rate == TARGET_SAMPLE_RATE {
            samples
        } else {
            resample(&samples, sample_rate, TARGET_SAMPLE_RATE)?
        };

        for s in samples.iter_mut() {
            *s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
        }

        Ok(Self {
            samples,
            sample_rate: TARGET_SAMPLE_RATE,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decoded audio before downmix and resampling
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: usize,
    /// Codec name as reported by the decoder
    pub codec_name: String,
}

/// Load an audio file as a pipeline-ready waveform
pub fn load_path(path: &Path) -> Result<Waveform> {
    let audio = decode_path(path)?;
    to_waveform(audio)
}

/// Load an in-memory audio stream (an upload or a recording).
///
/// `extension_hint` is a container extension such as `"wav"` or `"mp3"`
/// and only speeds up probing.
pub fn load_bytes(bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<Waveform> {
    let audio = decode_bytes(bytes, extension_hint)?;
    to_waveform(audio)
}

fn to_waveform(audio: DecodedAudio) -> Result<Waveform> {
    debug!(
        "decoded {} samples, {} ch @ {} Hz ({})",
        audio.samples.len(),
        audio.channels,
        audio.sample_rate,
        audio.codec_name
    );
    let mono = extract_mono(&audio);
    Waveform::from_samples(mono, audio.sample_rate)
}

/// Decode an audio file to interleaved floating-point samples
pub fn decode_path(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .map_err(|e| CryError::Decode(format!("failed to open {}: {}", path.display(), e)))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_source(Box::new(file), hint)
}

/// Decode an in-memory audio stream to interleaved floating-point samples
pub fn decode_bytes(bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<DecodedAudio> {
    if bytes.is_empty() {
        return Err(CryError::Decode("empty audio stream".to_string()));
    }

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    decode_source(Box::new(Cursor::new(bytes)), hint)
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| CryError::Decode(format!("unsupported or corrupt audio: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| CryError::Decode("no supported audio track".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| CryError::Decode("stream does not specify a sample rate".to_string()))?;
    let codec_name = format!("{:?}", track.codec_params.codec);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CryError::Decode(format!("no decoder for codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(symphonia::core::errors::Error::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if channels == 0 {
        return Err(CryError::Decode("stream reports 0 audio channels".to_string()));
    }
    if samples.is_empty() {
        return Err(CryError::Decode("no audio samples decoded".to_string()));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
        codec_name,
    })
}

/// Average interleaved channels into one
pub fn extract_mono(audio: &DecodedAudio) -> Vec<f32> {
    if audio.channels <= 1 {
        return audio.samples.clone();
    }

    audio
        .samples
        .chunks_exact(audio.channels)
        .map(|frame| frame.iter().sum::<f32>() / audio.channels as f32)
        .collect()
}

/// Band-limited sinc resampling of a mono signal
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| CryError::Decode(format!("failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let max_input = samples.len() + (delay as f64 / ratio).ceil() as usize + 2 * chunk_size;

    let mut output = Vec::with_capacity(expected_len + delay + chunk_size);
    let mut pos = 0;

    // Zero-padded chunks past the end flush the filter delay
    while output.len() < expected_len + delay && pos < max_input {
        let mut chunk = if pos < samples.len() {
            samples[pos..(pos + chunk_size).min(samples.len())].to_vec()
        } else {
            Vec::new()
        };
        chunk.resize(chunk_size, 0.0);

        let input = vec![chunk];
        let resampled = resampler
            .process(&input, None)
            .map_err(|e| CryError::Decode(format!("resampling failed: {}", e)))?;

        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
        pos += chunk_size;
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected_len);

    Ok(output)
}
