// src/core/model/classifier.rs
//
// Convolutional-recurrent-attention cry classifier:
// [Conv 3x3 + ReLU -> BatchNorm -> MaxPool 2] x N -> reshape to a sequence
// -> bidirectional LSTM -> tanh attention pooling -> Dense ReLU -> softmax.
//
// Weight layouts follow the Keras conventions so exported weights can be
// dumped to JSON without reordering:
// conv kernels `[ky][kx][in][out]`, dense kernels `[in][out]`, LSTM gates
// concatenated in i, f, c, o order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::CryClassifier;
use crate::core::analysis::SpectrogramImage;
use crate::error::{CryError, Result};

const POOL_SIZE: usize = 2;

fn default_bn_epsilon() -> f32 {
    1e-3
}

/// HWC feature map
#[derive(Debug, Clone)]
struct FeatureMap {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub kernel_size: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    /// `[ky][kx][in][out]`
    pub kernel: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Conv2d {
    /// "Same"-padded convolution followed by ReLU
    fn forward_relu(&self, input: &FeatureMap) -> FeatureMap {
        let (h, w) = (input.height, input.width);
        let (cin, cout, k) = (self.in_channels, self.out_channels, self.kernel_size);
        let pad = (k - 1) / 2;

        let mut data = vec![0.0f32; h * w * cout];
        data.par_chunks_mut(w * cout).enumerate().for_each(|(y, row)| {
            for (x, acc) in row.chunks_mut(cout).enumerate() {
                acc.copy_from_slice(&self.bias);

                for ky in 0..k {
                    let iy = y + ky;
                    if iy < pad || iy - pad >= h {
                        continue;
                    }
                    let iy = iy - pad;

                    for kx in 0..k {
                        let ix = x + kx;
                        if ix < pad || ix - pad >= w {
                            continue;
                        }
                        let ix = ix - pad;

                        let offset = (iy * w + ix) * cin;
                        let pixel = &input.data[offset..offset + cin];
                        let taps = &self.kernel[(ky * k + kx) * cin * cout..][..cin * cout];

                        for (ci, &v) in pixel.iter().enumerate() {
                            if v == 0.0 {
                                continue;
                            }
                            for (a, &wt) in acc.iter_mut().zip(&taps[ci * cout..(ci + 1) * cout]) {
                                *a += v * wt;
                            }
                        }
                    }
                }

                for a in acc.iter_mut() {
                    *a = a.max(0.0);
                }
            }
        });

        FeatureMap {
            height: h,
            width: w,
            channels: cout,
            data,
        }
    }
}

/// Inference-mode batch normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    pub gamma: Vec<f32>,
    pub beta: Vec<f32>,
    pub moving_mean: Vec<f32>,
    pub moving_variance: Vec<f32>,
    #[serde(default = "default_bn_epsilon")]
    pub epsilon: f32,
}

impl BatchNorm {
    fn apply(&self, map: &mut FeatureMap) {
        let (scale, shift): (Vec<f32>, Vec<f32>) = (0..map.channels)
            .map(|c| {
                let s = self.gamma[c] / (self.moving_variance[c] + self.epsilon).sqrt();
                (s, self.beta[c] - self.moving_mean[c] * s)
            })
            .unzip();

        for pixel in map.data.chunks_mut(map.channels) {
            for ((v, s), b) in pixel.iter_mut().zip(&scale).zip(&shift) {
                *v = *v * s + b;
            }
        }
    }
}

/// Conv + BatchNorm + 2x2 max pooling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvBlock {
    pub conv: Conv2d,
    pub batch_norm: BatchNorm,
}

impl ConvBlock {
    fn forward(&self, input: &FeatureMap) -> FeatureMap {
        let mut map = self.conv.forward_relu(input);
        self.batch_norm.apply(&mut map);
        max_pool(&map)
    }
}

fn max_pool(map: &FeatureMap) -> FeatureMap {
    let (oh, ow, c) = (map.height / POOL_SIZE, map.width / POOL_SIZE, map.channels);
    let mut data = vec![f32::NEG_INFINITY; oh * ow * c];

    for y in 0..oh * POOL_SIZE {
        for x in 0..ow * POOL_SIZE {
            let src = &map.data[(y * map.width + x) * c..][..c];
            let dst = &mut data[((y / POOL_SIZE) * ow + x / POOL_SIZE) * c..][..c];
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = d.max(s);
            }
        }
    }

    FeatureMap {
        height: oh,
        width: ow,
        channels: c,
        data,
    }
}

/// One LSTM direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    /// `[input][4 * units]`
    pub kernel: Vec<f32>,
    /// `[units][4 * units]`
    pub recurrent_kernel: Vec<f32>,
    pub bias: Vec<f32>,
}

impl LstmCell {
    fn run<'a>(&self, steps: impl Iterator<Item = &'a [f32]>, units: usize) -> Vec<Vec<f32>> {
        let gates = 4 * units;
        let mut h = vec![0.0f32; units];
        let mut c = vec![0.0f32; units];
        let mut outputs = Vec::new();

        for x in steps {
            let mut z = self.bias.clone();
            for (i, &xi) in x.iter().enumerate() {
                if xi == 0.0 {
                    continue;
                }
                for (zg, &wt) in z.iter_mut().zip(&self.kernel[i * gates..(i + 1) * gates]) {
                    *zg += xi * wt;
                }
            }
            for (j, &hj) in h.iter().enumerate() {
                for (zg, &wt) in z
                    .iter_mut()
                    .zip(&self.recurrent_kernel[j * gates..(j + 1) * gates])
                {
                    *zg += hj * wt;
                }
            }

            for u in 0..units {
                let input_gate = sigmoid(z[u]);
                let forget_gate = sigmoid(z[units + u]);
                let candidate = z[2 * units + u].tanh();
                let output_gate = sigmoid(z[3 * units + u]);
                c[u] = forget_gate * c[u] + input_gate * candidate;
                h[u] = output_gate * c[u].tanh();
            }
            outputs.push(h.clone());
        }

        outputs
    }

    fn check(&self, name: &str, input_size: usize, units: usize) -> Result<()> {
        let gates = 4 * units;
        if self.kernel.len() != input_size * gates
            || self.recurrent_kernel.len() != units * gates
            || self.bias.len() != gates
        {
            return Err(CryError::Model(format!("{} LSTM weight shapes mismatch", name)));
        }
        Ok(())
    }
}

/// Bidirectional LSTM returning the full sequence, outputs concatenated
/// `[forward, backward]` per step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiLstm {
    pub units: usize,
    pub input_size: usize,
    pub forward: LstmCell,
    pub backward: LstmCell,
}

impl BiLstm {
    fn forward(&self, sequence: &[&[f32]]) -> Vec<Vec<f32>> {
        let (fwd, mut bwd) = rayon::join(
            || self.forward.run(sequence.iter().copied(), self.units),
            || self.backward.run(sequence.iter().rev().copied(), self.units),
        );
        bwd.reverse();

        fwd.into_iter()
            .zip(bwd)
            .map(|(mut f, b)| {
                f.extend(b);
                f
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub in_features: usize,
    pub out_features: usize,
    /// `[in][out]`
    pub kernel: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Dense {
    fn forward(&self, x: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (i, &xi) in x.iter().enumerate() {
            let row = &self.kernel[i * self.out_features..(i + 1) * self.out_features];
            for (o, &wt) in out.iter_mut().zip(row) {
                *o += xi * wt;
            }
        }
        out
    }

    fn check(&self, name: &str, in_features: usize, out_features: Option<usize>) -> Result<()> {
        if self.in_features != in_features {
            return Err(CryError::Model(format!(
                "{} expects {} inputs, previous layer gives {}",
                name, self.in_features, in_features
            )));
        }
        if let Some(out) = out_features {
            if self.out_features != out {
                return Err(CryError::Model(format!(
                    "{} has {} outputs, expected {}",
                    name, self.out_features, out
                )));
            }
        }
        if self.kernel.len() != self.in_features * self.out_features
            || self.bias.len() != self.out_features
        {
            return Err(CryError::Model(format!("{} weight shapes mismatch", name)));
        }
        Ok(())
    }
}

/// CRNN with attention pooling, loaded from `classifier.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrnnClassifier {
    pub labels: Vec<String>,
    /// `[mel rows, time frames]` of the expected input image
    pub input_shape: [usize; 2],
    pub conv_blocks: Vec<ConvBlock>,
    pub lstm: BiLstm,
    /// Per-step score layer (one output, tanh)
    pub attention: Dense,
    pub hidden: Dense,
    pub output: Dense,
}

impl CrnnClassifier {
    /// Check that every layer's shapes chain together
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(CryError::Model("classifier has no labels".into()));
        }
        if self.conv_blocks.is_empty() {
            return Err(CryError::Model("classifier has no convolution blocks".into()));
        }

        let [mut height, mut width] = self.input_shape;
        let mut channels = 1;
        for (i, block) in self.conv_blocks.iter().enumerate() {
            let conv = &block.conv;
            let k = conv.kernel_size;
            if k == 0
                || conv.in_channels != channels
                || conv.kernel.len() != k * k * conv.in_channels * conv.out_channels
                || conv.bias.len() != conv.out_channels
            {
                return Err(CryError::Model(format!("conv block {} shapes mismatch", i)));
            }

            let bn = &block.batch_norm;
            let c = conv.out_channels;
            if bn.gamma.len() != c
                || bn.beta.len() != c
                || bn.moving_mean.len() != c
                || bn.moving_variance.len() != c
            {
                return Err(CryError::Model(format!("batch norm {} shapes mismatch", i)));
            }

            channels = c;
            height /= POOL_SIZE;
            width /= POOL_SIZE;
        }

        if height == 0 || width == 0 {
            return Err(CryError::Model(format!(
                "input {:?} is too small for {} pooling stages",
                self.input_shape,
                self.conv_blocks.len()
            )));
        }

        if self.lstm.input_size != channels || self.lstm.units == 0 {
            return Err(CryError::Model(format!(
                "LSTM expects {} features, convolutions give {}",
                self.lstm.input_size, channels
            )));
        }
        self.lstm.forward.check("forward", channels, self.lstm.units)?;
        self.lstm.backward.check("backward", channels, self.lstm.units)?;

        let sequence_width = 2 * self.lstm.units;
        self.attention.check("attention", sequence_width, Some(1))?;
        self.hidden.check("hidden", sequence_width, None)?;
        self.output
            .check("output", self.hidden.out_features, Some(self.labels.len()))?;

        Ok(())
    }
}

impl CryClassifier for CrnnClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict_proba(&self, image: &SpectrogramImage) -> Result<Vec<f32>> {
        let (n_mels, n_frames) = image.shape();
        if [n_mels, n_frames] != self.input_shape {
            return Err(CryError::Inference(format!(
                "classifier expects a {}x{} image, got {}x{}",
                self.input_shape[0], self.input_shape[1], n_mels, n_frames
            )));
        }

        let mut map = FeatureMap {
            height: n_mels,
            width: n_frames,
            channels: 1,
            data: image.as_slice().to_vec(),
        };
        for block in &self.conv_blocks {
            map = block.forward(&map);
        }

        // Row-major (height, width) positions become time steps
        let sequence: Vec<&[f32]> = map.data.chunks(map.channels).collect();
        let states = self.lstm.forward(&sequence);

        let scores: Vec<f32> = states
            .iter()
            .map(|s| self.attention.forward(s)[0].tanh())
            .collect();
        let weights = softmax(&scores);

        let mut context = vec![0.0f32; 2 * self.lstm.units];
        for (state, &a) in states.iter().zip(&weights) {
            for (c, &s) in context.iter_mut().zip(state) {
                *c += a * s;
            }
        }

        let hidden: Vec<f32> = self
            .hidden
            .forward(&context)
            .into_iter()
            .map(|v| v.max(0.0))
            .collect();

        let probs = softmax(&self.output.forward(&hidden));
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(CryError::Inference("classifier produced non-finite output".into()));
        }
        Ok(probs)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
