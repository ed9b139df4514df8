#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crycheckr::core::model::{
    BatchNorm, BiLstm, Conv2d, ConvBlock, CrnnClassifier, Dense, Kernel, LstmCell, OneClassSvm,
    ANOMALY_FILE, CLASSIFIER_FILE,
};
use crycheckr::core::{default_feature_names, TARGET_SAMPLE_RATE};
use crycheckr::{
    AnomalyScreen, CryAnalyzer, CryClassifier, FeatureVector, ModelBundle, Result,
    SpectrogramImage, Waveform,
};

pub const LABELS: [&str; 5] = ["belly_pain", "burping", "discomfort", "hungry", "tired"];

pub fn labels() -> Vec<String> {
    LABELS.iter().map(|s| s.to_string()).collect()
}

/// Fresh, uniquely named directory under the system temp dir
pub fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("crycheckr-{}-{}", prefix, Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn wave(samples: Vec<f32>) -> Waveform {
    Waveform::from_samples(samples, TARGET_SAMPLE_RATE).expect("valid waveform")
}

/// Classifier returning a fixed distribution
pub struct StubClassifier {
    pub labels: Vec<String>,
    pub probabilities: Vec<f32>,
}

impl CryClassifier for StubClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict_proba(&self, image: &SpectrogramImage) -> Result<Vec<f32>> {
        assert_eq!(image.shape(), (128, 128));
        Ok(self.probabilities.clone())
    }
}

/// Screen returning a fixed decision value over the default feature layout
pub struct StubScreen {
    pub names: Vec<String>,
    pub score: f64,
}

impl AnomalyScreen for StubScreen {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn decision_function(&self, features: &FeatureVector) -> Result<f64> {
        assert_eq!(features.names(), self.names.as_slice());
        Ok(self.score)
    }
}

/// Bundle whose classifier always picks `hungry` and whose screen returns `score`
pub fn stub_bundle(score: f64) -> ModelBundle {
    ModelBundle::new(
        Arc::new(StubClassifier {
            labels: labels(),
            probabilities: vec![0.1, 0.05, 0.15, 0.6, 0.1],
        }),
        Arc::new(StubScreen {
            names: default_feature_names(),
            score,
        }),
    )
}

pub fn stub_analyzer(score: f64) -> CryAnalyzer {
    CryAnalyzer::new(stub_bundle(score))
}

fn dense(in_features: usize, out_features: usize, weight: f32) -> Dense {
    Dense {
        in_features,
        out_features,
        kernel: vec![weight; in_features * out_features],
        bias: vec![0.0; out_features],
    }
}

/// Small real CRNN over a `size`x`size` image: one 1->2 conv block,
/// 2-unit BiLSTM, 4-unit hidden layer. The last label always wins.
pub fn tiny_classifier(size: usize) -> CrnnClassifier {
    let labels = labels();
    let cell = LstmCell {
        kernel: vec![0.05; 2 * 8],
        recurrent_kernel: vec![0.05; 2 * 8],
        bias: vec![0.1; 8],
    };

    let mut output = dense(4, labels.len(), 0.0);
    output.bias = (0..labels.len()).map(|i| i as f32 * 0.5).collect();

    CrnnClassifier {
        input_shape: [size, size],
        conv_blocks: vec![ConvBlock {
            conv: Conv2d {
                kernel_size: 3,
                in_channels: 1,
                out_channels: 2,
                kernel: (0..18).map(|i| if i % 2 == 0 { 0.05 } else { -0.05 }).collect(),
                bias: vec![0.1, 0.1],
            },
            batch_norm: BatchNorm {
                gamma: vec![1.0; 2],
                beta: vec![0.0; 2],
                moving_mean: vec![0.0; 2],
                moving_variance: vec![1.0; 2],
                epsilon: 1e-3,
            },
        }],
        lstm: BiLstm {
            units: 2,
            input_size: 2,
            forward: cell.clone(),
            backward: cell,
        },
        attention: dense(4, 1, 0.1),
        hidden: dense(4, 4, 0.2),
        output,
        labels,
    }
}

/// Linear one-class model with a zero support vector: the decision value is
/// exactly `intercept` for every input
pub fn constant_screen(intercept: f64) -> OneClassSvm {
    let names = default_feature_names();
    OneClassSvm {
        support_vectors: vec![vec![0.0; names.len()]],
        dual_coef: vec![1.0],
        feature_names: names,
        scaler: None,
        kernel: Kernel::Linear,
        intercept,
    }
}

/// Write both artifacts into `dir`
pub fn write_models(dir: &Path, classifier: &CrnnClassifier, screen: &OneClassSvm) {
    std::fs::write(
        dir.join(CLASSIFIER_FILE),
        serde_json::to_vec(classifier).expect("serialize classifier"),
    )
    .expect("write classifier");
    std::fs::write(
        dir.join(ANOMALY_FILE),
        serde_json::to_vec(screen).expect("serialize screen"),
    )
    .expect("write screen");
}
