//! Frozen inference models
//!
//! Both models sit behind traits so the analyzer does not care which backend
//! produced a label or an anomaly score. The reference backends are a
//! convolutional-recurrent-attention classifier and a one-class SVM, both
//! loaded from JSON artifacts.

use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::core::analysis::SpectrogramImage;
use crate::core::features::FeatureVector;
use crate::error::{CryError, Result};

mod anomaly;
mod classifier;

pub use anomaly::{Kernel, OneClassSvm, StandardScaler};
pub use classifier::{BatchNorm, BiLstm, ConvBlock, Conv2d, CrnnClassifier, Dense, LstmCell};

/// Classifier artifact file name inside a model directory
pub const CLASSIFIER_FILE: &str = "classifier.json";
/// Anomaly screen artifact file name inside a model directory
pub const ANOMALY_FILE: &str = "anomaly.json";

/// Probability assigned to one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

/// Classifier output: the winning label plus the full distribution
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub probabilities: Vec<LabelScore>,
}

/// Anomaly screen output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub is_atypical: bool,
    /// Signed decision value; positive means inside the typical region
    pub score: f64,
}

/// Spectrogram → cry type
pub trait CryClassifier: Send + Sync {
    /// Ordered label set; probabilities follow this order
    fn labels(&self) -> &[String];

    fn predict_proba(&self, image: &SpectrogramImage) -> Result<Vec<f32>>;

    /// Highest-probability label; ties go to the earlier label
    fn classify(&self, image: &SpectrogramImage) -> Result<Classification> {
        let probs = self.predict_proba(image)?;
        let labels = self.labels();
        if probs.len() != labels.len() || probs.is_empty() {
            return Err(CryError::Inference(format!(
                "classifier returned {} probabilities for {} labels",
                probs.len(),
                labels.len()
            )));
        }

        let best = probs
            .iter()
            .enumerate()
            .fold(0usize, |best, (i, &p)| if p > probs[best] { i } else { best });

        Ok(Classification {
            label: labels[best].clone(),
            probabilities: labels
                .iter()
                .zip(&probs)
                .map(|(label, &probability)| LabelScore {
                    label: label.clone(),
                    probability,
                })
                .collect(),
        })
    }
}

/// Engineered feature vector → typical/atypical
pub trait AnomalyScreen: Send + Sync {
    /// Ordered feature names the model was fit on
    fn feature_names(&self) -> &[String];

    fn decision_function(&self, features: &FeatureVector) -> Result<f64>;

    /// Atypical when the decision value is not strictly positive
    fn screen(&self, features: &FeatureVector) -> Result<AnomalyVerdict> {
        let score = self.decision_function(features)?;
        Ok(AnomalyVerdict {
            is_atypical: score <= 0.0,
            score,
        })
    }
}

/// Shared read-only model state
#[derive(Clone)]
pub struct ModelBundle {
    classifier: Arc<dyn CryClassifier>,
    screen: Arc<dyn AnomalyScreen>,
}

impl ModelBundle {
    pub fn new(classifier: Arc<dyn CryClassifier>, screen: Arc<dyn AnomalyScreen>) -> Self {
        Self { classifier, screen }
    }

    /// Load `classifier.json` and `anomaly.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let classifier: CrnnClassifier = read_artifact(&dir.join(CLASSIFIER_FILE))?;
        classifier.validate()?;

        let screen: OneClassSvm = read_artifact(&dir.join(ANOMALY_FILE))?;
        screen.validate()?;

        info!(
            "Loaded models: {} labels, {} features",
            classifier.labels().len(),
            screen.feature_names().len()
        );

        Ok(Self::new(Arc::new(classifier), Arc::new(screen)))
    }

    pub fn classifier(&self) -> &dyn CryClassifier {
        self.classifier.as_ref()
    }

    pub fn screen(&self) -> &dyn AnomalyScreen {
        self.screen.as_ref()
    }

    pub fn labels(&self) -> &[String] {
        self.classifier.labels()
    }

    pub fn feature_names(&self) -> &[String] {
        self.screen.feature_names()
    }
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("labels", &self.labels())
            .field("feature_names", &self.feature_names())
            .finish()
    }
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)
        .map_err(|e| CryError::Model(format!("cannot read {}: {}", path.display(), e)))?;

    info!(
        "Model artifact {} (md5 {:x})",
        path.display(),
        md5::compute(&bytes)
    );

    serde_json::from_slice(&bytes)
        .map_err(|e| CryError::Model(format!("{}: {}", path.display(), e)))
}
