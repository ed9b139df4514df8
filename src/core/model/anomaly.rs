// src/core/model/anomaly.rs
//
// One-class SVM novelty screen over the engineered feature vector, with the
// standard-scaler step it was fit behind.

use serde::{Deserialize, Serialize};

use super::AnomalyScreen;
use crate::core::features::FeatureVector;
use crate::error::{CryError, Result};

/// Per-feature standardization `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            // Constant training features carry a zero scale
            .map(|(v, (m, s))| if *s == 0.0 { v - m } else { (v - m) / s })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
}

impl Kernel {
    fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Kernel::Linear => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Kernel::Rbf { gamma } => {
                let dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
                (-gamma * dist).exp()
            }
        }
    }
}

/// Decision value `sum(dual_coef[i] * K(sv[i], x)) + intercept`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneClassSvm {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
}

impl OneClassSvm {
    pub fn validate(&self) -> Result<()> {
        let dim = self.feature_names.len();
        if dim == 0 {
            return Err(CryError::Model("anomaly model has no feature names".into()));
        }
        if self.support_vectors.is_empty() || self.support_vectors.len() != self.dual_coef.len() {
            return Err(CryError::Model(format!(
                "{} support vectors but {} dual coefficients",
                self.support_vectors.len(),
                self.dual_coef.len()
            )));
        }
        if let Some(i) = self.support_vectors.iter().position(|sv| sv.len() != dim) {
            return Err(CryError::Model(format!(
                "support vector {} has {} values, expected {}",
                i,
                self.support_vectors[i].len(),
                dim
            )));
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != dim || scaler.scale.len() != dim {
                return Err(CryError::Model("scaler length does not match feature names".into()));
            }
        }
        if let Kernel::Rbf { gamma } = self.kernel {
            if !(gamma > 0.0) {
                return Err(CryError::Model(format!("invalid RBF gamma {}", gamma)));
            }
        }
        Ok(())
    }
}

impl AnomalyScreen for OneClassSvm {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn decision_function(&self, features: &FeatureVector) -> Result<f64> {
        if features.names() != self.feature_names.as_slice() {
            return Err(CryError::Inference(format!(
                "feature layout mismatch: model expects {} named features, got {}",
                self.feature_names.len(),
                features.len()
            )));
        }

        let x = match &self.scaler {
            Some(scaler) => scaler.transform(features.values()),
            None => features.values().to_vec(),
        };

        let sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, alpha)| alpha * self.kernel.eval(sv, &x))
            .sum();

        Ok(sum + self.intercept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::PartialFeatures;

    fn names() -> Vec<String> {
        vec!["f0_mean".into(), "rms_mean".into()]
    }

    fn vector(f0: f64, rms: f64) -> FeatureVector {
        let partial: PartialFeatures = [("f0_mean", f0), ("rms_mean", rms)].into_iter().collect();
        FeatureVector::assemble(&[partial], &names())
    }

    /// Typical region: a unit-ish ball around (450 Hz, 0.1) in scaled space
    fn model() -> OneClassSvm {
        OneClassSvm {
            feature_names: names(),
            scaler: Some(StandardScaler {
                mean: vec![450.0, 0.1],
                scale: vec![50.0, 0.05],
            }),
            kernel: Kernel::Rbf { gamma: 0.5 },
            support_vectors: vec![vec![0.0, 0.0]],
            dual_coef: vec![1.0],
            intercept: -0.3,
        }
    }

    #[test]
    fn test_typical_inside() {
        let verdict = model().screen(&vector(460.0, 0.11)).unwrap();
        assert!(!verdict.is_atypical, "score {}", verdict.score);
    }

    #[test]
    fn test_atypical_outside() {
        let verdict = model().screen(&vector(780.0, 0.4)).unwrap();
        assert!(verdict.is_atypical, "score {}", verdict.score);
        assert!(verdict.score < 0.0);
    }

    #[test]
    fn test_linear_kernel() {
        let mut m = model();
        m.scaler = None;
        m.kernel = Kernel::Linear;
        m.support_vectors = vec![vec![1.0, 2.0]];
        m.intercept = 0.0;
        let score = m.decision_function(&vector(3.0, 4.0)).unwrap();
        assert!((score - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_layout_mismatch() {
        let partial: PartialFeatures = [("rms_mean", 0.1)].into_iter().collect();
        let wrong = FeatureVector::assemble(&[partial], &["rms_mean".to_string()]);
        assert!(matches!(model().screen(&wrong), Err(CryError::Inference(_))));
    }

    #[test]
    fn test_validate() {
        assert!(model().validate().is_ok());

        let mut m = model();
        m.dual_coef.push(0.5);
        assert!(m.validate().is_err());

        let mut m = model();
        m.kernel = Kernel::Rbf { gamma: 0.0 };
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_kernel_json() {
        let k: Kernel = serde_json::from_str(r#"{"type":"rbf","gamma":0.1}"#).unwrap();
        assert_eq!(k, Kernel::Rbf { gamma: 0.1 });
        let k: Kernel = serde_json::from_str(r#"{"type":"linear"}"#).unwrap();
        assert_eq!(k, Kernel::Linear);
    }
}
