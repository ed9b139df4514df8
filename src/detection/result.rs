//! Verdict and report types produced by one analysis call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::features::FeatureVector;
use crate::core::gate::{GateStats, RejectReason};
use crate::core::model::LabelScore;

/// Final outcome of an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CryVerdict {
    /// Stopped by the signal gate before any model ran
    Rejected { reason: RejectReason },
    Classified { label: String, is_atypical: bool },
}

impl CryVerdict {
    pub fn is_classified(&self) -> bool {
        matches!(self, CryVerdict::Classified { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            CryVerdict::Classified { label, .. } => Some(label),
            CryVerdict::Rejected { .. } => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CryVerdict::Rejected { .. } => "∅",
            CryVerdict::Classified {
                is_atypical: false, ..
            } => "✓",
            CryVerdict::Classified {
                is_atypical: true, ..
            } => "⚠",
        }
    }

    pub fn summary(&self) -> String {
        match self {
            CryVerdict::Rejected { reason } => format!("rejected ({})", reason),
            CryVerdict::Classified { label, is_atypical } => {
                if *is_atypical {
                    format!("{} (atypical)", label)
                } else {
                    label.clone()
                }
            }
        }
    }
}

/// Pipeline states in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Loaded,
    Gated,
    FeaturesExtracted,
    Scored,
    Done,
}

/// A reached stage and the wall time spent getting there from the previous one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub elapsed_ms: f64,
}

/// Everything known about one analyzed clip
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    /// File path, or a caller-provided name for in-memory input
    pub source: String,
    pub analyzed_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub verdict: CryVerdict,
    pub gate: GateStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<LabelScore>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
    pub stages: Vec<StageTiming>,
}

impl AnalysisReport {
    /// Stages in the order they were reached
    pub fn stage_path(&self) -> Vec<PipelineStage> {
        self.stages.iter().map(|s| s.stage).collect()
    }
}
