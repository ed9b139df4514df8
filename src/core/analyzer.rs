// src/core/analyzer.rs
//
// Pipeline orchestration: load -> gate -> extract -> score -> verdict.
// Holds no per-call state, so one analyzer can serve many threads.

use chrono::Utc;
use log::{debug, info};
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::core::decoder::{self, Waveform, TARGET_SAMPLE_RATE};
use crate::core::features::{AcousticFeatureExtractor, FeatureVector};
use crate::core::gate::SignalGate;
use crate::core::model::{LabelScore, ModelBundle};
use crate::detection::{AnalysisReport, CryVerdict, PipelineStage, StageTiming};
use crate::error::{CryError, Result};

/// Records each stage reached with the time spent since the previous one
struct StageTrace {
    last: Instant,
    stages: Vec<StageTiming>,
}

impl StageTrace {
    fn start() -> Self {
        Self {
            last: Instant::now(),
            stages: Vec::new(),
        }
    }

    fn mark(&mut self, stage: PipelineStage) {
        let now = Instant::now();
        self.stages.push(StageTiming {
            stage,
            elapsed_ms: now.duration_since(self.last).as_secs_f64() * 1000.0,
        });
        self.last = now;
    }
}

/// Infant cry analyzer
pub struct CryAnalyzer {
    models: ModelBundle,
    gate: SignalGate,
    extractor: AcousticFeatureExtractor,
    include_features: bool,
}

impl CryAnalyzer {
    /// Analyzer with default thresholds
    pub fn new(models: ModelBundle) -> Self {
        let config = PipelineConfig::default();
        Self::with_parts(&config, models, true)
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    fn with_parts(config: &PipelineConfig, models: ModelBundle, include_features: bool) -> Self {
        Self {
            gate: SignalGate::new(&config.gate, TARGET_SAMPLE_RATE),
            extractor: AcousticFeatureExtractor::new(&config.features, &config.spectrogram),
            models,
            include_features,
        }
    }

    pub fn models(&self) -> &ModelBundle {
        &self.models
    }

    /// Analyze an audio file
    pub fn analyze_path(&self, path: &Path) -> Result<AnalysisReport> {
        let mut trace = StageTrace::start();
        let waveform = decoder::load_path(path)?;
        trace.mark(PipelineStage::Loaded);
        self.run(&waveform, path.display().to_string(), trace)
    }

    /// Analyze an in-memory recording; `source` names it in the report
    pub fn analyze_bytes(
        &self,
        bytes: Vec<u8>,
        extension_hint: Option<&str>,
        source: &str,
    ) -> Result<AnalysisReport> {
        let mut trace = StageTrace::start();
        let waveform = decoder::load_bytes(bytes, extension_hint)?;
        trace.mark(PipelineStage::Loaded);
        self.run(&waveform, source.to_string(), trace)
    }

    /// Analyze an already-loaded waveform
    pub fn analyze_waveform(&self, waveform: &Waveform, source: &str) -> Result<AnalysisReport> {
        let mut trace = StageTrace::start();
        trace.mark(PipelineStage::Loaded);
        self.run(waveform, source.to_string(), trace)
    }

    fn run(&self, waveform: &Waveform, source: String, mut trace: StageTrace) -> Result<AnalysisReport> {
        let analyzed_at = Utc::now();

        let decision = self.gate.check(waveform);
        trace.mark(PipelineStage::Gated);

        let (verdict, scores) = match decision.rejection {
            Some(reason) => {
                info!("{}: rejected by gate ({})", source, reason);
                (CryVerdict::Rejected { reason }, None)
            }
            None => {
                let scores = self.score(waveform, &mut trace)?;
                debug!(
                    "{}: label {} atypical {} (score {:.4})",
                    source, scores.label, scores.is_atypical, scores.anomaly_score
                );
                let verdict = CryVerdict::Classified {
                    label: scores.label.clone(),
                    is_atypical: scores.is_atypical,
                };
                (verdict, Some(scores))
            }
        };

        trace.mark(PipelineStage::Done);

        let (probabilities, anomaly_score, features) = match scores {
            Some(s) => (
                Some(s.probabilities),
                Some(s.anomaly_score),
                Some(s.features).filter(|_| self.include_features),
            ),
            None => (None, None, None),
        };

        Ok(AnalysisReport {
            id: Uuid::new_v4(),
            source,
            analyzed_at,
            duration_secs: waveform.duration_secs(),
            verdict,
            gate: decision.stats,
            probabilities,
            anomaly_score,
            features,
            stages: trace.stages,
        })
    }

    /// Extract both representations and run both models
    fn score(&self, waveform: &Waveform, trace: &mut StageTrace) -> Result<Scores> {
        let extracted = self
            .extractor
            .extract(waveform, self.models.feature_names())
            .map_err(|e| match e {
                CryError::Analysis(_) => e,
                other => CryError::Analysis(other.to_string()),
            })?;
        trace.mark(PipelineStage::FeaturesExtracted);

        let (classification, anomaly) = rayon::join(
            || self.models.classifier().classify(&extracted.spectrogram),
            || self.models.screen().screen(&extracted.features),
        );
        let classification = classification?;
        let anomaly = anomaly?;
        trace.mark(PipelineStage::Scored);

        Ok(Scores {
            label: classification.label,
            is_atypical: anomaly.is_atypical,
            probabilities: classification.probabilities,
            anomaly_score: anomaly.score,
            features: extracted.features,
        })
    }
}

/// Model outputs for a clip that passed the gate
struct Scores {
    label: String,
    is_atypical: bool,
    probabilities: Vec<LabelScore>,
    anomaly_score: f64,
    features: FeatureVector,
}

/// Builder for analyzers with adjusted configuration
pub struct AnalyzerBuilder {
    config: PipelineConfig,
    models: Option<ModelBundle>,
    include_features: bool,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            models: None,
            include_features: true,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn models(mut self, models: ModelBundle) -> Self {
        self.models = Some(models);
        self
    }

    /// Attach the engineered feature vector to each report (default on)
    pub fn include_features(mut self, include: bool) -> Self {
        self.include_features = include;
        self
    }

    pub fn build(self) -> Result<CryAnalyzer> {
        self.config.validate()?;
        let models = self
            .models
            .ok_or_else(|| CryError::Model("no models supplied to the analyzer".into()))?;
        Ok(CryAnalyzer::with_parts(&self.config, models, self.include_features))
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
