//! Core pipeline stages and DSP utilities

pub mod analysis;
pub mod analyzer;
pub mod decoder;
pub mod dsp;
pub mod features;
pub mod gate;
pub mod model;

pub use analysis::SpectrogramImage;
pub use analyzer::{AnalyzerBuilder, CryAnalyzer};
pub use decoder::{load_bytes, load_path, Waveform, TARGET_SAMPLE_RATE};
pub use features::{default_feature_names, AcousticFeatureExtractor, AcousticFeatures, FeatureVector};
pub use gate::{GateDecision, GateStats, RejectReason, SignalGate};
pub use model::{
    AnomalyScreen, AnomalyVerdict, Classification, CrnnClassifier, CryClassifier, LabelScore,
    ModelBundle, OneClassSvm,
};
